//! Host-qualified file URIs
//!
//! Every source, artifact and graph node is identified as
//! `file://<hostname><absolute-path>` so that several machines can share
//! one database without their paths colliding.

use crate::error::{DistillError, DistillResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const SCHEME: &str = "file://";

/// Local hostname, resolved once per process
pub fn hostname() -> &'static str {
    static HOST: OnceLock<String> = OnceLock::new();
    HOST.get_or_init(|| {
        let name = gethostname::gethostname().to_string_lossy().trim().to_string();
        if name.is_empty() {
            "localhost".to_string()
        } else {
            name
        }
    })
}

/// Make a path absolute without touching the filesystem beyond the cwd
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Resolve `..`, `.` and symlinks so one file always maps to one URI
pub fn canonical(path: &Path) -> DistillResult<PathBuf> {
    fs::canonicalize(path)
        .map_err(|e| DistillError::io(format!("resolving {}", path.display()), e))
}

/// URI for a local path on this host
pub fn file_uri(path: &Path) -> String {
    let abs = absolute(path);
    let mut display = abs.to_string_lossy().replace('\\', "/");
    if !display.starts_with('/') {
        display.insert(0, '/');
    }
    format!("{}{}{}", SCHEME, hostname(), display)
}

/// Local path named by a `file://` URI, if it is one
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix(SCHEME)?;
    let slash = rest.find('/')?;
    Some(PathBuf::from(&rest[slash..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_is_never_empty() {
        assert!(!hostname().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn uri_roundtrips_absolute_path() {
        let path = Path::new("/var/data/notes.md");
        let uri = file_uri(path);
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("/var/data/notes.md"));
        assert!(uri.contains(hostname()));
        assert_eq!(uri_to_path(&uri).unwrap(), path);
    }

    #[test]
    fn relative_paths_become_absolute() {
        let uri = file_uri(Path::new("relative.txt"));
        let path = uri_to_path(&uri).unwrap();
        assert!(path.ends_with("relative.txt"));
    }

    #[test]
    fn canonical_collapses_parent_segments() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let direct = canonical(&dir.path().join("a.txt")).unwrap();
        let dotted = canonical(&dir.path().join("sub/../a.txt")).unwrap();
        assert_eq!(direct, dotted);
        assert_eq!(file_uri(&direct), file_uri(&dotted));
        assert!(canonical(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn non_file_uris_are_rejected() {
        assert!(uri_to_path("https://example.com/a").is_none());
        assert!(uri_to_path("file://hostonly").is_none());
    }
}
