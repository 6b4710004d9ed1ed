//! Checksums and cache keys
//!
//! A cache key is `sha256(checksum || engine || options_hash)` where the
//! checksum is the SHA-256 of the source bytes and the options hash is an
//! engine-specific digest of the merged options.

use crate::error::{DistillError, DistillResult};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read size used when streaming files through the hasher
const CHUNK_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded SHA-256 digest
pub const KEY_LEN: usize = 64;

/// SHA-256 of a file's bytes, streamed in fixed-size chunks
pub fn sha256_file(path: &Path) -> DistillResult<String> {
    let mut file = File::open(path)
        .map_err(|e| DistillError::io(format!("opening {} for hashing", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| DistillError::io(format!("reading {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of an in-memory byte slice
pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Derive the cache key for a (checksum, engine, options hash) triple
pub fn cache_key(checksum: &str, engine: &str, options_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(checksum.as_bytes());
    hasher.update(engine.as_bytes());
    hasher.update(options_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `s` looks like a cache key: exactly 64 lowercase hex characters
pub fn is_cache_key(s: &str) -> bool {
    s.len() == KEY_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Serialise a JSON value with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // a String always serialises
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Default options digest: SHA-256 of the canonical JSON encoding
pub fn hash_options(options: &serde_json::Map<String, Value>) -> String {
    sha256_bytes(canonical_json(&Value::Object(options.clone())).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn file_hash_matches_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "Hello World").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e"
        );
    }

    #[test]
    fn file_hash_spans_multiple_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_bytes(&data));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = sha256_file(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, DistillError::Io { .. }));
    }

    #[test]
    fn cache_key_is_deterministic_and_component_sensitive() {
        let a = cache_key("abc", "text", "opts");
        assert_eq!(a, cache_key("abc", "text", "opts"));
        assert_ne!(a, cache_key("abc", "binary", "opts"));
        assert_ne!(a, cache_key("abc", "text", "other"));
        assert!(is_cache_key(&a));
    }

    #[test]
    fn cache_key_pattern() {
        assert!(is_cache_key(&"a".repeat(64)));
        assert!(!is_cache_key(&"A".repeat(64)));
        assert!(!is_cache_key(&"a".repeat(63)));
        assert!(!is_cache_key("notes/hello.txt"));
    }

    #[test]
    fn options_hash_ignores_key_order() {
        let a = json!({"b": 1, "a": {"y": true, "x": [1, 2]}});
        let b = json!({"a": {"x": [1, 2], "y": true}, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(
            hash_options(a.as_object().unwrap()),
            hash_options(b.as_object().unwrap())
        );
    }

    #[test]
    fn options_hash_distinguishes_values() {
        let a = json!({"width": 16});
        let b = json!({"width": "16"});
        assert_ne!(
            hash_options(a.as_object().unwrap()),
            hash_options(b.as_object().unwrap())
        );
    }
}
