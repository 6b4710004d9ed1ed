//! Error types for Distill
//!
//! All modules use `DistillResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Distill operations
pub type DistillResult<T> = Result<T, DistillError>;

/// All errors that can occur in Distill
#[derive(Error, Debug)]
pub enum DistillError {
    // Transform errors
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Unknown engine: {name}. Available engines: {}", .available.join(", "))]
    UnknownEngine {
        name: String,
        available: Vec<String>,
    },

    #[error("Engine '{engine}' failed: {reason}")]
    EngineFailure { engine: String, reason: String },

    #[error("Checksum {0} not found in database")]
    ChecksumNotFound(String),

    #[error("Cache file for {key} is missing from disk: {}", .path.display())]
    CacheFileMissing { key: String, path: PathBuf },

    #[error("Output path already exists: {}", .0.display())]
    OutputCollision(PathBuf),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Document store errors
    #[error("Document store error: {0}")]
    Store(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DistillError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an engine failure error
    pub fn engine_failure(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EngineFailure {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by caller input rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::UnknownEngine { .. }
                | Self::ChecksumNotFound(_)
                | Self::OutputCollision(_)
                | Self::User(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownEngine { .. } => Some("Run: distill engines"),
            Self::ChecksumNotFound(_) => Some("Run: distill cache list"),
            Self::CacheFileMissing { .. } => {
                Some("The stale record was removed; transform the file again")
            }
            Self::OutputCollision(_) => Some("Choose a different --output path"),
            Self::ConfigInvalid { .. } => Some("Run: distill config init --force"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DistillError::FileNotFound(PathBuf::from("/tmp/missing.txt"));
        assert!(err.to_string().contains("File not found"));
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn unknown_engine_lists_available() {
        let err = DistillError::UnknownEngine {
            name: "ocr".to_string(),
            available: vec!["binary".to_string(), "text".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("ocr"));
        assert!(msg.contains("binary, text"));
    }

    #[test]
    fn checksum_not_found_message() {
        let err = DistillError::ChecksumNotFound("a".repeat(64));
        assert!(err.to_string().contains("not found in database"));
    }

    #[test]
    fn cache_file_missing_message() {
        let err = DistillError::CacheFileMissing {
            key: "abc".to_string(),
            path: PathBuf::from("/cache/abc.txt"),
        };
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn error_hint() {
        let err = DistillError::UnknownEngine {
            name: "x".to_string(),
            available: vec![],
        };
        assert_eq!(err.hint(), Some("Run: distill engines"));
        assert!(DistillError::Internal("boom".to_string()).hint().is_none());
    }

    #[test]
    fn user_error_classification() {
        assert!(DistillError::OutputCollision(PathBuf::from("out")).is_user_error());
        assert!(!DistillError::engine_failure("text", "no output").is_user_error());
    }
}
