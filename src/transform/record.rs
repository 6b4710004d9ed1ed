//! Transform record persistence model

use super::checksum;
use crate::error::{DistillError, DistillResult};
use crate::store::{filter, Document, Filter};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Collection holding one record per cached artifact
pub const TRANSFORMS: &str = "transforms";

/// Metadata for one cached artifact
///
/// Natural key is `(checksum, engine, options_hash)`. The checksum is the
/// digest of the source bytes, not the cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    /// Source file URI at transform time
    pub file_uri: String,

    /// Cached artifact URI
    pub cache_uri: String,

    /// SHA-256 of the source bytes
    pub checksum: String,

    /// Byte length of the cached artifact
    pub size_bytes: u64,

    /// When the artifact was produced
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    /// Last hit; LRU eviction orders on this field
    #[serde(with = "timestamp")]
    pub last_accessed: DateTime<Utc>,

    /// Engine configuration name
    pub engine: String,

    /// Digest of the merged engine options
    pub options_hash: String,

    /// Artifact file extension, without the dot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Persisted cache key for point lookups; older records may lack it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,

    /// Auxiliary artifacts produced alongside the output
    #[serde(default)]
    pub referenced_uris: Vec<String>,
}

impl TransformRecord {
    /// Cache key recomputed from the natural key
    pub fn computed_key(&self) -> String {
        checksum::cache_key(&self.checksum, &self.engine, &self.options_hash)
    }

    /// Filter selecting this record by its natural key
    pub fn natural_key(&self) -> Filter {
        natural_key(&self.checksum, &self.engine, &self.options_hash)
    }

    /// Expected artifact path under `cache_dir`, when the extension is known
    pub fn artifact_path(&self, cache_dir: &Path) -> Option<PathBuf> {
        self.extension
            .as_deref()
            .map(|ext| artifact_path(cache_dir, &self.computed_key(), ext))
    }

    /// Convert to a store document
    pub fn to_document(&self) -> DistillResult<Document> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => unreachable!("struct serialises to an object"),
        }
    }

    /// Parse from a store document, ignoring store-assigned fields
    pub fn from_document(doc: Document) -> DistillResult<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(doc))?)
    }
}

/// Filter selecting a record by `(checksum, engine, options_hash)`
pub fn natural_key(checksum: &str, engine: &str, options_hash: &str) -> Filter {
    filter([
        ("checksum", checksum),
        ("engine", engine),
        ("options_hash", options_hash),
    ])
}

/// `<cache_dir>/<key>.<ext>`
pub fn artifact_path(cache_dir: &Path, key: &str, extension: &str) -> PathBuf {
    cache_dir.join(format!("{}.{}", key, extension))
}

/// Directory receiving auxiliary artifacts for `artifact`
pub fn refs_dir(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".refs");
    PathBuf::from(name)
}

/// Reject extensions that would escape the cache directory
pub fn check_extension(extension: &str) -> DistillResult<()> {
    let escapes = extension.is_empty()
        || extension.contains(['/', '\\', '\0'])
        || extension.contains("..");
    if escapes {
        return Err(DistillError::User(format!(
            "Invalid artifact extension: {:?}",
            extension
        )));
    }
    Ok(())
}

/// Current time, truncated to the precision stored in records
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    timestamp::parse(&timestamp::format(&now)).unwrap_or(now)
}

/// Fixed-width RFC 3339 timestamps so lexical order matches time order
pub mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    /// Format with microsecond precision and a `Z` suffix
    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parse any RFC 3339 timestamp into UTC
    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
    }
}
