//! Transform journal
//!
//! Appends JSON lines (`{timestamp, event, data}`) to
//! `<state_dir>/journal.log` for every artifact created, served, evicted
//! or healed. Write failures are logged and dropped.

use crate::config::{Config, ConfigManager};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A new artifact was produced by an engine
pub const TRANSFORM_CREATED: &str = "transform.created";
/// An existing artifact was served
pub const TRANSFORM_HIT: &str = "transform.hit";
/// An artifact was evicted to respect the budget
pub const CACHE_EVICTED: &str = "cache.evicted";
/// A record pointing at a vanished artifact was removed
pub const RECORD_HEALED: &str = "record.healed";

/// Append-only JSON lines journal
#[derive(Debug, Clone)]
pub struct Journal {
    enabled: bool,
    path: PathBuf,
}

impl Journal {
    /// Journal at the default location, enabled per config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.journal,
            path: ConfigManager::journal_path(),
        }
    }

    /// Journal at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log an event as a JSON line
    pub fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize journal event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line) {
            warn!("Failed to write journal {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}
