//! Configuration schema for Distill
//!
//! Configuration is stored at `~/.config/distill/config.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Transform cache settings
    pub cache: CacheConfig,

    /// Document database settings
    pub database: DatabaseConfig,

    /// Named engine configurations, keyed by engine name
    pub engines: BTreeMap<String, EngineConfig>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append transform events to the journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Transform cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory (defaults to `<state_dir>/cache`)
    pub dir: Option<PathBuf>,

    /// Byte budget for cached artifacts, in MB
    pub max_size_mb: u64,

    /// Exact byte budget; overrides `max_size_mb` when set
    pub max_size_bytes: Option<u64>,

    /// Engine used by `get` when given a file path
    pub default_engine: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_size_mb: 1024,
            max_size_bytes: None,
            default_engine: "text".to_string(),
        }
    }
}

impl CacheConfig {
    /// Effective byte budget
    pub fn budget_bytes(&self) -> u64 {
        self.max_size_bytes
            .unwrap_or_else(|| self.max_size_mb.saturating_mul(1024 * 1024))
    }
}

/// Document database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding one JSON file per collection (defaults to `<state_dir>/db`)
    pub dir: Option<PathBuf>,
}

/// Built-in engine implementations selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// UTF-8 text pass-through
    Text,
    /// Hex dump of arbitrary bytes
    Binary,
    /// External conversion program
    Command,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Command => "command",
        };
        write!(f, "{}", name)
    }
}

/// One named engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Which implementation backs this engine
    pub kind: EngineKind,

    /// Base options, merged under caller overrides
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}
