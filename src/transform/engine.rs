//! Transform engine abstraction
//!
//! An engine turns one source file into one derived artifact (plain text,
//! a hex dump, the output of an external converter, ...). The controller
//! only relies on this trait; how the bytes are produced is up to the
//! implementation.

use super::checksum;
use crate::error::DistillResult;
use serde_json::Value;
use std::path::Path;

/// Engine options: a JSON object merged from config and caller overrides
pub type EngineOptions = serde_json::Map<String, Value>;

/// Callback receiving human-readable progress messages
pub type Progress<'a> = &'a mut dyn FnMut(&str);

/// What an engine reports after writing its output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// URIs of auxiliary artifacts written as a side effect
    pub referenced_uris: Vec<String>,
}

/// Abstract transform engine interface
///
/// Calls block until the engine is done; there is no timeout or
/// cancellation at this layer.
pub trait Engine: Send + Sync {
    /// Write the transformed form of `input` to `output`
    fn transform(
        &self,
        input: &Path,
        output: &Path,
        options: &EngineOptions,
        progress: Progress<'_>,
    ) -> DistillResult<EngineOutput>;

    /// Artifact extension for these options, without the dot
    fn extension(&self, options: &EngineOptions) -> String;

    /// Deterministic digest distinguishing parameterisations
    fn options_hash(&self, options: &EngineOptions) -> String {
        checksum::hash_options(options)
    }

    /// Human-readable implementation name for display
    fn kind(&self) -> &'static str;
}

/// Merge caller overrides onto base options; overrides win on collision
pub fn merge_options(base: &EngineOptions, overrides: &EngineOptions) -> EngineOptions {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// String option lookup
pub fn option_str<'a>(options: &'a EngineOptions, key: &str) -> Option<&'a str> {
    options.get(key).and_then(Value::as_str)
}

/// Unsigned integer option lookup, accepting numeric strings
pub fn option_u64(options: &EngineOptions, key: &str) -> Option<u64> {
    match options.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Boolean option lookup
pub fn option_bool(options: &EngineOptions, key: &str) -> Option<bool> {
    options.get(key).and_then(Value::as_bool)
}
