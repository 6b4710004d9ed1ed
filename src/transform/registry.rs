//! Engine registry keyed by configuration name

use super::engine::{Engine, EngineOptions};
use super::engines::{create_engine, BinaryEngine, TextEngine};
use crate::config::Config;
use crate::error::{DistillError, DistillResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// An engine together with the base options it was configured with
#[derive(Clone)]
pub struct RegisteredEngine {
    /// Configuration name, part of every cache key
    pub name: String,
    /// Implementation
    pub engine: Arc<dyn Engine>,
    /// Options merged under caller overrides
    pub base_options: EngineOptions,
}

impl std::fmt::Debug for RegisteredEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredEngine")
            .field("name", &self.name)
            .field("kind", &self.engine.kind())
            .field("base_options", &self.base_options)
            .finish()
    }
}

/// Name → engine lookup, populated once at startup
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, RegisteredEngine>,
}

impl EngineRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `text` and `binary` built-ins
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("text", Arc::new(TextEngine), EngineOptions::new());
        registry.register("binary", Arc::new(BinaryEngine), EngineOptions::new());
        registry
    }

    /// Built-ins plus every `[engines.<name>]` entry; config entries win
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::with_builtins();
        for (name, engine) in &config.engines {
            debug!("Registering engine {} ({})", name, engine.kind);
            registry.register(name, create_engine(engine.kind), engine.options.clone());
        }
        registry
    }

    /// Add or replace an engine under `name`
    pub fn register(
        &mut self,
        name: impl Into<String>,
        engine: Arc<dyn Engine>,
        base_options: EngineOptions,
    ) {
        let name = name.into();
        self.engines.insert(
            name.clone(),
            RegisteredEngine {
                name,
                engine,
                base_options,
            },
        );
    }

    /// Look up an engine, failing with the list of known names
    pub fn get(&self, name: &str) -> DistillResult<&RegisteredEngine> {
        self.engines
            .get(name)
            .ok_or_else(|| DistillError::UnknownEngine {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }

    /// Iterate registered engines in name order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredEngine> {
        self.engines.values()
    }
}
