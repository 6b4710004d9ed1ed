//! Transform cache
//!
//! Source files are turned into derived artifacts by pluggable engines.
//! Each artifact is stored once under `<cache_dir>/<cache_key>.<ext>`,
//! described by a record in the document store, and tracked against a
//! byte budget with LRU eviction.

pub mod cache_manager;
pub mod checksum;
pub mod controller;
pub mod engine;
pub mod engines;
pub mod provenance;
pub mod record;
pub mod registry;
pub mod uri;

pub use cache_manager::{format_bytes, CacheManager, CacheSizeStatus, Recount};
pub use controller::{CacheStats, TransformController, TransformOutcome};
pub use engine::{Engine, EngineOptions, EngineOutput, Progress};
pub use provenance::{EdgeKind, ProvenanceGraph};
pub use record::TransformRecord;
pub use registry::{EngineRegistry, RegisteredEngine};
