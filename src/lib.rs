//! Distill - durable transform cache
//!
//! Turns a (source file, engine, options) triple into a cached artifact,
//! computed at most once per cache key, bounded by a byte budget with LRU
//! eviction, and kept consistent with its metadata store even after
//! artifacts are removed behind its back.

pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod store;
pub mod transform;
pub mod ui;

pub use error::{DistillError, DistillResult};
