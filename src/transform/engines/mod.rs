//! Built-in engine implementations

mod binary;
mod command;
mod text;

pub use binary::BinaryEngine;
pub use command::CommandEngine;
pub use text::TextEngine;

use crate::config::EngineKind;
use crate::transform::engine::Engine;
use std::sync::Arc;

/// Create the engine implementation for a configured kind
pub fn create_engine(kind: EngineKind) -> Arc<dyn Engine> {
    match kind {
        EngineKind::Text => Arc::new(TextEngine),
        EngineKind::Binary => Arc::new(BinaryEngine),
        EngineKind::Command => Arc::new(CommandEngine),
    }
}
