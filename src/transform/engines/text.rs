//! UTF-8 text pass-through engine

use crate::error::{DistillError, DistillResult};
use crate::transform::engine::{option_str, Engine, EngineOptions, EngineOutput, Progress};
use std::fs;
use std::path::Path;

/// Copies a file as text, replacing invalid UTF-8 sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEngine;

impl Engine for TextEngine {
    fn transform(
        &self,
        input: &Path,
        output: &Path,
        _options: &EngineOptions,
        progress: Progress<'_>,
    ) -> DistillResult<EngineOutput> {
        progress(&format!("Reading {}", input.display()));
        let bytes = fs::read(input)
            .map_err(|e| DistillError::io(format!("reading {}", input.display()), e))?;

        let text = String::from_utf8_lossy(&bytes);
        fs::write(output, text.as_bytes())
            .map_err(|e| DistillError::io(format!("writing {}", output.display()), e))?;

        progress(&format!("Wrote {} bytes", text.len()));
        Ok(EngineOutput::default())
    }

    fn extension(&self, options: &EngineOptions) -> String {
        option_str(options, "extension").unwrap_or("txt").to_string()
    }

    fn kind(&self) -> &'static str {
        "text"
    }
}
