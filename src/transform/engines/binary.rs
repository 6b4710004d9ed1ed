//! Hex dump engine for arbitrary bytes

use crate::error::{DistillError, DistillResult};
use crate::transform::engine::{option_u64, Engine, EngineOptions, EngineOutput, Progress};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const DEFAULT_WIDTH: usize = 16;
const MAX_WIDTH: usize = 64;

/// Renders any file as a text hex dump
///
/// Each line is `<offset>  <hex bytes>  |<printable ascii>|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryEngine;

impl BinaryEngine {
    fn width(options: &EngineOptions) -> usize {
        option_u64(options, "width")
            .map(|w| (w as usize).clamp(1, MAX_WIDTH))
            .unwrap_or(DEFAULT_WIDTH)
    }
}

/// Format one dump line for `chunk` starting at `offset`
fn dump_line(offset: u64, chunk: &[u8], width: usize) -> String {
    let mut line = format!("{:08x} ", offset);
    for i in 0..width {
        match chunk.get(i) {
            Some(b) => {
                let _ = write!(line, " {:02x}", b);
            }
            None => line.push_str("   "),
        }
    }
    line.push_str("  |");
    line.extend(chunk.iter().map(|&b| {
        if b.is_ascii_graphic() || b == b' ' {
            b as char
        } else {
            '.'
        }
    }));
    line.push('|');
    line
}

impl Engine for BinaryEngine {
    fn transform(
        &self,
        input: &Path,
        output: &Path,
        options: &EngineOptions,
        progress: Progress<'_>,
    ) -> DistillResult<EngineOutput> {
        let width = Self::width(options);
        let source = File::open(input)
            .map_err(|e| DistillError::io(format!("opening {}", input.display()), e))?;
        let target = File::create(output)
            .map_err(|e| DistillError::io(format!("creating {}", output.display()), e))?;

        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(target);
        let mut chunk = vec![0u8; width];
        let mut offset: u64 = 0;

        progress(&format!("Dumping {} ({} bytes per line)", input.display(), width));
        loop {
            // fill a whole line unless we hit EOF
            let mut filled = 0;
            while filled < width {
                let n = reader
                    .read(&mut chunk[filled..])
                    .map_err(|e| DistillError::io(format!("reading {}", input.display()), e))?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }

            writeln!(writer, "{}", dump_line(offset, &chunk[..filled], width))
                .map_err(|e| DistillError::io(format!("writing {}", output.display()), e))?;
            offset += filled as u64;

            if filled < width {
                break;
            }
        }

        writer
            .flush()
            .map_err(|e| DistillError::io(format!("flushing {}", output.display()), e))?;
        progress(&format!("Dumped {} bytes", offset));
        Ok(EngineOutput::default())
    }

    fn extension(&self, _options: &EngineOptions) -> String {
        "hex".to_string()
    }

    fn kind(&self) -> &'static str {
        "binary"
    }
}
