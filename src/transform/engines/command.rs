//! External program engine
//!
//! Runs a configured command line such as
//! `["pandoc", "{input}", "-t", "plain", "-o", "{output}"]`.
//! Placeholders:
//!
//! | Placeholder | Replaced with |
//! |-------------|---------------|
//! | `{input}` | source file path |
//! | `{output}` | artifact path the command must create |
//! | `{refs}` | directory for auxiliary artifacts (`references = true`) |
//!
//! Every stdout line is forwarded as a progress message. With
//! `references = true`, files left in `<output>.refs/` are reported as
//! referenced URIs.

use crate::error::{DistillError, DistillResult};
use crate::transform::engine::{
    option_bool, option_str, Engine, EngineOptions, EngineOutput, Progress,
};
use crate::transform::record::refs_dir;
use crate::transform::uri;
use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Max number of output lines to include in failure messages.
const ERROR_TAIL_LINES: usize = 20;

/// Runs an external converter to produce the artifact
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandEngine;

/// Last `ERROR_TAIL_LINES` lines of combined output
fn error_tail(stdout: &[String], stderr: &str) -> String {
    let lines: Vec<&str> = stdout
        .iter()
        .map(String::as_str)
        .chain(stderr.lines())
        .collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

fn substitute(arg: &str, input: &Path, output: &Path, refs: &Path) -> String {
    arg.replace("{input}", &input.to_string_lossy())
        .replace("{output}", &output.to_string_lossy())
        .replace("{refs}", &refs.to_string_lossy())
}

impl CommandEngine {
    fn argv(options: &EngineOptions) -> DistillResult<Vec<String>> {
        let invalid = || {
            DistillError::engine_failure(
                "command",
                "option 'command' must be a non-empty array of strings",
            )
        };

        let items = options
            .get("command")
            .and_then(Value::as_array)
            .ok_or_else(invalid)?;
        let argv: Vec<String> = items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<_>>()
            .ok_or_else(invalid)?;

        if argv.is_empty() {
            return Err(invalid());
        }
        Ok(argv)
    }

    fn collect_references(dir: &Path) -> DistillResult<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut uris = Vec::new();
        let entries = fs::read_dir(dir)
            .map_err(|e| DistillError::io(format!("reading {}", dir.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DistillError::io("reading reference entry", e))?;
            let path = entry.path();
            if path.is_file() {
                uris.push(uri::file_uri(&path));
            }
        }
        uris.sort();
        Ok(uris)
    }
}

impl Engine for CommandEngine {
    fn transform(
        &self,
        input: &Path,
        output: &Path,
        options: &EngineOptions,
        progress: Progress<'_>,
    ) -> DistillResult<EngineOutput> {
        let argv = Self::argv(options)?;
        let with_refs = option_bool(options, "references").unwrap_or(false);
        let refs = refs_dir(output);
        if with_refs {
            fs::create_dir_all(&refs)
                .map_err(|e| DistillError::io(format!("creating {}", refs.display()), e))?;
        }

        let args: Vec<String> = argv
            .iter()
            .map(|a| substitute(a, input, output, &refs))
            .collect();
        debug!("Running engine command: {}", args.join(" "));
        progress(&format!("Running {}", args[0]));

        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DistillError::engine_failure("command", format!("{}: {}", args[0], e)))?;

        // drain stderr off-thread so a chatty child cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let mut stdout_lines = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                progress(&line);
                stdout_lines.push(line);
            }
        }

        let status = child
            .wait()
            .map_err(|e| DistillError::io(format!("waiting for {}", args[0]), e))?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(DistillError::engine_failure(
                "command",
                format!(
                    "{} exited with {}\n{}",
                    args[0],
                    code,
                    error_tail(&stdout_lines, &stderr)
                ),
            ));
        }

        let referenced_uris = if with_refs {
            Self::collect_references(&refs)?
        } else {
            Vec::new()
        };
        Ok(EngineOutput { referenced_uris })
    }

    fn extension(&self, options: &EngineOptions) -> String {
        option_str(options, "extension").unwrap_or("txt").to_string()
    }

    fn kind(&self) -> &'static str {
        "command"
    }
}
