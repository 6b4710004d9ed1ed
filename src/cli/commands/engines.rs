//! Engines command - list registered engines

use crate::cli::args::{EnginesArgs, OutputFormat};
use crate::config::Config;
use crate::error::DistillResult;
use crate::transform::{EngineRegistry, RegisteredEngine};
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct EngineJson<'a> {
    name: &'a str,
    kind: &'a str,
    extension: String,
    default: bool,
    options: &'a serde_json::Map<String, serde_json::Value>,
}

/// Execute the engines command
pub async fn execute(args: EnginesArgs, config: &Config) -> DistillResult<()> {
    let registry = EngineRegistry::from_config(config);
    let default = config.cache.default_engine.as_str();

    match args.format {
        OutputFormat::Table => print_table(&registry, default),
        OutputFormat::Json => {
            let engines: Vec<EngineJson> = registry
                .iter()
                .map(|e| to_json(e, default))
                .collect();
            println!("{}", serde_json::to_string_pretty(&engines)?);
        }
        OutputFormat::Plain => {
            for name in registry.names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn to_json<'a>(engine: &'a RegisteredEngine, default: &str) -> EngineJson<'a> {
    EngineJson {
        name: &engine.name,
        kind: engine.engine.kind(),
        extension: engine.engine.extension(&engine.base_options),
        default: engine.name == default,
        options: &engine.base_options,
    }
}

fn print_table(registry: &EngineRegistry, default: &str) {
    println!("{:<16} {:<10} {:<10} {}", "NAME", "KIND", "EXT", "OPTIONS");
    println!("{}", "-".repeat(64));

    for engine in registry.iter() {
        let name = if engine.name == default {
            format!("{} {}", engine.name, style("*").cyan())
        } else {
            engine.name.clone()
        };
        let options = if engine.base_options.is_empty() {
            style("-").dim().to_string()
        } else {
            serde_json::Value::Object(engine.base_options.clone()).to_string()
        };

        println!(
            "{:<16} {:<10} {:<10} {}",
            name,
            engine.engine.kind(),
            engine.engine.extension(&engine.base_options),
            options
        );
    }

    println!();
    println!("Total: {} engine(s), * = default", registry.names().len());
}
