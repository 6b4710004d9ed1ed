//! Transform command - produce or reuse a cached artifact

use super::blocking;
use crate::cli::args::{OutputFormat, TransformArgs};
use crate::config::Config;
use crate::error::DistillResult;
use crate::transform::{EngineOptions, TransformController, TransformOutcome};
use crate::ui::{self, EngineProgress, UiContext};

/// Execute the transform command
pub async fn execute(args: TransformArgs, config: &Config) -> DistillResult<()> {
    let ctx = UiContext::detect();
    let engine = args
        .engine
        .clone()
        .unwrap_or_else(|| config.cache.default_engine.clone());
    let overrides: EngineOptions = args.options.iter().cloned().collect();

    let progress = EngineProgress::new(&ctx, &engine);
    let reporter = progress.clone();
    let config = config.clone();
    let file = args.file.clone();
    let output = args.output.clone();

    let result = blocking(move || {
        let controller = TransformController::from_config(&config)?;
        controller.transform_with_progress(
            &file,
            &engine,
            &overrides,
            output.as_deref(),
            &mut |msg| reporter.on_message(msg),
        )
    })
    .await;
    progress.finish();
    let outcome = result?;

    match args.format {
        OutputFormat::Table => print_outcome(&ctx, &args, &outcome),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Plain => println!("{}", outcome.cache_key),
    }

    Ok(())
}

fn print_outcome(ctx: &UiContext, args: &TransformArgs, outcome: &TransformOutcome) {
    let status = if outcome.was_cached { "hit" } else { "miss" };
    ui::step_ok_detail(
        ctx,
        &format!("{} ({})", args.file.display(), status),
        &outcome.cache_key,
    );
    ui::key_value(ctx, "Artifact", &outcome.cache_path.display().to_string());
    if let Some(ref output) = args.output {
        ui::key_value(ctx, "Output", &output.display().to_string());
    }
}
