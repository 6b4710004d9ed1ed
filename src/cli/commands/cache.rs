//! Cache command - inspect and maintain the transform cache

use super::blocking;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::DistillResult;
use crate::transform::{
    format_bytes, CacheSizeStatus, CacheStats, TransformController, TransformRecord,
};
use crate::ui::{self, Level, TaskSpinner, UiContext};
use console::style;
use serde_json::json;

/// Characters of the cache key shown in tables
const SHORT_KEY_LEN: usize = 12;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> DistillResult<()> {
    match args.action {
        CacheAction::Stats { format } => show_stats(config, format).await,
        CacheAction::List { format, limit } => list_records(config, format, limit).await,
        CacheAction::Recount => recount(config).await,
        CacheAction::Clear { yes } => clear(config, yes).await,
    }
}

async fn show_stats(config: &Config, format: OutputFormat) -> DistillResult<()> {
    let config = config.clone();
    let stats = blocking(move || TransformController::from_config(&config)?.stats()).await?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "entries": stats.entries,
                "total_size_bytes": stats.total_size_bytes,
                "recorded_bytes": stats.recorded_bytes,
                "budget_bytes": stats.budget_bytes,
                "percentage": stats.percentage(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Plain => {
            println!(
                "{} {} {}",
                stats.entries, stats.total_size_bytes, stats.budget_bytes
            );
        }
        OutputFormat::Table => print_stats(&UiContext::detect(), &stats),
    }

    Ok(())
}

fn print_stats(ctx: &UiContext, stats: &CacheStats) {
    ui::section(ctx, "Transform cache");
    ui::key_value(ctx, "Entries", &stats.entries.to_string());

    let level = match stats.status() {
        CacheSizeStatus::Ok => Level::Ok,
        CacheSizeStatus::Warning => Level::Warn,
        CacheSizeStatus::Exceeded => Level::Error,
    };
    ui::key_value_level(
        ctx,
        "Size",
        &format!(
            "{} of {} ({:.1}%)",
            format_bytes(stats.total_size_bytes),
            format_bytes(stats.budget_bytes),
            stats.percentage()
        ),
        level,
    );

    if stats.has_drift() {
        ui::step_warn_hint(
            ctx,
            &format!(
                "Counter says {} but records sum to {}",
                format_bytes(stats.total_size_bytes),
                format_bytes(stats.recorded_bytes)
            ),
            "Run: distill cache recount",
        );
    }
}

async fn list_records(
    config: &Config,
    format: OutputFormat,
    limit: Option<usize>,
) -> DistillResult<()> {
    let config = config.clone();
    let mut records =
        blocking(move || TransformController::from_config(&config)?.records()).await?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    match format {
        OutputFormat::Table => print_table(&records),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Plain => {
            for record in &records {
                println!("{}", record.computed_key());
            }
        }
    }

    Ok(())
}

fn print_table(records: &[TransformRecord]) {
    if records.is_empty() {
        println!("No cached artifacts.");
        return;
    }

    println!(
        "{:<14} {:<10} {:>10} {:<17} {}",
        "KEY", "ENGINE", "SIZE", "LAST ACCESSED", "SOURCE"
    );
    println!("{}", "-".repeat(80));

    for record in records {
        let key = record.computed_key();
        println!(
            "{:<14} {:<10} {:>10} {:<17} {}",
            &key[..SHORT_KEY_LEN],
            record.engine,
            format_bytes(record.size_bytes),
            record.last_accessed.format("%Y-%m-%d %H:%M"),
            style(&record.file_uri).dim()
        );
    }

    println!();
    println!("Total: {} artifact(s)", records.len());
}

async fn recount(config: &Config) -> DistillResult<()> {
    let ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Recounting cache...");

    let config = config.clone();
    let result = blocking(move || TransformController::from_config(&config)?.recount()).await;
    let recount = match result {
        Ok(recount) => recount,
        Err(e) => {
            spinner.stop_error("Recount failed");
            return Err(e);
        }
    };

    spinner.stop(&format!(
        "Counter {} -> {}",
        format_bytes(recount.before),
        format_bytes(recount.after)
    ));
    if recount.stale_records > 0 {
        ui::remark(
            &ctx,
            &format!("Removed {} stale record(s)", recount.stale_records),
        );
    }

    Ok(())
}

async fn clear(config: &Config, yes: bool) -> DistillResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    let stats = {
        let config = config.clone();
        blocking(move || TransformController::from_config(&config)?.stats()).await?
    };
    if stats.entries == 0 {
        println!("No cached artifacts to clear.");
        return Ok(());
    }

    let prompt = format!(
        "Remove {} cached artifact(s) ({})?",
        stats.entries,
        format_bytes(stats.total_size_bytes)
    );
    if !ui::confirm(&ctx, &prompt, false).await? {
        println!("Aborted.");
        return Ok(());
    }

    let config = config.clone();
    let removed = blocking(move || TransformController::from_config(&config)?.clear()).await?;
    ui::step_ok(&ctx, &format!("Cleared {} artifact(s)", removed));

    Ok(())
}
