//! Get command - print cached content by key or file path

use super::blocking;
use crate::cli::args::GetArgs;
use crate::config::Config;
use crate::error::DistillResult;
use crate::transform::TransformController;
use crate::ui::{self, UiContext};

/// Execute the get command
pub async fn execute(args: GetArgs, config: &Config) -> DistillResult<()> {
    let config = config.clone();
    let target = args.target.clone();
    let output = args.output.clone();

    let content = blocking(move || {
        let controller = TransformController::from_config(&config)?;
        controller.get_content(&target, output.as_deref())
    })
    .await?;

    match args.output {
        Some(path) => {
            let ctx = UiContext::detect();
            ui::step_ok_detail(&ctx, "Artifact copied", &path.display().to_string());
        }
        None if content.ends_with('\n') => print!("{}", content),
        None => println!("{}", content),
    }

    Ok(())
}
