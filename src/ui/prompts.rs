//! Interactive prompts with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{DistillError, DistillResult};

/// Prompt for confirmation, returns default if non-interactive or auto-yes
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> DistillResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| DistillError::User(format!("Prompt task failed: {}", e)))?;

    result.map_err(|e| DistillError::User(format!("Prompt failed: {}", e)))
}
