//! Output functions for consistent CLI formatting

use super::context::UiContext;
use cliclack::ThemeState;
use console::{style, Style};

/// Display a section header
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(message).ok();
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        println!("  {} {} ({})", style("[OK]").green(), message, detail);
    }
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{} - {}", message, style(hint).dim())).ok();
    } else {
        println!("  {} {} - {}", style("[WARN]").yellow(), message, hint);
    }
}

/// Display an error step with detail
pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::error(format!("{}: {}", message, style(detail).red())).ok();
    } else {
        println!("  {} {}: {}", style("[FAIL]").red(), message, detail);
    }
}

/// Display a remark/hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print key-value colored by a three-level status
pub fn key_value_level(ctx: &UiContext, key: &str, value: &str, level: Level) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), level.style().apply_to(value));
    } else {
        println!("  {} {}: {}", level.tag(), key, value);
    }
}

/// Severity for [`key_value_level`] and the prompt theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warn,
    Error,
}

impl Level {
    pub fn style(self) -> Style {
        match self {
            Level::Ok => Style::new().green(),
            Level::Warn => Style::new().yellow(),
            Level::Error => Style::new().red(),
        }
    }

    /// Prefix used when output is plain
    pub fn tag(self) -> &'static str {
        match self {
            Level::Ok => "[OK]",
            Level::Warn => "[WARN]",
            Level::Error => "[FAIL]",
        }
    }
}

/// Prompt theme: magenta while waiting, then the colour of the outcome
#[derive(Debug, Clone, Default)]
pub struct DistillTheme;

impl DistillTheme {
    fn outcome(state: &ThemeState) -> Option<Level> {
        match state {
            ThemeState::Active => None,
            ThemeState::Submit => Some(Level::Ok),
            ThemeState::Cancel => Some(Level::Warn),
            ThemeState::Error(_) => Some(Level::Error),
        }
    }
}

impl cliclack::Theme for DistillTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match Self::outcome(state) {
            None => Style::new().magenta(),
            Some(Level::Ok) => Style::new().magenta().dim(),
            Some(level) => level.style(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        Self::outcome(state).map_or_else(|| Style::new().magenta(), Level::style)
    }
}

/// Install [`DistillTheme`] for every cliclack prompt
pub fn init_theme() {
    cliclack::set_theme(DistillTheme);
}
