//! Terminal output for the CLI
//!
//! Uses `cliclack` for styled steps and prompts and `indicatif` for the
//! engine progress spinner, falling back to plain lines when stdout is not
//! a terminal or a CI environment is detected.
//!
//! ```rust,ignore
//! use distill::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Recounting cache...");
//! spinner.stop("Counter matches records");
//! ui::step_warn_hint(&ctx, "Counter drift", "Run: distill cache recount");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    init_theme, key_value, key_value_level, remark, section, step_error_detail, step_ok,
    step_ok_detail, step_warn_hint, DistillTheme, Level,
};
pub use progress::{EngineProgress, TaskSpinner};
pub use prompts::confirm;
