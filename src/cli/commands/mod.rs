//! CLI command implementations

pub mod cache;
pub mod completions;
pub mod config;
pub mod engines;
pub mod get;
pub mod transform;

pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use engines::execute as engines;
pub use get::execute as get;
pub use transform::execute as transform;

use crate::error::{DistillError, DistillResult};

/// Run synchronous cache work off the async runtime
pub(crate) async fn blocking<T, F>(work: F) -> DistillResult<T>
where
    F: FnOnce() -> DistillResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DistillError::Internal(format!("Blocking task failed: {}", e)))?
}
