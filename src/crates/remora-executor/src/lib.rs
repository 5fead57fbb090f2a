//! Batch-by-batch graph execution: scheduling, concurrency, and the
//! configurable failure policy that reacts to a task going wrong (§4.6).

mod config;
mod error;
mod executor;

pub use config::{ErrorPolicy, ExecutorConfig};
pub use error::{ExecutionError, Result};
pub use executor::Executor;
