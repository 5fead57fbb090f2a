//! Path plumbing between project and workspace views (§3), and the
//! `AgentRuntime` trait boundary consumed by the executor (§6, §4.8).

mod error;
mod path;
mod runtime;

pub use error::{Result, ToolingError};
pub use path::{to_project_absolute, to_workspace_relative};
pub use runtime::{AgentRunOutput, AgentRuntime, Behavior, FakeAgentRuntime, HumanInputCoordinator, ModelParams};
