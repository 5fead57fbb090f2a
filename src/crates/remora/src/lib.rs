//! Discovery, graph construction, isolated workspaces, and batch execution
//! for coordinating many agents over one codebase.
//!
//! This crate is a thin facade: each concern lives in its own crate
//! (`remora-discovery`, `remora-graph`, `remora-workspace`,
//! `remora-context`, `remora-executor`, `remora-checkpoint`,
//! `remora-tooling`, `remora-events`, `remora-model`) and [`Pipeline`]
//! wires them into one end-to-end run.

mod error;
mod pipeline;

pub use error::{RemoraError, Result};
pub use pipeline::{Pipeline, PipelineConfig};

pub use remora_checkpoint::{CheckpointError, CheckpointManager, CheckpointedState};
pub use remora_context::{ContextBuilder, ContextConfig, RecentAction, RelatedCodeStore};
pub use remora_discovery::{discover, DiscoveryConfig, DiscoveryError, LanguagePack, LanguagePackRegistry, RustLanguagePack};
pub use remora_events::{Event, EventBus, EventKind, StreamGuard, SubscriptionId};
pub use remora_executor::{ErrorPolicy, ExecutionError, Executor, ExecutorConfig};
pub use remora_graph::{build, BundleMapping, EdgeRule, Graph, GraphError, IntraFileEdgeRule};
pub use remora_model::{
    AgentTask, BundleHandle, ExecutorState, ExecutorStateView, NodeType, ResultSummary, SourceNode, TaskStatus,
    NODE_TYPE_CLASS, NODE_TYPE_FILE, NODE_TYPE_FUNCTION, NODE_TYPE_METHOD,
};
pub use remora_tooling::{AgentRunOutput, AgentRuntime, Behavior, FakeAgentRuntime, HumanInputCoordinator, ModelParams, ToolingError};
pub use remora_workspace::{MemoryStore, WorkspaceConfig, WorkspaceError, WorkspaceManager, WorkspaceStore};

/// The crate's own version, for agents that report it back over the bus.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
