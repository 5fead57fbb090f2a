//! Core data model for the remora execution plane.
//!
//! Defines the immutable [`SourceNode`] and [`AgentTask`] types and the
//! mutable, single-owner [`ExecutorState`] that the graph executor drives.
//! See `spec.md` §3 for the authoritative invariants.

pub mod error;
pub mod node;
pub mod state;
pub mod task;

pub use error::{ModelError, Result};
pub use node::{sort_key, NodeType, SourceNode, NODE_TYPE_CLASS, NODE_TYPE_FILE, NODE_TYPE_FUNCTION, NODE_TYPE_METHOD};
pub use state::{ExecutorState, ExecutorStateView, ResultSummary, TaskStatus};
pub use task::{AgentTask, BundleHandle};
