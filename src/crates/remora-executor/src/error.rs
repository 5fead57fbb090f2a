use thiserror::Error;

/// Errors raised by the graph executor (§7, "ExecutionError"). Per-agent
/// failures never surface here — they become a failed [`remora_model::ResultSummary`]
/// and an `AgentError` event instead; this type is for run-level failures.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("workspace operation failed: {0}")]
    Workspace(String),

    #[error("agent {0:?} timed out")]
    Timeout(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error("unhandled failure: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
