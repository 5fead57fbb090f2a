use thiserror::Error;

/// Errors raised while normalising paths or invoking the external agent
/// runtime (§7, "ToolingError").
#[derive(Debug, Error)]
pub enum ToolingError {
    #[error("path {0:?} escapes the project root")]
    PathEscapesRoot(String),

    #[error("agent runtime invocation failed: {0}")]
    RuntimeFailed(String),

    #[error("agent runtime invocation timed out")]
    RuntimeTimeout,

    #[error("agent runtime invocation was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ToolingError>;
