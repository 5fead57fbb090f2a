use thiserror::Error;

/// Errors raised while saving or restoring a checkpoint (§7,
/// "CheckpointError"). Per §4.7, "Any I/O or deserialisation failure
/// MUST raise CheckpointError with context; partial restores are
/// forbidden" — `restore` never leaves a half-reconstructed state behind
/// on error.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint {0:?} not found")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("workspace operation failed during checkpoint: {0}")]
    Workspace(String),
}

pub type Result<T> = std::result::Result<T, CheckpointError>;
