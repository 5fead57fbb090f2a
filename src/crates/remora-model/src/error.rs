//! Error types shared by the data-model crate.

use thiserror::Error;

/// Errors raised while constructing or validating model types.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A `SourceNode` id collided with an existing id inside one run and the
    /// disambiguation counter was exhausted.
    #[error("id collision for node {name:?} in {file_path:?} could not be resolved")]
    IdCollision { file_path: String, name: String },

    /// `ExecutorState` was asked to perform a transition that violates the
    /// monotone status invariant (see `spec.md` §3).
    #[error("invalid status transition for task {task_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        task_id: String,
        from: String,
        to: String,
    },
}

/// Result alias for model-crate operations.
pub type Result<T> = std::result::Result<T, ModelError>;
