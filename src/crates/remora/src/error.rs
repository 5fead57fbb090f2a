use thiserror::Error;

/// Facade error: every subsystem error folds into this so a caller driving
/// the whole pipeline only needs one `Result` type.
#[derive(Debug, Error)]
pub enum RemoraError {
    #[error(transparent)]
    Discovery(#[from] remora_discovery::DiscoveryError),

    #[error(transparent)]
    Graph(#[from] remora_graph::GraphError),

    #[error(transparent)]
    Workspace(#[from] remora_workspace::WorkspaceError),

    #[error(transparent)]
    Execution(#[from] remora_executor::ExecutionError),

    #[error(transparent)]
    Checkpoint(#[from] remora_checkpoint::CheckpointError),
}

pub type Result<T> = std::result::Result<T, RemoraError>;
