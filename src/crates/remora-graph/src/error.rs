use thiserror::Error;

/// Errors raised while building or ordering a graph (§7, "GraphError").
#[derive(Debug, Error)]
pub enum GraphError {
    /// Kahn's algorithm couldn't make progress: the named ids form a cycle.
    #[error("cycle detected among task ids: {0:?}")]
    Cycle(Vec<String>),

    /// An edge rule referenced a task id that doesn't exist in the graph.
    #[error("edge rule produced unknown upstream id {0:?} for task {1:?}")]
    UnknownUpstream(String, String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
