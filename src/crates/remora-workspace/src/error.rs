use thiserror::Error;

/// Errors raised by a [`crate::store::WorkspaceStore`] or
/// [`crate::manager::WorkspaceManager`] (§7, "WorkspaceError").
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace {0:?} not found")]
    NotFound(String),

    #[error("workspace {0:?} already exists")]
    AlreadyExists(String),

    #[error("cannot accept workspace {0:?}: it has no parent to merge into")]
    NoParent(String),

    #[error("seeding failed while copying {path:?}: {reason}")]
    SeedFailed { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
