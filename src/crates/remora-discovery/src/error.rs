use thiserror::Error;

/// Errors raised while discovering source nodes (§7, "DiscoveryError").
///
/// Missing grammar and read/parse failures are not represented here: §4.2
/// calls those out as warn-and-skip, not fatal, so they never leave this
/// crate as an `Err`. Only the invalid-query-pack case is fatal.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("language pack {0:?} registered an invalid extraction query: {1}")]
    InvalidQueryPack(String, String),

    #[error("no input paths were given")]
    EmptyInput,
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
