//! Common error types for prismer.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors shared across crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// An editor identifier outside the known set.
    #[error("unknown editor: {0}")]
    UnknownEditor(String),

    /// A stream event could not be encoded or decoded.
    #[error("event encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
