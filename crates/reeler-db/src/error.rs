//! Metadata store error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("metadata record not found")]
    NotFound,

    /// Concurrent upsert collision.
    #[error("metadata key conflict")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
