//! Error types for state machine and session operations

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The current state has no transition for the given event.
    /// The machine is left unchanged.
    #[error("event rejected")]
    EventRejected,

    /// A transition names a state the machine does not know.
    #[error("state not found")]
    StateNotFound,

    /// A chain of cascading transitions exceeded [`crate::MAX_CASCADE`].
    #[error("transition cascade exceeded the iteration bound")]
    CascadeOverflow,

    /// No persisted session exists for the identity.
    #[error("session not found")]
    SessionNotFound,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}
