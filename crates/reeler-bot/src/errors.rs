//! Dispatcher error taxonomy
//!
//! Per-message failures (resolution, serialization, chat sends, cache
//! conflicts, rejected FSM events) are handled locally by the owning
//! worker: logged, a generic notice sent to the chat where possible, and
//! the message dropped. Only broker and store connectivity failures are
//! fatal; they abort the worker, which cancels the root token and shuts
//! the whole pipeline down.

use thiserror::Error;

use crate::resolver::ResolveError;
use crate::telegram::ChatError;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Media source lookup or stream failure. Recoverable: the user is
    /// notified and the message dropped; retry is the queue's redelivery.
    #[error("media resolution: {0}")]
    Resolution(#[from] ResolveError),

    /// Malformed queue payload. The message is dropped.
    #[error("malformed payload: {0}")]
    Serialization(String),

    /// Blob or metadata store unavailable. Fatal.
    #[error("storage: {0}")]
    Storage(String),

    /// Concurrent metadata upsert collision. Surfaced, not auto-retried.
    #[error("metadata key conflict")]
    CacheConflict,

    /// FSM rejected an event or the session could not be read/written.
    /// The session is left unchanged; no user notice is required.
    #[error("conversation state: {0}")]
    State(#[from] reeler_state::Error),

    /// Chat transport send failure. Recoverable, logged.
    #[error("chat transport: {0}")]
    Chat(#[from] ChatError),

    /// Queue broker publish/consume failure. Fatal.
    #[error("queue broker: {0}")]
    Queue(String),
}

impl DispatchError {
    /// Whether this failure escalates to full pipeline shutdown.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Queue(_))
    }
}

impl From<reeler_nats::Error> for DispatchError {
    fn from(e: reeler_nats::Error) -> Self {
        match e {
            reeler_nats::Error::Serialization(e) => Self::Serialization(e.to_string()),
            other => Self::Queue(other.to_string()),
        }
    }
}

// NotFound is part of the cache decision tree and must be matched at the
// call site before `?` gets a chance to coarsen it.
impl From<reeler_db::Error> for DispatchError {
    fn from(e: reeler_db::Error) -> Self {
        match e {
            reeler_db::Error::Conflict => Self::CacheConflict,
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<reeler_storage::Error> for DispatchError {
    fn from(e: reeler_storage::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
