//! Persisted conversation session

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backend::SessionBackend;
use crate::error::{Error, Result};
use crate::fsm::StateMachine;

/// The shape written to the backend.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState<S> {
    current: S,
    previous: Option<S>,
}

/// Binds a state machine to a backend entry keyed by an opaque identity.
///
/// `load` before handling a message, `flush` after. A missing record
/// leaves the machine in its initial state; a corrupt record is a hard
/// error for the caller to drop the message on.
pub struct Session<S, E, C> {
    identity: String,
    backend: Arc<dyn SessionBackend>,
    machine: StateMachine<S, E, C>,
}

impl<S, E, C> Session<S, E, C>
where
    S: Copy + Eq + Hash + fmt::Debug + Send + Serialize + DeserializeOwned,
    E: Copy + Eq + Hash + fmt::Debug + Send,
    C: Send,
{
    pub fn new(
        identity: impl Into<String>,
        backend: Arc<dyn SessionBackend>,
        machine: StateMachine<S, E, C>,
    ) -> Self {
        Self {
            identity: identity.into(),
            backend,
            machine,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn current(&self) -> S {
        self.machine.current()
    }

    pub fn previous(&self) -> Option<S> {
        self.machine.previous()
    }

    /// Load persisted state into the machine. Not-found is success: the
    /// machine stays in its initial state.
    pub async fn load(&mut self) -> Result<()> {
        let bytes = match self.backend.get(&self.identity).await {
            Ok(bytes) => bytes,
            Err(Error::SessionNotFound) => return Ok(()),
            Err(e) => return Err(e),
        };

        let state: PersistedState<S> = serde_json::from_slice(&bytes)?;
        self.machine.restore(state.current, state.previous);
        Ok(())
    }

    /// Write the machine's position back under the backend's TTL policy.
    pub async fn flush(&self) -> Result<()> {
        let encoded = serde_json::to_vec(&PersistedState {
            current: self.machine.current(),
            previous: self.machine.previous(),
        })?;
        self.backend.set(&self.identity, encoded).await
    }

    /// Remove the persisted record.
    pub async fn clean(&self) -> Result<()> {
        self.backend.delete(&self.identity).await
    }

    /// Drive the underlying machine. See [`StateMachine::send_event`].
    pub async fn send_event(&mut self, event: E, ctx: &mut C) -> Result<()> {
        self.machine.send_event(event, ctx).await
    }
}
