//! Conversation state machine and persisted session
//!
//! A [`StateMachine`] is a pure transition engine over tagged state and
//! event enums: each state maps events to a next state and carries an
//! [`Action`] that runs on entry. Actions may return a follow-up event,
//! cascading through several transitions from a single external trigger;
//! the cascade is bounded so a runaway action graph fails instead of
//! spinning.
//!
//! A [`Session`] binds a machine to a [`SessionBackend`] entry keyed by an
//! opaque identity: state is loaded before handling a message and flushed
//! afterwards.

pub mod backend;
pub mod error;
pub mod fsm;
pub mod memory;
pub mod session;

pub use backend::SessionBackend;
pub use error::{Error, Result};
pub use fsm::{Action, StateMachine, StateNode, MAX_CASCADE};
pub use memory::MemoryBackend;
pub use session::Session;
