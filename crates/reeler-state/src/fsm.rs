//! Pure transition engine

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Upper bound on cascading transitions triggered by a single event.
pub const MAX_CASCADE: usize = 16;

/// Behavior executed when a state is entered.
///
/// Returning `Some(event)` feeds the event back into the machine,
/// cascading into the next transition; `None` ends the chain.
#[async_trait]
pub trait Action<E, C>: Send + Sync {
    async fn execute(&self, ctx: &mut C) -> Option<E>;
}

/// A state's action plus its outgoing transitions.
pub struct StateNode<S, E, C> {
    action: Box<dyn Action<E, C>>,
    transitions: HashMap<E, S>,
}

impl<S, E, C> StateNode<S, E, C>
where
    S: Copy + Eq + Hash,
    E: Copy + Eq + Hash + Send,
    C: Send,
{
    pub fn new(action: impl Action<E, C> + 'static) -> Self {
        Self {
            action: Box::new(action),
            transitions: HashMap::new(),
        }
    }

    /// Add a transition taken when `event` arrives in this state.
    pub fn on(mut self, event: E, next: S) -> Self {
        self.transitions.insert(event, next);
        self
    }
}

/// Transition engine over tagged state/event enums.
///
/// Holds the current and previous state tags; all I/O lives in the actions'
/// context, never in the machine itself.
pub struct StateMachine<S, E, C> {
    current: S,
    previous: Option<S>,
    states: HashMap<S, StateNode<S, E, C>>,
}

impl<S, E, C> StateMachine<S, E, C>
where
    S: Copy + Eq + Hash + fmt::Debug + Send,
    E: Copy + Eq + Hash + fmt::Debug + Send,
    C: Send,
{
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            previous: None,
            states: HashMap::new(),
        }
    }

    /// Register a state. Builder-style, consumed during machine setup.
    pub fn state(mut self, tag: S, node: StateNode<S, E, C>) -> Self {
        self.states.insert(tag, node);
        self
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn previous(&self) -> Option<S> {
        self.previous
    }

    /// Overwrite the machine's position, used when a session is loaded.
    pub fn restore(&mut self, current: S, previous: Option<S>) {
        self.current = current;
        self.previous = previous;
    }

    /// Drive the machine with an external event.
    ///
    /// A rejected event leaves the machine unchanged. After each
    /// transition the target state's action runs; if it returns a
    /// follow-up event the loop continues, up to [`MAX_CASCADE`] steps.
    pub async fn send_event(&mut self, event: E, ctx: &mut C) -> Result<()> {
        let mut event = event;

        for _ in 0..MAX_CASCADE {
            let next = self
                .states
                .get(&self.current)
                .and_then(|node| node.transitions.get(&event))
                .copied()
                .ok_or(Error::EventRejected)?;

            if !self.states.contains_key(&next) {
                return Err(Error::StateNotFound);
            }

            self.previous = Some(self.current);
            self.current = next;

            let node = self.states.get(&next).ok_or(Error::StateNotFound)?;
            match node.action.execute(ctx).await {
                None => return Ok(()),
                Some(follow_up) => event = follow_up,
            }
        }

        Err(Error::CascadeOverflow)
    }
}
