//! Conversation state machine wiring
//!
//! Two states: `Default` (idle, accepts a new request) and `Parsing`
//! (a request is being turned into a fetch job). A parse event moves the
//! session into `Parsing`, whose action runs to completion and cascades
//! straight back to `Default` — a flushed session is never left in
//! `Parsing`.

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod fsm_tests;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use reeler_nats::JobQueue;
use reeler_state::{Action, StateMachine, StateNode};
use reeler_types::JobPayload;

use crate::dispatcher::{DOWNLOAD_STARTED_MESSAGE, SENDING_ERROR_MESSAGE};
use crate::resolver::MediaResolver;
use crate::telegram::ChatSender;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvState {
    #[default]
    Default,
    Parsing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvEvent {
    /// A new chat message should be parsed into a fetch request.
    Parse,
    /// The parsing attempt finished, successfully or not.
    Done,
}

/// Everything the parsing action needs to do its work.
pub struct ParseContext {
    pub text: String,
    pub chat_id: i64,
    pub resolver: Arc<dyn MediaResolver>,
    pub queue: Arc<dyn JobQueue>,
    pub sender: Arc<dyn ChatSender>,
}

pub struct DefaultAction;

#[async_trait]
impl Action<ConvEvent, ParseContext> for DefaultAction {
    async fn execute(&self, _ctx: &mut ParseContext) -> Option<ConvEvent> {
        None
    }
}

/// Resolve the message against the media source and enqueue a fetch job.
///
/// Every outcome returns [`ConvEvent::Done`]: failures notify the user and
/// drop the message, they never strand the session in `Parsing`.
pub struct ParsingAction;

impl ParsingAction {
    async fn notify_failure(ctx: &ParseContext) {
        if let Err(e) = ctx.sender.send_text(ctx.chat_id, SENDING_ERROR_MESSAGE).await {
            error!("send failure notice: {}", e);
        }
    }
}

#[async_trait]
impl Action<ConvEvent, ParseContext> for ParsingAction {
    async fn execute(&self, ctx: &mut ParseContext) -> Option<ConvEvent> {
        let info = match ctx.resolver.resolve(&ctx.text).await {
            Ok(info) => info,
            Err(e) => {
                warn!("parsing video metadata: {}", e);
                Self::notify_failure(ctx).await;
                return Some(ConvEvent::Done);
            }
        };

        let payload = JobPayload::new(info.id, ctx.chat_id);
        if let Err(e) = ctx.queue.publish_fetching(&payload).await {
            error!("publish to fetching queue: {}", e);
            Self::notify_failure(ctx).await;
            return Some(ConvEvent::Done);
        }

        if let Err(e) = ctx
            .sender
            .send_text(ctx.chat_id, DOWNLOAD_STARTED_MESSAGE)
            .await
        {
            error!("send message: {}", e);
        }

        Some(ConvEvent::Done)
    }
}

/// Build the conversation machine in its initial (`Default`) state.
pub fn conversation_machine() -> StateMachine<ConvState, ConvEvent, ParseContext> {
    StateMachine::new(ConvState::Default)
        .state(
            ConvState::Default,
            StateNode::new(DefaultAction).on(ConvEvent::Parse, ConvState::Parsing),
        )
        .state(
            ConvState::Parsing,
            StateNode::new(ParsingAction).on(ConvEvent::Done, ConvState::Default),
        )
}
