use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use sklad_core::dialog::{self, DialogSession, SessionStore};

use crate::conversation::ConversationEngine;
use crate::events::{ChatEnvelope, ChatEvent, EventContext, HandlerResult, IncomingMessage};
use crate::transport::{ChatTransport, TransportError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("reply could not be delivered: {0}")]
    Send(#[from] TransportError),
}

/// Routes each inbound message through the dialog machine for its sender. Holds no business
/// rules of its own: it loads the session, runs one step, stores the result and sends the reply.
pub struct Dispatcher {
    sessions: Arc<dyn SessionStore>,
    engine: ConversationEngine,
    replies: Arc<dyn ChatTransport>,
}

impl Dispatcher {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        engine: ConversationEngine,
        replies: Arc<dyn ChatTransport>,
    ) -> Self {
        Self { sessions, engine, replies }
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let ChatEvent::Message(message) = &envelope.event else {
            debug!(
                event_name = "dispatch.event.ignored",
                correlation_id = %ctx.correlation_id,
                event_type = envelope.event.event_type(),
                "ignoring unsupported update"
            );
            return Ok(HandlerResult::Ignored);
        };

        let result = self.handle_message(message, ctx).await;
        if let HandlerResult::Responded(reply) = &result {
            self.replies.send_reply(message.chat_id, reply).await?;
        }
        Ok(result)
    }

    /// Advances the sender's session by one input without sending anything.
    pub async fn handle_message(
        &self,
        message: &IncomingMessage,
        ctx: &EventContext,
    ) -> HandlerResult {
        let session = self.sessions.load(message.user_id);
        let transition = dialog::transition(&session, &message.input);

        info!(
            event_name = "dialog.transition",
            correlation_id = %ctx.correlation_id,
            user_id = %message.user_id,
            chat_id = %message.chat_id,
            from = ?transition.from,
            to = ?transition.to,
            action = transition.action.as_ref().map(|action| action.kind()).unwrap_or("none"),
            "dialog step"
        );

        let outcome = match &transition.action {
            Some(action) => Some(self.engine.execute(action, ctx).await),
            None => None,
        };
        let settled = match outcome {
            Some(outcome) => dialog::settle(&transition, outcome),
            None => transition.into_settled(),
        };

        if settled.state.is_idle() {
            self.sessions.clear(message.user_id);
        } else {
            self.sessions.save(message.user_id, DialogSession::new(settled.state, settled.draft));
        }

        match settled.reply {
            Some(reply) => HandlerResult::Responded(reply),
            None if session.is_idle() => HandlerResult::Ignored,
            None => HandlerResult::Processed,
        }
    }
}
