use std::collections::VecDeque;
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sklad_core::dialog::{DialogInput, PhotoAttachment, Reply, UserId};

use crate::api::{TelegramClient, Update};
use crate::dispatcher::Dispatcher;
use crate::events::{ChatEnvelope, ChatEvent, ChatId, EventContext, IncomingMessage};
use crate::keyboard::ReplyMarkup;
use crate::media::MediaStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("photo download failed: {0}")]
    Download(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    fn capped(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Next inbound update, or `None` once the stream is closed.
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn acknowledge(&self, update_id: i64) -> Result<(), TransportError>;
    async fn send_reply(&self, chat_id: ChatId, reply: &Reply) -> Result<(), TransportError>;
    async fn download_photo(&self, file_id: &str) -> Result<Vec<u8>, TransportError>;
}

#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl ChatTransport for NoopTransport {
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _update_id: i64) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_reply(&self, _chat_id: ChatId, _reply: &Reply) -> Result<(), TransportError> {
        Ok(())
    }

    async fn download_photo(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Download(format!("no transport to fetch `{file_id}` from")))
    }
}

#[derive(Default)]
struct PollState {
    buffered: VecDeque<Update>,
    offset: Option<i64>,
}

/// Bot API transport: long-polls `getUpdates` and hands out one update at a time.
pub struct TelegramTransport {
    client: TelegramClient,
    media: Arc<dyn MediaStore>,
    bot_username: Option<String>,
    state: Mutex<PollState>,
}

impl TelegramTransport {
    pub fn new(
        client: TelegramClient,
        media: Arc<dyn MediaStore>,
        bot_username: Option<String>,
    ) -> Self {
        Self { client, media, bot_username, state: Mutex::new(PollState::default()) }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        let mut state = self.state.lock().await;
        loop {
            if let Some(update) = state.buffered.pop_front() {
                return Ok(Some(envelope_from_update(update, self.bot_username.as_deref())));
            }

            let updates = self
                .client
                .get_updates(state.offset)
                .await
                .map_err(|error| TransportError::Receive(error.to_string()))?;
            debug!(count = updates.len(), offset = ?state.offset, "polled telegram updates");
            state.buffered.extend(updates);
        }
    }

    // Telegram drops everything below the offset on the next poll.
    async fn acknowledge(&self, update_id: i64) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let next = update_id + 1;
        if state.offset.map_or(true, |offset| offset < next) {
            state.offset = Some(next);
        }
        Ok(())
    }

    async fn send_reply(&self, chat_id: ChatId, reply: &Reply) -> Result<(), TransportError> {
        let markup = ReplyMarkup::for_reply(reply);

        if let Some(photo_ref) = &reply.image {
            match self.media.load(photo_ref).await {
                Ok(photo) => {
                    return self
                        .client
                        .send_photo(chat_id.0, photo, &reply.text, &markup)
                        .await
                        .map_err(|error| TransportError::Send(error.to_string()));
                }
                Err(error) => warn!(
                    event_name = "egress.telegram.photo_missing",
                    chat_id = %chat_id,
                    photo_ref = %photo_ref,
                    error = %error,
                    "item photo unavailable; sending text only"
                ),
            }
        }

        self.client
            .send_message(chat_id.0, &reply.text, &markup)
            .await
            .map_err(|error| TransportError::Send(error.to_string()))
    }

    async fn download_photo(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        self.client
            .download(file_id)
            .await
            .map_err(|error| TransportError::Download(error.to_string()))
    }
}

fn envelope_from_update(update: Update, bot_username: Option<&str>) -> ChatEnvelope {
    let unsupported = |event_type: &str| ChatEnvelope {
        update_id: update.update_id,
        event: ChatEvent::Unsupported { event_type: event_type.to_owned() },
    };

    let Some(message) = &update.message else {
        return unsupported("non_message");
    };
    let Some(sender) = message.from.as_ref().filter(|user| !user.is_bot) else {
        return unsupported("no_human_sender");
    };

    let input = if let Some(size) = message.largest_photo() {
        DialogInput::Photo(PhotoAttachment { file_id: size.file_id.clone() })
    } else if let Some(text) = &message.text {
        if addressed_elsewhere(text, bot_username) {
            return unsupported("foreign_command");
        }
        DialogInput::Text(text.clone())
    } else {
        return unsupported("other_message");
    };

    ChatEnvelope {
        update_id: update.update_id,
        event: ChatEvent::Message(IncomingMessage {
            chat_id: ChatId(message.chat.id),
            user_id: UserId(sender.id),
            input,
        }),
    }
}

/// `/cmd@other_bot` in a group chat is meant for another bot.
fn addressed_elsewhere(text: &str, bot_username: Option<&str>) -> bool {
    let Some(own) = bot_username else {
        return false;
    };
    let command = text.split_whitespace().next().unwrap_or_default();
    if !command.starts_with('/') {
        return false;
    }
    match command.split_once('@') {
        Some((_, target)) => !target.eq_ignore_ascii_case(own.trim_start_matches('@')),
        None => false,
    }
}

pub struct PollingRunner {
    transport: Arc<dyn ChatTransport>,
    dispatcher: Dispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl PollingRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        dispatcher: Dispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Pumps updates until the transport closes. Consecutive transport failures back off and
    /// are retried without limit; past `max_retries` the delay stays at the cap. The counter
    /// resets once an update gets through.
    pub async fn start(&self) -> Result<()> {
        let mut failures = 0_u32;
        loop {
            let mut delivered = 0_usize;
            match self.pump(&mut delivered).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    if delivered > 0 {
                        failures = 0;
                    }
                    warn!(
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "telegram transport failed"
                    );

                    let delay = if failures >= self.reconnect_policy.max_retries {
                        if failures == self.reconnect_policy.max_retries {
                            warn!(
                                max_retries = self.reconnect_policy.max_retries,
                                max_delay_ms = self.reconnect_policy.max_delay_ms,
                                "telegram retries exhausted; polling on at the capped delay"
                            );
                        }
                        self.reconnect_policy.capped()
                    } else {
                        self.reconnect_policy.backoff(failures)
                    };
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    failures = failures.saturating_add(1);
                }
            }
        }
    }

    async fn pump(&self, delivered: &mut usize) -> Result<(), TransportError> {
        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!("telegram update stream closed");
                return Ok(());
            };
            *delivered += 1;
            let context = EventContext::for_update(envelope.update_id);

            info!(
                event_name = "ingress.telegram.update_received",
                update_id = envelope.update_id,
                event_type = envelope.event.event_type(),
                correlation_id = %context.correlation_id,
                "received telegram update"
            );

            if let Err(error) = self.transport.acknowledge(envelope.update_id).await {
                warn!(
                    event_name = "ingress.telegram.ack_sent",
                    update_id = envelope.update_id,
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "failed to acknowledge telegram update"
                );
            }

            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(result) => debug!(
                    correlation_id = %context.correlation_id,
                    result = ?result,
                    "update handled"
                ),
                Err(error) => warn!(
                    update_id = envelope.update_id,
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "event dispatch failed; continuing polling loop"
                ),
            }
        }
    }
}
