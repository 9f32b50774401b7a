//! Telegram Integration - long-polling bot interface
//!
//! This crate connects the sklad dialog machine to Telegram:
//! - **Bot API** (`api`) - `getUpdates`, `sendMessage`, `sendPhoto`, `getFile` over HTTPS
//! - **Transport** (`transport`) - polling loop with reconnection backoff
//! - **Events** (`events`) - inbound text/photo messages normalised for the dialog layer
//! - **Keyboards** (`keyboard`) - reply keyboards rendered from suggested labels
//! - **Conversation** (`conversation`) - executes dialog actions against the item store
//! - **Dispatcher** (`dispatcher`) - per-user session bookkeeping around each event
//! - **Media** (`media`) - durable storage for item photos
//!
//! # Getting Started
//!
//! 1. Create a bot with @BotFather and copy its token
//! 2. Set `SKLAD_TELEGRAM_BOT_TOKEN` (or the legacy `TELEGRAM_HTTP_API_TOKEN`)
//! 3. Start `sklad-server` and send `/start` to the bot
//!
//! # Architecture
//!
//! ```text
//! Telegram updates → PollingRunner → Dispatcher → ConversationEngine → ItemRepository
//!                                        ↓                 ↓
//!                         send_reply ← Reply          MediaStore
//! ```
//!
//! # Key Types
//!
//! - `PollingRunner` - update loop with reconnection logic
//! - `Dispatcher` - loads, advances and stores one user's session per event
//! - `ConversationEngine` - runs the side effects a transition asks for
//! - `ChatTransport` - seam between the runner and the Bot API

pub mod api;
pub mod conversation;
pub mod dispatcher;
pub mod events;
pub mod keyboard;
pub mod media;
pub mod transport;

pub use api::{ApiError, TelegramClient};
pub use conversation::ConversationEngine;
pub use dispatcher::{DispatchError, Dispatcher};
pub use events::{ChatEnvelope, ChatEvent, ChatId, EventContext, HandlerResult, IncomingMessage};
pub use media::{FsMediaStore, InMemoryMediaStore, MediaError, MediaStore};
pub use transport::{
    ChatTransport, NoopTransport, PollingRunner, ReconnectPolicy, TelegramTransport,
    TransportError,
};
