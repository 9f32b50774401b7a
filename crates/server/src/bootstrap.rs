use std::sync::Arc;

use sklad_core::config::{AppConfig, ConfigError, LoadOptions};
use sklad_core::dialog::InMemorySessionStore;
use sklad_db::{connect_with_settings, migrations, DbPool, SqlItemRepository};
use sklad_telegram::{
    ApiError, ConversationEngine, Dispatcher, FsMediaStore, PollingRunner, ReconnectPolicy,
    TelegramClient, TelegramTransport,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub sessions: Arc<InMemorySessionStore>,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("telegram client setup failed: {0}")]
    Telegram(#[source] ApiError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let client = TelegramClient::new(
        config.telegram.api_base_url.clone(),
        config.telegram.bot_token.clone(),
        config.telegram.poll_timeout_secs,
    )
    .map_err(BootstrapError::Telegram)?;
    let media = Arc::new(FsMediaStore::new(config.media.root.clone()));
    let bot_username = config.telegram.bot_username.clone();
    let transport = Arc::new(TelegramTransport::new(client, media.clone(), bot_username));

    let sessions = Arc::new(InMemorySessionStore::default());
    let items = Arc::new(SqlItemRepository::new(db_pool.clone()));
    let engine = ConversationEngine::new(items, media, transport.clone());
    let dispatcher = Dispatcher::new(sessions.clone(), engine, transport.clone());
    let runner = PollingRunner::new(transport, dispatcher, ReconnectPolicy::default());

    info!(
        event_name = "system.bootstrap.telegram_ready",
        correlation_id = "bootstrap",
        bot_username = config.telegram.bot_username.as_deref().unwrap_or("unknown"),
        media_root = %config.media.root.display(),
        "telegram transport initialised"
    );

    Ok(Application { config, db_pool, sessions, runner })
}
