mod bootstrap;

use anyhow::Result;
use sklad_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use sklad_core::config::LogFormat::*;

    // RUST_LOG, when set, overrides the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_ascii_lowercase()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        database_url = %app.config.database.url,
        "sklad-server started"
    );

    tokio::select! {
        result = app.runner.start() => {
            match result {
                Ok(()) => tracing::warn!(
                    event_name = "system.server.runner_stopped",
                    correlation_id = "runtime",
                    "telegram update stream closed; waiting for shutdown signal"
                ),
                Err(error) => tracing::error!(
                    event_name = "system.server.runner_failed",
                    correlation_id = "runtime",
                    error = %error,
                    "telegram polling failed; waiting for shutdown signal"
                ),
            }
            wait_for_shutdown().await?;
        }
        signal = wait_for_shutdown() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        active_sessions = app.sessions.active_sessions(),
        "sklad-server stopping"
    );
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
