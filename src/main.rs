//! Cricket Live — relay server
//!
//! Serves the REST API and the Telegram webhook on `RELAY_BIND`.
//!
//! Run:
//!   cargo run --bin relay-server

use anyhow::{Context, Result};
use cricket_feed::{CricApiClient, ScoreProvider};
use cricket_live::{cors_layer, router, AppState, Config};
use dotenv::dotenv;
use logger::EventLogger;
use std::net::SocketAddr;
use std::sync::Arc;
use subscriber_store::{SqliteSubscriberStore, SubscriberStore};
use telegram_client::{DisabledMessenger, Messenger, TelegramClient};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = Config::from_env();
    info!("=== Cricket Live relay ===");
    info!("Cache TTL: {:?}, HTTP timeout: {:?}", config.cache_ttl, config.http_timeout);

    let events = if config.log_dir.is_empty() {
        EventLogger::disabled()
    } else {
        info!("Event log: ./{}/", config.log_dir);
        EventLogger::new(&config.log_dir)
    };

    if config.cricket_api_key.is_empty() {
        warn!("CRICKET_API_KEY not set, provider calls will be rejected");
    }
    let provider: Arc<dyn ScoreProvider> = Arc::new(
        CricApiClient::new(&config.cricket_api_base, &config.cricket_api_key, config.http_timeout)?
            .with_event_log(events.clone()),
    );

    let store: Arc<dyn SubscriberStore> = match config.db_path() {
        Some(path) => Arc::new(SqliteSubscriberStore::open(&path)?),
        None => {
            warn!("STORE_DIR=:memory:, subscribers are lost on restart");
            Arc::new(SqliteSubscriberStore::open_in_memory()?)
        }
    };

    let messenger: Arc<dyn Messenger> = if config.telegram_enabled() {
        Arc::new(TelegramClient::new(&config.telegram_bot_token, config.http_timeout)?)
    } else {
        warn!("TELEGRAM_BOT_TOKEN not set, messaging disabled");
        Arc::new(DisabledMessenger)
    };

    let state = AppState::new(&config, provider, store, messenger, events);
    let app = router(state.clone(), cors_layer(&config));

    let addr: SocketAddr = config.bind.parse().context("Invalid RELAY_BIND")?;
    let listener = TcpListener::bind(addr).await.context("bind failed")?;
    info!("relay listening on http://{}/api/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down: cancelling {} live loops", state.live.running_count());
    state.live.cancel_all();
    state.tasks.drain().await;
    info!("All background tasks finished");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("ctrl_c handler failed: {}", e);
        std::future::pending::<()>().await;
    }
}
