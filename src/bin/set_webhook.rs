//! Registers the relay's webhook URL with Telegram.
//!
//!   cargo run --bin set-webhook -- https://example.org/api/telegram/webhook

use anyhow::{bail, Context, Result};
use cricket_live::Config;
use dotenv::dotenv;
use telegram_client::{Messenger, TelegramClient};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    if !config.telegram_enabled() {
        bail!("TELEGRAM_BOT_TOKEN is not set");
    }
    let url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WEBHOOK_URL").ok())
        .context("usage: set-webhook <https url> (or WEBHOOK_URL)")?;

    let client = TelegramClient::new(&config.telegram_bot_token, config.http_timeout)?;
    let me = client.get_me().await?;
    info!("Bot @{} ({})", me.username.as_deref().unwrap_or("?"), me.first_name);

    client.set_webhook(&url).await?;
    info!("Webhook set to {}", url);
    Ok(())
}
