use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::BotInfo;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a new HTML message, returns its message id.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64>;
    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()>;
    async fn get_me(&self) -> Result<BotInfo>;
}

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build Telegram http client")?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Points Telegram's webhook delivery at `url`.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let body = serde_json::json!({
            "url": url,
            "allowed_updates": ["message"],
            "drop_pending_updates": true,
        });
        let _: bool = self.call("setWebhook", &body).await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &serde_json::Value) -> Result<T> {
        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        let parsed: TgResponse<T> = serde_json::from_str(&raw)
            .with_context(|| format!("Telegram {method} HTTP {status}: unparseable body"))?;

        if !parsed.ok {
            let description = parsed.description.unwrap_or_default();
            warn!("Telegram {} failed: {} {}", method, parsed.error_code.unwrap_or(0), description);
            anyhow::bail!("Telegram {method} failed: {description}");
        }
        parsed
            .result
            .with_context(|| format!("Telegram {method} returned ok without result"))
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let sent: SentMessage = self.call("sendMessage", &body).await?;
        debug!("sendMessage chat={} message_id={}", chat_id, sent.message_id);
        Ok(sent.message_id)
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        // result is the edited Message, or `true` for inline messages
        match self.call::<serde_json::Value>("editMessageText", &body).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn get_me(&self) -> Result<BotInfo> {
        self.call("getMe", &serde_json::json!({})).await
    }
}

/// Stand-in used when no bot token is configured; every call fails.
pub struct DisabledMessenger;

#[async_trait]
impl Messenger for DisabledMessenger {
    async fn send_message(&self, _chat_id: i64, _text: &str) -> Result<i64> {
        anyhow::bail!("Telegram bot not configured")
    }

    async fn edit_message_text(&self, _chat_id: i64, _message_id: i64, _text: &str) -> Result<()> {
        anyhow::bail!("Telegram bot not configured")
    }

    async fn get_me(&self) -> Result<BotInfo> {
        anyhow::bail!("Bot not configured")
    }
}
