//! Telegram command handling.
//!
//! Each inbound message is handled on its own; the only state consulted is the
//! chat's subscriber record and the shared match cache.

use std::sync::Arc;

use cricket_feed::MatchCache;
use scoreboard::{escape_html, format_compact, format_single, is_live};
use subscriber_store::{ChatProfile, SubscriberStore};
use telegram_client::{Messenger, Update};
use tracing::{debug, info, warn};

use crate::live_updates::LiveUpdates;

/// Detailed cards sent by `/score` when matches are live
pub const SCORE_CARD_LIMIT: usize = 3;

pub const ALREADY_SUBSCRIBED: &str = "✅ आप पहले से subscribed हैं!";
pub const SUBSCRIBED: &str = "🎉 Subscribed! अब आपको match alerts मिलेंगे!";
pub const UNSUBSCRIBED: &str = "😢 Unsubscribed. आप फिर से /subscribe कर सकते हैं।";
pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Use /start for help.";
pub const STORE_UNAVAILABLE: &str = "⚠️ अभी यह नहीं हो पाया। थोड़ी देर बाद फिर try करें।";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Score,
    Live,
    Matches,
    Subscribe,
    Unsubscribe,
    Unknown,
}

impl Command {
    /// First whitespace token, with a `@botname` suffix dropped.
    pub fn parse(text: &str) -> Self {
        let token = text.split_whitespace().next().unwrap_or("");
        let command = token.split('@').next().unwrap_or("");
        match command {
            "/start" | "/help" => Command::Start,
            "/score" => Command::Score,
            "/live" => Command::Live,
            "/matches" => Command::Matches,
            "/subscribe" => Command::Subscribe,
            "/unsubscribe" => Command::Unsubscribe,
            _ => Command::Unknown,
        }
    }
}

pub fn welcome_text(first_name: Option<&str>) -> String {
    let name = first_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Cricket Fan");
    format!(
        "🏏 <b>Welcome to KSP Cricket!</b>\n\n\
         नमस्ते {}!\n\n\
         मैं आपको Live Cricket Scores भेजूंगा।\n\n\
         <b>Commands:</b>\n\
         /score - Current live scores\n\
         /live - Auto-updating scoreboard\n\
         /matches - All current matches\n\
         /subscribe - Match alerts on\n\
         /unsubscribe - Match alerts off\n\
         /help - This message\n\n\
         Subscribe करें और हर match update पाएं! 🎯",
        escape_html(name)
    )
}

pub struct CommandDispatcher {
    cache: Arc<MatchCache>,
    store: Arc<dyn SubscriberStore>,
    messenger: Arc<dyn Messenger>,
    live: Arc<LiveUpdates>,
}

impl CommandDispatcher {
    pub fn new(
        cache: Arc<MatchCache>,
        store: Arc<dyn SubscriberStore>,
        messenger: Arc<dyn Messenger>,
        live: Arc<LiveUpdates>,
    ) -> Self {
        Self { cache, store, messenger, live }
    }

    /// Entry point for webhook updates. Updates without a text message are ignored.
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            debug!("update {} carries no message, ignored", update.update_id);
            return;
        };
        let Some(text) = message.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            debug!("update {} has no text, ignored", update.update_id);
            return;
        };
        let profile = ChatProfile {
            chat_id: message.chat.id,
            username: message.username(),
            first_name: message.first_name(),
        };
        self.dispatch(&profile, text).await;
    }

    pub async fn dispatch(&self, profile: &ChatProfile, text: &str) {
        let command = Command::parse(text);
        info!("chat {}: {:?}", profile.chat_id, command);

        match command {
            Command::Start => {
                self.reply(profile.chat_id, &welcome_text(profile.first_name.as_deref()))
                    .await;
            }
            Command::Score => self.score(profile.chat_id).await,
            Command::Live => self.live(profile).await,
            Command::Matches => {
                let matches = self.cache.get_matches().await;
                self.reply(profile.chat_id, &format_compact(&matches)).await;
            }
            Command::Subscribe => self.subscribe(profile).await,
            Command::Unsubscribe => self.unsubscribe(profile.chat_id).await,
            Command::Unknown => {
                self.reply(profile.chat_id, UNKNOWN_COMMAND).await;
            }
        }
    }

    async fn score(&self, chat_id: i64) {
        let matches = self.cache.get_matches().await;
        let live: Vec<_> = matches.iter().filter(|m| is_live(m)).collect();
        if live.is_empty() {
            self.reply(chat_id, &format_compact(&matches)).await;
            return;
        }
        for m in live.into_iter().take(SCORE_CARD_LIMIT) {
            self.reply(chat_id, &format_single(m)).await;
        }
    }

    async fn live(&self, profile: &ChatProfile) {
        let matches = self.cache.get_matches().await;
        let Some(message_id) = self.reply(profile.chat_id, &format_compact(&matches)).await else {
            return;
        };
        if let Err(e) = self.store.set_live_message(profile, message_id).await {
            warn!("chat {}: cannot store live message id: {:#}", profile.chat_id, e);
        }
        self.live.start(profile.chat_id, message_id);
    }

    async fn subscribe(&self, profile: &ChatProfile) {
        match self.store.find_one(profile.chat_id).await {
            Ok(Some(existing)) if existing.is_active => {
                self.reply(profile.chat_id, ALREADY_SUBSCRIBED).await;
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("chat {}: subscriber lookup failed: {:#}", profile.chat_id, e);
                self.reply(profile.chat_id, STORE_UNAVAILABLE).await;
                return;
            }
        }

        match self.store.upsert_active(profile).await {
            Ok(outcome) => {
                info!(
                    "chat {}: subscribed (id={}, new={})",
                    profile.chat_id, outcome.subscriber.id, outcome.created
                );
                self.reply(profile.chat_id, SUBSCRIBED).await;
            }
            Err(e) => {
                warn!("chat {}: subscribe failed: {:#}", profile.chat_id, e);
                self.reply(profile.chat_id, STORE_UNAVAILABLE).await;
            }
        }
    }

    async fn unsubscribe(&self, chat_id: i64) {
        match self.store.deactivate(chat_id).await {
            Ok(changed) => debug!("chat {}: deactivate changed={}", chat_id, changed),
            Err(e) => warn!("chat {}: unsubscribe failed: {:#}", chat_id, e),
        }
        self.live.cancel(chat_id);
        self.reply(chat_id, UNSUBSCRIBED).await;
    }

    /// Sends `text`; failures are logged and reported as `None`.
    async fn reply(&self, chat_id: i64, text: &str) -> Option<i64> {
        match self.messenger.send_message(chat_id, text).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("chat {}: send failed: {:#}", chat_id, e);
                None
            }
        }
    }
}
