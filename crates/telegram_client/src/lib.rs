//! Cricket Live — Telegram Bot API client
//!
//! Outbound calls (`sendMessage`, `editMessageText`, `getMe`, `setWebhook`)
//! plus the inbound webhook update types.

pub mod client;
pub mod types;

pub use client::{DisabledMessenger, Messenger, TelegramClient, TELEGRAM_API_BASE};
pub use types::{BotInfo, Chat, Message, Update, User};
