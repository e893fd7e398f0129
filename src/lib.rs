//! Cricket Live — relay service
//!
//! Polls live cricket scores through a TTL cache and relays them to Telegram
//! chats: bot commands, auto-updating scoreboards, subscriber broadcasts, and
//! a small REST API.

pub mod api;
pub mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod live_updates;
pub mod tasks;

pub use api::{cors_layer, router, ApiError, AppState};
pub use broadcast::{BroadcastReport, Broadcaster};
pub use config::Config;
pub use dispatcher::{Command, CommandDispatcher};
pub use live_updates::LiveUpdates;
pub use tasks::TaskSpawner;
