use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use cricket_feed::{InningsScore, Match, ScoreProvider, Series};
use cricket_live::{AppState, Config};
use logger::EventLogger;
use subscriber_store::{ChatProfile, SqliteSubscriberStore, Subscriber, SubscriberStore, UpsertOutcome};
use telegram_client::{BotInfo, Messenger};
use tokio::time::Instant;

// MOCK PROVIDER

#[derive(Default)]
#[allow(dead_code)]
pub struct MockProvider {
    pub current: RwLock<Vec<Match>>,
    pub extra: RwLock<HashMap<String, Match>>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn with_matches(matches: Vec<Match>) -> Arc<Self> {
        let provider = Self::default();
        *provider.current.write().unwrap() = matches;
        Arc::new(provider)
    }

    pub fn add_lookup_only(&self, m: Match) {
        self.extra.write().unwrap().insert(m.id.clone(), m);
    }
}

#[async_trait]
impl ScoreProvider for MockProvider {
    async fn current_matches(&self) -> Result<Vec<Match>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.read().unwrap().clone())
    }

    async fn all_matches(&self) -> Result<Vec<Match>> {
        anyhow::bail!("all_matches unavailable")
    }

    async fn match_info(&self, id: &str) -> Result<Option<Match>> {
        Ok(self.extra.read().unwrap().get(id).cloned())
    }

    async fn series(&self) -> Result<Vec<Series>> {
        Ok(vec![Series {
            id: "s1".into(),
            name: "Border-Gavaskar Trophy".into(),
            ..Default::default()
        }])
    }
}

// MOCK MESSENGER

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Outbound {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    pub at: Instant,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<Outbound>>,
    pub edits: Mutex<Vec<Outbound>>,
    pub failing_chats: Mutex<HashSet<i64>>,
    pub failing_edits: Mutex<HashSet<i64>>,
    next_id: AtomicI64,
}

#[allow(dead_code)]
impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        })
    }

    pub fn fail_for(&self, chat_id: i64) {
        self.failing_chats.lock().unwrap().insert(chat_id);
    }

    /// Sends still work for the chat, edits fail.
    pub fn fail_edits_for(&self, chat_id: i64) {
        self.failing_edits.lock().unwrap().insert(chat_id);
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<Outbound> {
        self.edits.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|o| o.chat_id == chat_id)
            .map(|o| o.text)
            .collect()
    }

    fn fails(&self, chat_id: i64) -> bool {
        self.failing_chats.lock().unwrap().contains(&chat_id)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        if self.fails(chat_id) {
            anyhow::bail!("Forbidden: bot was blocked by the user");
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(Outbound {
            chat_id,
            message_id,
            text: text.to_string(),
            at: Instant::now(),
        });
        Ok(message_id)
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        if self.fails(chat_id) || self.failing_edits.lock().unwrap().contains(&chat_id) {
            anyhow::bail!("Bad Request: message to edit not found");
        }
        self.edits.lock().unwrap().push(Outbound {
            chat_id,
            message_id,
            text: text.to_string(),
            at: Instant::now(),
        });
        Ok(())
    }

    async fn get_me(&self) -> Result<BotInfo> {
        Ok(BotInfo {
            id: 42,
            first_name: "KSP Cricket".into(),
            username: Some("ksp_cricket_bot".into()),
        })
    }
}

// COUNTING STORE

/// SQLite store that also records every live-message write.
#[allow(dead_code)]
pub struct CountingStore {
    pub inner: SqliteSubscriberStore,
    pub live_writes: Mutex<Vec<(i64, i64)>>,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteSubscriberStore::open_in_memory().expect("in-memory store"),
            live_writes: Mutex::new(Vec::new()),
        })
    }

    pub fn live_writes(&self) -> Vec<(i64, i64)> {
        self.live_writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriberStore for CountingStore {
    async fn find_one(&self, chat_id: i64) -> Result<Option<Subscriber>> {
        self.inner.find_one(chat_id).await
    }

    async fn find_active(&self) -> Result<Vec<Subscriber>> {
        self.inner.find_active().await
    }

    async fn count_active(&self) -> Result<u64> {
        self.inner.count_active().await
    }

    async fn upsert_active(&self, profile: &ChatProfile) -> Result<UpsertOutcome> {
        self.inner.upsert_active(profile).await
    }

    async fn deactivate(&self, chat_id: i64) -> Result<bool> {
        self.inner.deactivate(chat_id).await
    }

    async fn set_live_message(&self, profile: &ChatProfile, message_id: i64) -> Result<()> {
        self.live_writes.lock().unwrap().push((profile.chat_id, message_id));
        self.inner.set_live_message(profile, message_id).await
    }
}

// HARNESS

#[allow(dead_code)]
pub struct Harness {
    pub state: AppState,
    pub provider: Arc<MockProvider>,
    pub messenger: Arc<RecordingMessenger>,
    pub store: Arc<CountingStore>,
}

#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        telegram_bot_token: "test-token".into(),
        store_dir: ":memory:".into(),
        log_dir: String::new(),
        ..Config::default()
    }
}

#[allow(dead_code)]
pub fn harness(matches: Vec<Match>) -> Harness {
    harness_with(test_config(), matches)
}

#[allow(dead_code)]
pub fn harness_with(config: Config, matches: Vec<Match>) -> Harness {
    let provider = MockProvider::with_matches(matches);
    let messenger = RecordingMessenger::new();
    let store = CountingStore::new();
    let state = AppState::new(
        &config,
        provider.clone(),
        store.clone(),
        messenger.clone(),
        EventLogger::disabled(),
    );
    Harness { state, provider, messenger, store }
}

#[allow(dead_code)]
pub fn profile(chat_id: i64, first_name: &str) -> ChatProfile {
    ChatProfile {
        chat_id,
        username: None,
        first_name: Some(first_name.to_string()),
    }
}

#[allow(dead_code)]
pub fn live_match(id: &str, home: &str, away: &str) -> Match {
    Match {
        id: id.to_string(),
        name: format!("{home} vs {away}, 2nd T20I"),
        match_type: "t20".into(),
        status: "1st Innings".into(),
        venue: "Eden Gardens, Kolkata".into(),
        teams: vec![home.to_string(), away.to_string()],
        score: vec![InningsScore {
            runs: 112,
            wickets: 3,
            overs: 13.2,
            inning: format!("{home} Inning 1"),
        }],
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn finished_match(id: &str, home: &str, away: &str) -> Match {
    Match {
        status: format!("{home} won by 7 wickets"),
        ..live_match(id, home, away)
    }
}

/// Telegram webhook body for a private-chat text message.
#[allow(dead_code)]
pub fn webhook_body(chat_id: i64, text: &str) -> String {
    serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "date": 1760000000,
            "chat": {"id": chat_id, "type": "private", "first_name": "Asha", "username": "asha"},
            "from": {"id": chat_id, "is_bot": false, "first_name": "Asha"},
            "text": text
        }
    })
    .to_string()
}
