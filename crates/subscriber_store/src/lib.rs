//! Cricket Live — subscriber store
//!
//! One row per Telegram chat. Unsubscribing flips `is_active` instead of
//! deleting, so a returning chat keeps its id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscriber {
    pub id: String,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    pub is_active: bool,
    /// Last auto-updating scoreboard message sent to this chat
    pub live_message_id: Option<i64>,
}

/// Identity of a chat as seen on an inbound message or API call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatProfile {
    pub chat_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl ChatProfile {
    pub fn new(chat_id: i64) -> Self {
        Self { chat_id, ..Default::default() }
    }
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub subscriber: Subscriber,
    /// false when an existing record was updated
    pub created: bool,
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_one(&self, chat_id: i64) -> Result<Option<Subscriber>>;
    async fn find_active(&self) -> Result<Vec<Subscriber>>;
    async fn count_active(&self) -> Result<u64>;
    /// Inserts an active record or reactivates the existing one for the chat.
    async fn upsert_active(&self, profile: &ChatProfile) -> Result<UpsertOutcome>;
    /// Returns true only when an active record was switched off.
    async fn deactivate(&self, chat_id: i64) -> Result<bool>;
    /// Records the auto-updating message id, creating an inactive record if needed.
    async fn set_live_message(&self, profile: &ChatProfile, message_id: i64) -> Result<()>;
}

// ====================================================================
// SQLite
// ====================================================================

const SELECT_COLUMNS: &str =
    "SELECT id, chat_id, username, first_name, subscribed_at, is_active, live_message_id FROM subscribers";

#[derive(Clone)]
pub struct SqliteSubscriberStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSubscriberStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        init_schema(&conn)?;
        info!("Subscriber store opened at {}", path.display());
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite")?;
        init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("subscriber db lock poisoned: {e}"))?;
            f(&mut guard)
        })
        .await
        .context("subscriber db task panicked")?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS subscribers (
            id TEXT PRIMARY KEY,
            chat_id INTEGER NOT NULL UNIQUE,
            username TEXT,
            first_name TEXT,
            subscribed_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            live_message_id INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_subscribers_active ON subscribers(is_active);
        "#,
    )
    .context("init schema")?;
    Ok(())
}

fn row_to_subscriber(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
    let id: String = row.get(0)?;
    let subscribed_at: String = row.get(4)?;
    let subscribed_at = DateTime::parse_from_rfc3339(&subscribed_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt subscribed_at '{}' on subscriber '{}': {}", subscribed_at, id, e);
            DateTime::default()
        });
    Ok(Subscriber {
        id,
        chat_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        subscribed_at,
        is_active: row.get::<_, i64>(5)? != 0,
        live_message_id: row.get(6)?,
    })
}

fn query_one(conn: &Connection, chat_id: i64) -> Result<Option<Subscriber>> {
    let sql = format!("{SELECT_COLUMNS} WHERE chat_id = ?1");
    let found = conn
        .query_row(&sql, [chat_id], row_to_subscriber)
        .optional()?;
    Ok(found)
}

#[async_trait]
impl SubscriberStore for SqliteSubscriberStore {
    async fn find_one(&self, chat_id: i64) -> Result<Option<Subscriber>> {
        self.call(move |conn| query_one(conn, chat_id)).await
    }

    async fn find_active(&self) -> Result<Vec<Subscriber>> {
        self.call(|conn| {
            let sql = format!("{SELECT_COLUMNS} WHERE is_active = 1 ORDER BY rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], row_to_subscriber)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn count_active(&self) -> Result<u64> {
        self.call(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM subscribers WHERE is_active = 1", [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        })
        .await
    }

    async fn upsert_active(&self, profile: &ChatProfile) -> Result<UpsertOutcome> {
        let profile = profile.clone();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let existed = query_one(&tx, profile.chat_id)?.is_some();
            tx.execute(
                r#"
                INSERT INTO subscribers(id, chat_id, username, first_name, subscribed_at, is_active)
                VALUES (?1, ?2, ?3, ?4, ?5, 1)
                ON CONFLICT(chat_id) DO UPDATE SET
                    username=COALESCE(excluded.username, subscribers.username),
                    first_name=COALESCE(excluded.first_name, subscribers.first_name),
                    subscribed_at=CASE WHEN subscribers.is_active = 1
                        THEN subscribers.subscribed_at ELSE excluded.subscribed_at END,
                    is_active=1
                "#,
                params![
                    uuid::Uuid::new_v4().to_string(),
                    profile.chat_id,
                    profile.username,
                    profile.first_name,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            let subscriber = query_one(&tx, profile.chat_id)?
                .context("subscriber missing right after upsert")?;
            tx.commit()?;
            Ok(UpsertOutcome { subscriber, created: !existed })
        })
        .await
    }

    async fn deactivate(&self, chat_id: i64) -> Result<bool> {
        self.call(move |conn| {
            let changed = conn.execute(
                "UPDATE subscribers SET is_active = 0 WHERE chat_id = ?1 AND is_active = 1",
                [chat_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn set_live_message(&self, profile: &ChatProfile, message_id: i64) -> Result<()> {
        let profile = profile.clone();
        self.call(move |conn| {
            conn.execute(
                r#"
                INSERT INTO subscribers(id, chat_id, username, first_name, subscribed_at, is_active, live_message_id)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                ON CONFLICT(chat_id) DO UPDATE SET
                    username=COALESCE(excluded.username, subscribers.username),
                    first_name=COALESCE(excluded.first_name, subscribers.first_name),
                    live_message_id=excluded.live_message_id
                "#,
                params![
                    uuid::Uuid::new_v4().to_string(),
                    profile.chat_id,
                    profile.username,
                    profile.first_name,
                    Utc::now().to_rfc3339(),
                    message_id,
                ],
            )?;
            Ok(())
        })
        .await
    }
}
