/// Cricket Live — Logger
/// JSONL audit stream (one file per UTC day)

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct EventLogger {
    log_dir: Option<PathBuf>,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Cannot create event log dir {}: {}", dir.display(), e);
        }
        Self { log_dir: Some(dir) }
    }

    /// Logger that drops every event. Used by tests and when `LOG_DIR` is empty.
    pub fn disabled() -> Self {
        Self { log_dir: None }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let Some(dir) = &self.log_dir else {
            return Ok(());
        };
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ──────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct CacheRefreshEvent {
    pub ts:            String,
    pub event:         &'static str,   // "CACHE_REFRESH"
    pub ok:            bool,
    pub matches:       usize,
    pub consecutive_failures: u32,
    pub message:       String,
}

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:           String,
    pub event:        &'static str,    // "API_STATUS"
    pub source:       String,
    pub endpoint:     String,
    pub ok:           bool,
    pub status_code:  Option<u16>,
    pub message:      String,
    pub items:        usize,
}

#[derive(Serialize, Debug)]
pub struct BroadcastEvent {
    pub ts:          String,
    pub event:       &'static str,     // "BROADCAST" | "MATCH_NOTIFY"
    pub recipients:  usize,
    pub sent:        usize,
    pub edited:      usize,
    pub failed:      usize,
}
