//! Single-entry TTL cache in front of the score provider.
//!
//! The whole check-and-refresh sequence runs under one async mutex, so callers
//! that arrive while a refresh is in flight wait for it and then read the new
//! snapshot instead of issuing their own provider call.

use logger::{now_iso, CacheRefreshEvent, EventLogger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::model::Match;
use crate::provider::ScoreProvider;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
/// First retry delay after a failed refresh; doubles per consecutive failure.
pub const BACKOFF_BASE: Duration = Duration::from_secs(2);
pub const BACKOFF_MAX: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct CacheEntry {
    data: Vec<Match>,
    last_fetch: Option<Instant>,
    consecutive_failures: u32,
    retry_at: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.last_fetch
            .is_some_and(|at| now.saturating_duration_since(at) < ttl)
    }

    fn in_backoff(&self, now: Instant) -> bool {
        self.retry_at.is_some_and(|at| now < at)
    }
}

pub struct MatchCache {
    provider: Arc<dyn ScoreProvider>,
    ttl: Duration,
    fetch_timeout: Duration,
    entry: Mutex<CacheEntry>,
    logger: EventLogger,
}

impl MatchCache {
    pub fn new(provider: Arc<dyn ScoreProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            entry: Mutex::new(CacheEntry::default()),
            logger: EventLogger::disabled(),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_event_log(mut self, logger: EventLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, refreshed from the provider when stale.
    /// Never fails: a failed refresh leaves the previous snapshot in place.
    pub async fn get_matches(&self) -> Vec<Match> {
        let mut entry = self.entry.lock().await;
        let now = Instant::now();

        if entry.is_fresh(now, self.ttl) {
            return entry.data.clone();
        }
        if entry.in_backoff(now) {
            debug!("Provider in backoff, serving {} cached matches", entry.data.len());
            return entry.data.clone();
        }

        let outcome = match timeout(self.fetch_timeout, self.provider.current_matches()).await {
            Ok(Ok(matches)) => Ok(matches),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.fetch_timeout)),
        };

        match outcome {
            Ok(matches) => {
                info!("Match cache refreshed: {} matches", matches.len());
                entry.data = matches;
                entry.last_fetch = Some(Instant::now());
                entry.consecutive_failures = 0;
                entry.retry_at = None;
                self.log_refresh(true, entry.data.len(), 0, "ok");
            }
            Err(reason) => {
                entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
                let delay = backoff_delay(entry.consecutive_failures);
                entry.retry_at = Some(Instant::now() + delay);
                warn!(
                    failures = entry.consecutive_failures,
                    retry_in = ?delay,
                    "Match refresh failed, serving {} cached matches: {}",
                    entry.data.len(),
                    reason
                );
                self.log_refresh(false, entry.data.len(), entry.consecutive_failures, &reason);
            }
        }

        entry.data.clone()
    }

    /// Looks a match up in the current snapshot.
    pub async fn find_match(&self, id: &str) -> Option<Match> {
        self.get_matches().await.into_iter().find(|m| m.id == id)
    }

    /// Forces the next read to go to the provider.
    pub async fn invalidate(&self) {
        let mut entry = self.entry.lock().await;
        entry.last_fetch = None;
        entry.retry_at = None;
    }

    fn log_refresh(&self, ok: bool, matches: usize, failures: u32, message: &str) {
        let _ = self.logger.log(&CacheRefreshEvent {
            ts: now_iso(),
            event: "CACHE_REFRESH",
            ok,
            matches,
            consecutive_failures: failures,
            message: message.to_string(),
        });
    }
}

fn backoff_delay(consecutive_failures: u32) -> Duration {
    let exp = consecutive_failures.saturating_sub(1).min(16);
    BACKOFF_BASE.saturating_mul(1u32 << exp).min(BACKOFF_MAX)
}
