//! Auto-updating scoreboard messages.
//!
//! `/live` sends one board and then edits that same message a fixed number of
//! times. At most one loop runs per chat: starting a new one cancels the old.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cricket_feed::MatchCache;
use telegram_client::Messenger;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tasks::TaskSpawner;

struct RunningLoop {
    generation: u64,
    token: CancellationToken,
}

pub struct LiveUpdates {
    cache: Arc<MatchCache>,
    messenger: Arc<dyn Messenger>,
    spawner: TaskSpawner,
    iterations: u32,
    interval: Duration,
    shutdown: CancellationToken,
    running: Mutex<HashMap<i64, RunningLoop>>,
    next_generation: AtomicU64,
}

impl LiveUpdates {
    pub fn new(
        cache: Arc<MatchCache>,
        messenger: Arc<dyn Messenger>,
        spawner: TaskSpawner,
        iterations: u32,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            messenger,
            spawner,
            iterations,
            interval,
            shutdown: CancellationToken::new(),
            running: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Starts the edit loop for `message_id`, replacing any loop already
    /// running for the chat.
    pub fn start(self: &Arc<Self>, chat_id: i64, message_id: i64) -> JoinHandle<()> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let token = self.shutdown.child_token();

        let previous = self.with_running(|running| {
            running.insert(chat_id, RunningLoop { generation, token: token.clone() })
        });
        if let Some(prev) = previous {
            debug!("chat {}: replacing live loop gen={}", chat_id, prev.generation);
            prev.token.cancel();
        }

        info!(
            "chat {}: live updates every {:?} x{} on message {}",
            chat_id, self.interval, self.iterations, message_id
        );
        let this = Arc::clone(self);
        self.spawner.spawn("live_update", async move {
            this.run(chat_id, message_id, token).await;
            this.with_running(|running| {
                if running.get(&chat_id).is_some_and(|r| r.generation == generation) {
                    running.remove(&chat_id);
                }
            });
        })
    }

    /// Stops the chat's loop. Returns false when none was running.
    pub fn cancel(&self, chat_id: i64) -> bool {
        match self.with_running(|running| running.remove(&chat_id)) {
            Some(r) => {
                r.token.cancel();
                info!("chat {}: live updates cancelled", chat_id);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, chat_id: i64) -> bool {
        self.with_running(|running| running.contains_key(&chat_id))
    }

    pub fn running_count(&self) -> usize {
        self.with_running(|running| running.len())
    }

    /// Cancels every loop; used on shutdown.
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }

    async fn run(&self, chat_id: i64, message_id: i64, token: CancellationToken) {
        for round in 1..=self.iterations {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("chat {}: live loop stopped before round {}", chat_id, round);
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            let matches = self.cache.get_matches().await;
            let text = scoreboard::format_compact(&matches);
            if let Err(e) = self.messenger.edit_message_text(chat_id, message_id, &text).await {
                warn!("chat {}: live edit failed on round {}, stopping: {}", chat_id, round, e);
                return;
            }
            debug!("chat {}: live round {}/{}", chat_id, round, self.iterations);
        }
        debug!("chat {}: live loop finished", chat_id);
    }

    fn with_running<T>(&self, f: impl FnOnce(&mut HashMap<i64, RunningLoop>) -> T) -> T {
        let mut guard = self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}
