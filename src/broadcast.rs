//! Fan-out of score messages to every active subscriber.

use std::sync::Arc;
use std::time::Duration;

use cricket_feed::{Match, MatchCache};
use logger::{now_iso, BroadcastEvent, EventLogger};
use serde::Serialize;
use subscriber_store::{Subscriber, SubscriberStore};
use telegram_client::Messenger;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub sent: usize,
    pub edited: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.sent + self.edited
    }
}

pub struct Broadcaster {
    cache: Arc<MatchCache>,
    store: Arc<dyn SubscriberStore>,
    messenger: Arc<dyn Messenger>,
    delay: Duration,
    logger: EventLogger,
}

impl Broadcaster {
    pub fn new(
        cache: Arc<MatchCache>,
        store: Arc<dyn SubscriberStore>,
        messenger: Arc<dyn Messenger>,
        delay: Duration,
        logger: EventLogger,
    ) -> Self {
        Self { cache, store, messenger, delay, logger }
    }

    /// Pushes the compact board to all active subscribers. Chats with a live
    /// message get it edited in place; the rest get a new message.
    pub async fn broadcast(&self) -> BroadcastReport {
        let Some(subscribers) = self.active_subscribers().await else {
            return BroadcastReport::default();
        };

        let matches = self.cache.get_matches().await;
        let text = scoreboard::format_compact(&matches);

        let mut report = BroadcastReport::default();
        for (i, sub) in subscribers.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }
            match sub.live_message_id {
                Some(message_id) => {
                    match self.messenger.edit_message_text(sub.chat_id, message_id, &text).await {
                        Ok(()) => report.edited += 1,
                        Err(e) => {
                            warn!("broadcast edit to {} failed: {}", sub.chat_id, e);
                            report.failed += 1;
                        }
                    }
                }
                None => match self.messenger.send_message(sub.chat_id, &text).await {
                    Ok(_) => report.sent += 1,
                    Err(e) => {
                        warn!("broadcast send to {} failed: {}", sub.chat_id, e);
                        report.failed += 1;
                    }
                },
            }
        }

        info!(
            "Broadcast done: {} recipients, sent={} edited={} failed={}",
            subscribers.len(),
            report.sent,
            report.edited,
            report.failed
        );
        self.log_event("BROADCAST", subscribers.len(), report);
        report
    }

    /// Sends a detailed card for one match to all active subscribers.
    pub async fn notify_match(&self, m: &Match) -> BroadcastReport {
        let Some(subscribers) = self.active_subscribers().await else {
            return BroadcastReport::default();
        };

        let text = scoreboard::format_single(m);
        let mut report = BroadcastReport::default();
        for (i, sub) in subscribers.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }
            match self.messenger.send_message(sub.chat_id, &text).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    warn!("match notify to {} failed: {}", sub.chat_id, e);
                    report.failed += 1;
                }
            }
        }

        info!("Match {} notified: sent={} failed={}", m.id, report.sent, report.failed);
        self.log_event("MATCH_NOTIFY", subscribers.len(), report);
        report
    }

    async fn active_subscribers(&self) -> Option<Vec<Subscriber>> {
        match self.store.find_active().await {
            Ok(subs) => Some(subs),
            Err(e) => {
                warn!("Cannot load active subscribers: {:#}", e);
                None
            }
        }
    }

    fn log_event(&self, event: &'static str, recipients: usize, report: BroadcastReport) {
        let _ = self.logger.log(&BroadcastEvent {
            ts: now_iso(),
            event,
            recipients,
            sent: report.sent,
            edited: report.edited,
            failed: report.failed,
        });
    }
}
