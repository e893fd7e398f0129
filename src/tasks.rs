//! Background work started from request handlers.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, Instrument};

/// Spawns named tasks and lets the owner wait for all of them.
#[derive(Clone, Default)]
pub struct TaskSpawner {
    tracker: TaskTracker,
}

impl TaskSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!("spawn task {}", name);
        self.tracker
            .spawn(fut.instrument(tracing::info_span!("task", task = name)))
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every task spawned so far has finished. Tasks spawned
    /// while draining are waited for too.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
