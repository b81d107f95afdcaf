//! Turns "news item persisted" signals into push dispatches.

use std::sync::Arc;

use newscast_core::{NewsItem, PushTargetSource};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dispatcher::PushDispatcher;
use crate::error::{PushError, PushResult};
use crate::message::NewsNotification;

/// Completion handle for a background dispatch.
#[derive(Debug)]
pub struct DispatchHandle {
    targets: usize,
    task: Option<JoinHandle<usize>>,
}

impl DispatchHandle {
    fn idle() -> Self {
        Self {
            targets: 0,
            task: None,
        }
    }

    /// Number of targets the dispatch was started for.
    pub fn targets(&self) -> usize {
        self.targets
    }

    /// Wait for the dispatch and return how many devices accepted it.
    pub async fn delivered(self) -> usize {
        match self.task {
            Some(task) => match task.await {
                Ok(delivered) => delivered,
                Err(e) => {
                    error!(error = %e, "Push dispatch task failed");
                    0
                }
            },
            None => 0,
        }
    }
}

pub struct NotificationOrchestrator {
    targets: Arc<dyn PushTargetSource>,
    dispatcher: Arc<PushDispatcher>,
    active_window: chrono::Duration,
}

impl NotificationOrchestrator {
    pub fn new(
        targets: Arc<dyn PushTargetSource>,
        dispatcher: Arc<PushDispatcher>,
        active_window: chrono::Duration,
    ) -> Self {
        Self {
            targets,
            dispatcher,
            active_window,
        }
    }

    /// Notify every active device about a newly persisted news item.
    ///
    /// Looks up the active targets, then dispatches on a background task and
    /// returns without waiting for it. Never fails: lookup errors and an empty
    /// target list both yield a handle that reports 0 delivered.
    pub async fn news_persisted(&self, item: &NewsItem) -> DispatchHandle {
        let targets = match self.targets.fetch_active_push_targets(self.active_window).await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(news_id = item.id, error = %e, "Could not load push targets");
                return DispatchHandle::idle();
            }
        };

        if targets.is_empty() {
            debug!(news_id = item.id, "No active push targets");
            return DispatchHandle::idle();
        }

        let count = targets.len();
        let payload = NewsNotification::from(item);
        let dispatcher = self.dispatcher.clone();
        info!(news_id = item.id, targets = count, "Dispatching news notification");

        let task = tokio::spawn(async move {
            dispatcher.send_many(&targets, &payload).await.success_count
        });

        DispatchHandle {
            targets: count,
            task: Some(task),
        }
    }

    /// Notify a single device. Fails without contacting the gateway when the
    /// device is unknown or has no token.
    pub async fn send_to_device(&self, item: &NewsItem, device_id: &str) -> PushResult<String> {
        let target = self
            .targets
            .find_push_target(device_id)
            .await?
            .ok_or_else(|| PushError::TargetNotFound(device_id.to_string()))?;

        if !target.has_token() {
            return Err(PushError::MissingToken(device_id.to_string()));
        }

        self.dispatcher
            .send_one(&target, &NewsNotification::from(item))
            .await
    }
}
