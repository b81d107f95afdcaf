//! Polling change detector.
//!
//! Polls the news source on a fixed interval and publishes a new numbered
//! event whenever the list differs by value from the cached one. The cached
//! event and its counter live in `NewsFeed`; only the detector writes them.

use std::sync::Arc;
use std::time::Duration;

use newscast_core::NewsSource;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broadcaster::{first_tick, StreamBroadcaster};
use crate::error::{StreamError, StreamResult};
use crate::frame::Event;

/// The latest published news event, readable from any task.
///
/// Its id doubles as the process-wide event counter: 0 for the startup
/// baseline, then +1 for every detected change.
pub struct NewsFeed {
    current: RwLock<Arc<Event>>,
}

impl NewsFeed {
    fn new(baseline: Event) -> Self {
        Self {
            current: RwLock::new(Arc::new(baseline)),
        }
    }

    pub fn current(&self) -> Arc<Event> {
        self.current.read().clone()
    }

    pub fn current_id(&self) -> u64 {
        self.current.read().id()
    }

    fn publish(&self, event: Arc<Event>) {
        *self.current.write() = event;
    }
}

pub struct ChangeDetector {
    source: Arc<dyn NewsSource>,
    feed: Arc<NewsFeed>,
}

impl ChangeDetector {
    /// Fetch the baseline snapshot once. Nothing is broadcast for it; new
    /// subscribers receive it as their initial frame.
    pub async fn bootstrap(source: Arc<dyn NewsSource>) -> StreamResult<Self> {
        let snapshot = source.fetch_all_news().await?;
        info!(items = snapshot.len(), "News baseline established");
        let baseline = Event::new(0, snapshot)?;
        Ok(Self {
            source,
            feed: Arc::new(NewsFeed::new(baseline)),
        })
    }

    pub fn feed(&self) -> Arc<NewsFeed> {
        self.feed.clone()
    }

    /// Poll once. Returns the new event if the news list changed.
    ///
    /// Fetch failures are logged and leave the cached snapshot untouched.
    pub async fn tick(&mut self) -> Option<Arc<Event>> {
        let snapshot = match self.source.fetch_all_news().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "News fetch failed, keeping previous snapshot");
                return None;
            }
        };

        let current = self.feed.current();
        if *current.snapshot() == snapshot {
            debug!(event_id = current.id(), "News list unchanged");
            return None;
        }

        let next_id = current.id() + 1;
        let event = match Event::new(next_id, snapshot) {
            Ok(event) => Arc::new(event),
            Err(e) => {
                error!(error = %e, event_id = next_id, "Failed to encode news event");
                return None;
            }
        };
        self.feed.publish(event.clone());
        info!(event_id = next_id, items = event.snapshot().len(), "News list changed");
        Some(event)
    }

    /// Run the poll loop until `cancel` fires, broadcasting each change
    /// before the next poll starts.
    pub fn spawn(
        mut self,
        broadcaster: Arc<StreamBroadcaster>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> StreamResult<JoinHandle<()>> {
        let start = first_tick("poll interval", interval)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| StreamError::NoRuntime("change detector"))?;

        Ok(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "Change detector started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(event) = self.tick().await {
                            let report = broadcaster.broadcast(&event).await;
                            debug!(?report, "Change broadcast complete");
                        }
                    }
                }
            }

            info!("Change detector stopped");
        }))
    }
}
