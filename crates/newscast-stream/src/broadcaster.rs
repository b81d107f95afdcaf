//! Fan-out of news events to every registered stream client.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use newscast_core::config::{StreamConfig, MAX_INTERVAL_SECS};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::client::{ClientId, ClientState, FrameSink, StreamClient};
use crate::detector::NewsFeed;
use crate::error::{StreamError, StreamResult};
use crate::frame::Event;
use crate::registry::ClientRegistry;

#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub heartbeat_interval: Duration,
    pub write_timeout: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&StreamConfig> for StreamSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            write_timeout: config.write_timeout(),
        }
    }
}

fn check_interval(name: &'static str, period: Duration) -> StreamResult<Duration> {
    if period.is_zero() || period > Duration::from_secs(MAX_INTERVAL_SECS) {
        return Err(StreamError::InvalidInterval(name));
    }
    Ok(period)
}

/// First deadline of a periodic task that ticks every `period`.
pub(crate) fn first_tick(name: &'static str, period: Duration) -> StreamResult<Instant> {
    let period = check_interval(name, period)?;
    Instant::now()
        .checked_add(period)
        .ok_or(StreamError::InvalidInterval(name))
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub event_id: u64,
    pub delivered: usize,
    /// Clients that already had this event or were closing.
    pub skipped: usize,
    /// Clients removed because the write failed.
    pub pruned: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub closed: usize,
    /// The grace period elapsed before every connection closed.
    pub forced: bool,
}

pub struct StreamBroadcaster {
    registry: Arc<ClientRegistry>,
    feed: Arc<NewsFeed>,
    settings: StreamSettings,
    shutdown: CancellationToken,
    heartbeats: TaskTracker,
}

impl StreamBroadcaster {
    pub fn new(feed: Arc<NewsFeed>, settings: StreamSettings) -> StreamResult<Arc<Self>> {
        check_interval("heartbeat interval", settings.heartbeat_interval)?;
        check_interval("write timeout", settings.write_timeout)?;
        Ok(Arc::new(Self {
            registry: Arc::new(ClientRegistry::new()),
            feed,
            settings,
            shutdown: CancellationToken::new(),
            heartbeats: TaskTracker::new(),
        }))
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Register a new connection and send it the current news list.
    ///
    /// The initial frame resends the current event id; it does not advance
    /// the counter. Registration and the initial write happen under the
    /// client's write lock so a concurrent broadcast cannot overtake it.
    pub async fn subscribe(&self, sink: Box<dyn FrameSink>) -> StreamResult<ClientId> {
        if self.is_shutting_down() {
            return Err(StreamError::ShuttingDown);
        }

        let client = Arc::new(StreamClient::new(
            sink,
            self.shutdown.child_token(),
            self.settings.write_timeout,
        ));
        let id = client.id();

        let initial = {
            let mut writer = client.writer().await;
            self.registry.add(client.clone());
            let current = self.feed.current();
            writer
                .write_event(current.id(), current.frame(), self.settings.write_timeout)
                .await
                .map(|_| current.id())
        };

        match initial {
            Ok(event_id) => {
                if self.is_shutting_down() || !client.transition(ClientState::Active) {
                    retire(&self.registry, &client, ClientState::Draining);
                    return Err(StreamError::ShuttingDown);
                }
                if let Err(e) = self.spawn_heartbeat(client.clone()) {
                    retire(&self.registry, &client, ClientState::Dead);
                    return Err(e);
                }
                info!(
                    client_id = %id,
                    event_id,
                    clients = self.registry.len(),
                    "Stream client subscribed"
                );
                Ok(id)
            }
            Err(e) => {
                warn!(client_id = %id, error = %e, "Initial send failed, dropping client");
                retire(&self.registry, &client, ClientState::Dead);
                Err(e)
            }
        }
    }

    /// Write `event` to every client registered right now.
    ///
    /// A failed write removes that client only; the rest still get the frame.
    pub async fn broadcast(&self, event: &Event) -> BroadcastReport {
        let clients = self.registry.snapshot_all();
        let frame = event.frame();

        let results = join_all(clients.iter().map(|client| {
            let frame = frame.clone();
            async move { client.send_event(event.id(), frame).await }
        }))
        .await;

        let mut report = BroadcastReport {
            event_id: event.id(),
            ..BroadcastReport::default()
        };
        for (client, result) in clients.iter().zip(results) {
            match result {
                Ok(true) => report.delivered += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(
                        client_id = %client.id(),
                        event_id = event.id(),
                        error = %e,
                        "Stream write failed, removing client"
                    );
                    if retire(&self.registry, client, ClientState::Dead) {
                        report.pruned += 1;
                    }
                }
            }
        }

        debug!(
            event_id = report.event_id,
            delivered = report.delivered,
            skipped = report.skipped,
            pruned = report.pruned,
            "Broadcast finished"
        );
        report
    }

    /// The peer went away. Returns false if the client was already removed.
    pub fn disconnect(&self, id: &ClientId) -> bool {
        let Some(client) = self.registry.get(id) else {
            return false;
        };
        let removed = retire(&self.registry, &client, ClientState::Closed);
        if removed {
            info!(client_id = %id, clients = self.registry.len(), "Stream client disconnected");
        }
        removed
    }

    /// Close every connection, stop all heartbeats and clear the registry,
    /// giving up on stragglers once `grace` elapses.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        info!(clients = self.registry.len(), "Shutting down stream broadcaster");
        self.shutdown.cancel();
        self.heartbeats.close();

        let clients = self.registry.drain();
        for client in &clients {
            client.transition(ClientState::Draining);
        }

        let closing = async {
            join_all(clients.iter().map(|client| client.close())).await;
            self.heartbeats.wait().await;
        };
        let forced = tokio::time::timeout(grace, closing).await.is_err();

        for client in &clients {
            client.transition(ClientState::Removed);
        }
        if forced {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "Grace period elapsed, abandoning open streams"
            );
        }
        info!(closed = clients.len(), "Stream broadcaster stopped");

        ShutdownReport {
            closed: clients.len(),
            forced,
        }
    }

    fn spawn_heartbeat(&self, client: Arc<StreamClient>) -> StreamResult<()> {
        let registry = self.registry.clone();
        let period = self.settings.heartbeat_interval;
        let start = first_tick("heartbeat interval", period)?;

        self.heartbeats.spawn(async move {
            let token = client.heartbeat_token().clone();
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = client.send_heartbeat().await {
                            warn!(
                                client_id = %client.id(),
                                error = %e,
                                "Heartbeat failed, removing client"
                            );
                            retire(&registry, &client, ClientState::Dead);
                            break;
                        }
                    }
                }
            }
            debug!(client_id = %client.id(), "Heartbeat stopped");
        });
        Ok(())
    }
}

/// Move `client` to `state`, stop its heartbeat and take it out of the
/// registry. Returns true for the one caller that actually removed it.
fn retire(registry: &ClientRegistry, client: &StreamClient, state: ClientState) -> bool {
    client.transition(state);
    client.cancel_heartbeat();
    let removed = registry.remove(&client.id()).is_some();
    if removed {
        client.transition(ClientState::Removed);
    }
    removed
}
