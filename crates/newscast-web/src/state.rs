//! Application state.

use std::sync::Arc;

use newscast_core::{IdentityValidator, NewsSource, PushTargetSource};
use newscast_push::NotificationOrchestrator;
use newscast_stream::{NewsFeed, StreamBroadcaster};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<NewsFeed>,
    pub broadcaster: Arc<StreamBroadcaster>,
    pub orchestrator: Arc<NotificationOrchestrator>,
    pub news: Arc<dyn NewsSource>,
    pub devices: Arc<dyn PushTargetSource>,
    pub validator: Arc<dyn IdentityValidator>,
    /// Frames buffered per streaming client.
    pub client_buffer: usize,
}
