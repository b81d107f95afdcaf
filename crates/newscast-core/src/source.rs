//! Data source interfaces consumed by the delivery engine.

use async_trait::async_trait;
use chrono::Duration;

use crate::error::NewscastResult;
use crate::model::{NewsItem, NewsSnapshot, Platform, PushTarget};

/// Read/write access to the published news list.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch the complete, ordered news list.
    async fn fetch_all_news(&self) -> NewscastResult<NewsSnapshot>;

    /// Look up a single news item.
    async fn get_news(&self, id: i64) -> NewscastResult<Option<NewsItem>>;

    /// Persist a new news item and return it with its assigned id.
    async fn create_news(&self, title: &str, content: &str) -> NewscastResult<NewsItem>;
}

/// Access to registered push targets.
#[async_trait]
pub trait PushTargetSource: Send + Sync {
    /// Targets whose registration was refreshed within the trailing `window`.
    async fn fetch_active_push_targets(&self, window: Duration) -> NewscastResult<Vec<PushTarget>>;

    /// Look up the push target registered for one device.
    async fn find_push_target(&self, device_id: &str) -> NewscastResult<Option<PushTarget>>;

    /// Register a device, or refresh its token and platform.
    async fn upsert_push_target(
        &self,
        device_id: &str,
        token: &str,
        platform: Platform,
    ) -> NewscastResult<PushTarget>;
}
