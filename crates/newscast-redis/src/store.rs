//! `NewsSource` and `PushTargetSource` backed by Redis.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newscast_core::{
    NewsItem, NewsSnapshot, NewsSource, NewscastError, NewscastResult, Platform, PushTarget,
    PushTargetSource,
};
use tracing::{debug, warn};

use crate::client::{Keys, RedisError, RedisPool, RedisResult};
use crate::queries::devices::{self, DeviceRow};
use crate::queries::news::{self, NewsRow};

#[derive(Clone)]
pub struct RedisStore {
    pool: RedisPool,
    keys: Keys,
}

impl RedisStore {
    pub fn new(pool: RedisPool, key_prefix: &str) -> Self {
        Self {
            pool,
            keys: Keys::new(key_prefix),
        }
    }
}

fn parse_timestamp(key: &str, raw: &str) -> RedisResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RedisError::CorruptRow {
            key: key.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        })
}

/// Convert a stored news row into the domain model.
pub fn news_from_row(row: NewsRow) -> RedisResult<NewsItem> {
    let created_at = parse_timestamp(&format!("news:{}", row.id), &row.created_at)?;
    Ok(NewsItem {
        id: row.id,
        title: row.title,
        content: row.content,
        created_at,
    })
}

/// Convert listed news rows, skipping any that cannot be read so one bad row
/// does not hide the rest of the list.
pub fn news_items_from_rows(rows: Vec<NewsRow>) -> Vec<NewsItem> {
    rows.into_iter()
        .filter_map(|row| match news_from_row(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable news row");
                None
            }
        })
        .collect()
}

/// Convert a stored device row into the domain model.
pub fn target_from_row(row: DeviceRow) -> RedisResult<PushTarget> {
    let key = format!("device:{}", row.device_id);
    let updated_at = parse_timestamp(&key, &row.updated_at)?;
    let platform = row
        .platform
        .parse::<Platform>()
        .map_err(|e| RedisError::CorruptRow {
            key,
            reason: e.to_string(),
        })?;
    Ok(PushTarget {
        device_id: row.device_id,
        token: row.token,
        platform,
        updated_at,
    })
}

/// Start of the active window as a unix timestamp.
pub fn active_since(now: DateTime<Utc>, window: chrono::Duration) -> NewscastResult<i64> {
    now.checked_sub_signed(window)
        .map(|since| since.timestamp())
        .ok_or_else(|| {
            NewscastError::validation(format!("active window of {} is out of range", window))
        })
}

/// Readable targets that carry a token.
pub fn active_targets_from_rows(rows: Vec<DeviceRow>) -> Vec<PushTarget> {
    let mut targets = Vec::with_capacity(rows.len());
    for row in rows {
        match target_from_row(row) {
            Ok(target) if target.has_token() => targets.push(target),
            Ok(target) => {
                debug!(device_id = %target.device_id, "Skipping device without token")
            }
            Err(e) => warn!(error = %e, "Skipping unreadable device"),
        }
    }
    targets
}

#[async_trait]
impl NewsSource for RedisStore {
    async fn fetch_all_news(&self) -> NewscastResult<NewsSnapshot> {
        let rows = news::list_news(&self.pool, &self.keys).await?;
        let items = news_items_from_rows(rows);
        debug!(count = items.len(), "Fetched news list");
        Ok(NewsSnapshot::new(items))
    }

    async fn get_news(&self, id: i64) -> NewscastResult<Option<NewsItem>> {
        match news::get_news(&self.pool, &self.keys, id).await? {
            Some(row) => Ok(Some(news_from_row(row)?)),
            None => Ok(None),
        }
    }

    async fn create_news(&self, title: &str, content: &str) -> NewscastResult<NewsItem> {
        let row = news::create_news(&self.pool, &self.keys, title, content).await?;
        Ok(news_from_row(row)?)
    }
}

#[async_trait]
impl PushTargetSource for RedisStore {
    async fn fetch_active_push_targets(
        &self,
        window: chrono::Duration,
    ) -> NewscastResult<Vec<PushTarget>> {
        let since = active_since(Utc::now(), window)?;
        let rows = devices::list_devices_updated_since(&self.pool, &self.keys, since).await?;
        Ok(active_targets_from_rows(rows))
    }

    async fn find_push_target(&self, device_id: &str) -> NewscastResult<Option<PushTarget>> {
        match devices::get_device(&self.pool, &self.keys, device_id).await? {
            Some(row) => Ok(Some(target_from_row(row)?)),
            None => Ok(None),
        }
    }

    async fn upsert_push_target(
        &self,
        device_id: &str,
        token: &str,
        platform: Platform,
    ) -> NewscastResult<PushTarget> {
        let row =
            devices::upsert_device(&self.pool, &self.keys, device_id, token, platform.as_str())
                .await?;
        Ok(target_from_row(row)?)
    }
}
