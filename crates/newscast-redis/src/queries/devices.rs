//! Push target (device) queries.

use crate::client::{Keys, RedisPool, RedisResult};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRow {
    pub device_id: String,
    pub token: String,
    pub platform: String,
    pub updated_at: String,
}

/// Insert or refresh a device registration. Refreshing moves the device to
/// the front of the activity window.
pub async fn upsert_device(
    pool: &RedisPool,
    keys: &Keys,
    device_id: &str,
    token: &str,
    platform: &str,
) -> RedisResult<DeviceRow> {
    let mut conn = pool.clone();
    let now = chrono::Utc::now();
    let row = DeviceRow {
        device_id: device_id.to_string(),
        token: token.to_string(),
        platform: platform.to_string(),
        updated_at: now.to_rfc3339(),
    };

    let json = serde_json::to_string(&row)?;
    let mut pipe = redis::pipe();
    pipe.atomic()
        .hset(keys.devices(), device_id, &json)
        .ignore()
        .zadd(keys.devices_by_updated(), device_id, now.timestamp())
        .ignore();
    let _: () = pipe.query_async(&mut conn).await?;

    Ok(row)
}

pub async fn get_device(
    pool: &RedisPool,
    keys: &Keys,
    device_id: &str,
) -> RedisResult<Option<DeviceRow>> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(keys.devices(), device_id).await?;
    match json {
        Some(j) => Ok(Some(serde_json::from_str(&j)?)),
        None => Ok(None),
    }
}

/// Devices refreshed at or after `since` (unix seconds).
pub async fn list_devices_updated_since(
    pool: &RedisPool,
    keys: &Keys,
    since: i64,
) -> RedisResult<Vec<DeviceRow>> {
    let mut conn = pool.clone();
    let ids: Vec<String> = conn
        .zrangebyscore(keys.devices_by_updated(), since, "+inf")
        .await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<Option<String>> = redis::cmd("HMGET")
        .arg(keys.devices())
        .arg(&ids)
        .query_async(&mut conn)
        .await?;

    let mut rows = Vec::with_capacity(values.len());
    for json in values.into_iter().flatten() {
        match serde_json::from_str::<DeviceRow>(&json) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable device row"),
        }
    }
    Ok(rows)
}
