//! News queries.

use crate::client::{Keys, RedisPool, RedisResult};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

pub async fn create_news(
    pool: &RedisPool,
    keys: &Keys,
    title: &str,
    content: &str,
) -> RedisResult<NewsRow> {
    let mut conn = pool.clone();
    let id: i64 = conn.incr(keys.news_seq(), 1).await?;
    let now = chrono::Utc::now();
    let row = NewsRow {
        id,
        title: title.to_string(),
        content: content.to_string(),
        created_at: now.to_rfc3339(),
    };

    let json = serde_json::to_string(&row)?;
    let mut pipe = redis::pipe();
    pipe.atomic()
        .hset(keys.news(), id, &json)
        .ignore()
        .zadd(keys.news_by_created(), id, now.timestamp())
        .ignore();
    let _: () = pipe.query_async(&mut conn).await?;

    Ok(row)
}

pub async fn get_news(pool: &RedisPool, keys: &Keys, id: i64) -> RedisResult<Option<NewsRow>> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(keys.news(), id).await?;
    match json {
        Some(j) => Ok(Some(serde_json::from_str(&j)?)),
        None => Ok(None),
    }
}

/// All news rows, newest first.
pub async fn list_news(pool: &RedisPool, keys: &Keys) -> RedisResult<Vec<NewsRow>> {
    let mut conn = pool.clone();
    let ids: Vec<i64> = conn.zrevrange(keys.news_by_created(), 0, -1).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<Option<String>> = redis::cmd("HMGET")
        .arg(keys.news())
        .arg(&ids)
        .query_async(&mut conn)
        .await?;

    let mut rows = Vec::with_capacity(values.len());
    for json in values.into_iter().flatten() {
        match serde_json::from_str::<NewsRow>(&json) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable news row"),
        }
    }
    sort_newest_first(&mut rows);
    Ok(rows)
}

/// Newest first; ties broken by descending id so equal timestamps keep a
/// stable order between polls.
pub fn sort_newest_first(rows: &mut [NewsRow]) {
    rows.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
