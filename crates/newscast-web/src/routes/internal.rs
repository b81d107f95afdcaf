//! Internal notification endpoints.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use newscast_core::NewsItem;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Subject;
use crate::state::AppState;

/// Signal sent by whatever persisted a news item.
#[derive(Debug, Deserialize)]
pub struct NewsPersisted {
    pub id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct DispatchAccepted {
    pub targets_queued: usize,
}

/// Receive a "news persisted" signal and start the push dispatch.
pub async fn news_persisted(
    State(state): State<AppState>,
    Subject(subject): Subject,
    Json(signal): Json<NewsPersisted>,
) -> (StatusCode, Json<DispatchAccepted>) {
    info!(news_id = signal.id, subject = %subject, "Received news persisted signal");
    let item = NewsItem {
        id: signal.id,
        title: signal.title,
        content: signal.content,
        created_at: Utc::now(),
    };

    let targets_queued = crate::dispatch_in_background(&state, &item).await;
    (StatusCode::ACCEPTED, Json(DispatchAccepted { targets_queued }))
}
