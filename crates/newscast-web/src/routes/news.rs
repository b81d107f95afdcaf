//! News route handlers.

use axum::{extract::State, http::StatusCode, Json};
use newscast_core::NewsItem;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Subject;
use crate::state::AppState;

#[derive(Serialize)]
pub struct NewsListResponse {
    pub event_id: u64,
    pub items: Vec<NewsItem>,
}

#[derive(Deserialize)]
pub struct CreateNewsRequest {
    pub title: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct CreateNewsResponse {
    pub news: NewsItem,
    pub targets_queued: usize,
}

/// The news list as last seen by the change detector.
pub async fn list_news(State(state): State<AppState>) -> Json<NewsListResponse> {
    let current = state.feed.current();
    Json(NewsListResponse {
        event_id: current.id(),
        items: current.snapshot().items().to_vec(),
    })
}

/// Persist a news item and notify mobile devices about it.
///
/// Streaming clients pick the change up on the detector's next poll.
pub async fn create_news(
    State(state): State<AppState>,
    Subject(subject): Subject,
    Json(req): Json<CreateNewsRequest>,
) -> Result<(StatusCode, Json<CreateNewsResponse>), (StatusCode, String)> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title must not be empty".to_string()));
    }

    let news = state
        .news
        .create_news(title, &req.content)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    info!(news_id = news.id, subject = %subject, "News item created");

    let targets_queued = crate::dispatch_in_background(&state, &news).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateNewsResponse {
            news,
            targets_queued,
        }),
    ))
}
