//! Liveness endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": if state.broadcaster.is_shutting_down() { "draining" } else { "ok" },
        "clients": state.broadcaster.client_count(),
        "event_id": state.feed.current_id(),
    }))
}
