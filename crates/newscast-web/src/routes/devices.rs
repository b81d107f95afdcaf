//! Device (push target) route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use newscast_core::{Platform, PushTarget};
use newscast_push::PushError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Subject;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterDeviceRequest {
    pub device_id: String,
    pub token: String,
    pub platform: String,
}

#[derive(Deserialize)]
pub struct NotifyDeviceRequest {
    pub news_id: i64,
}

#[derive(Serialize)]
pub struct NotifyDeviceResponse {
    pub message_id: String,
}

pub async fn register_device(
    State(state): State<AppState>,
    Subject(subject): Subject,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<Json<PushTarget>, (StatusCode, String)> {
    if req.device_id.trim().is_empty() || req.token.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "device_id and token are required".to_string()));
    }
    let platform: Platform = req
        .platform
        .parse()
        .map_err(|e: newscast_core::NewscastError| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let target = state
        .devices
        .upsert_push_target(req.device_id.trim(), req.token.trim(), platform)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    info!(
        device_id = %target.device_id,
        platform = %target.platform,
        subject = %subject,
        "Device registered"
    );

    Ok(Json(target))
}

/// Send one news item to one device.
pub async fn notify_device(
    State(state): State<AppState>,
    Subject(_): Subject,
    Path(device_id): Path<String>,
    Json(req): Json<NotifyDeviceRequest>,
) -> Result<Json<NotifyDeviceResponse>, (StatusCode, String)> {
    let news = state
        .news
        .get_news(req.news_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("News not found: {}", req.news_id)))?;

    let message_id = state
        .orchestrator
        .send_to_device(&news, &device_id)
        .await
        .map_err(|e| match e {
            PushError::TargetNotFound(_) | PushError::MissingToken(_) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            PushError::Source(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            other => (StatusCode::BAD_GATEWAY, other.to_string()),
        })?;

    Ok(Json(NotifyDeviceResponse { message_id }))
}
