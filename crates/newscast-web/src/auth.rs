//! Bearer authentication for write endpoints.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use tracing::debug;

use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct Subject(pub String);

impl FromRequestParts<AppState> for Subject {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Missing bearer token".to_string()))?;

        if !state.validator.is_valid_bearer(token) {
            debug!("Rejected invalid bearer token");
            return Err((StatusCode::UNAUTHORIZED, "Invalid bearer token".to_string()));
        }

        let subject = state
            .validator
            .subject_of(token)
            .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Token has no subject".to_string()))?;
        Ok(Subject(subject))
    }
}
