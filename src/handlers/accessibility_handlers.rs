//! HTTP handlers for per-user accessibility profiles.

use crate::{
    errors::AppError,
    services::{AppState, accessibility_service::ProfileUpdate},
};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

/// GET `/users/{id}/accessibility-profile` — created with defaults on
/// first access.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.accessibility.profile(user_id).await?))
}

/// PUT `/users/{id}/accessibility-profile` — reset-then-apply save.
pub async fn save_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.accessibility.save_profile(user_id, update).await?))
}
