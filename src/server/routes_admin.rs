//! Admin API routes for triggering and monitoring library sync.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use super::routes_videos::MessageResponse;
use super::AppContext;
use crate::sync::SyncStatus;

/// Create admin routes.
pub fn admin_routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/sync-videos", post(trigger_sync))
        .route("/admin/sync-status", get(get_sync_status))
}

/// Start a sync pass in the background.
#[utoipa::path(
    post,
    path = "/api/admin/sync-videos",
    tag = "admin",
    responses(
        (status = 202, description = "Sync pass started", body = MessageResponse),
        (status = 409, description = "A sync pass is already running", body = MessageResponse)
    )
)]
pub async fn trigger_sync(State(ctx): State<AppContext>) -> impl IntoResponse {
    match ctx.coordinator.spawn(Arc::clone(&ctx.engine)) {
        Ok(_) => {
            tracing::info!("Video synchronization triggered");
            (
                StatusCode::ACCEPTED,
                Json(MessageResponse::new("Video synchronization started")),
            )
        }
        Err(e) => {
            tracing::info!("Rejected sync trigger: {}", e);
            (StatusCode::CONFLICT, Json(MessageResponse::new(e.to_string())))
        }
    }
}

/// Current and last sync outcome.
#[utoipa::path(
    get,
    path = "/api/admin/sync-status",
    tag = "admin",
    responses(
        (status = 200, description = "Sync status", body = SyncStatus)
    )
)]
pub async fn get_sync_status(State(ctx): State<AppContext>) -> Json<SyncStatus> {
    Json(ctx.coordinator.status())
}
