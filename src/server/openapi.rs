//! OpenAPI documentation.
//!
//! This module provides the OpenAPI 3.0 document for the Reelshelf API.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use super::AppContext;

/// OpenAPI documentation for Reelshelf.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reelshelf API",
        version = "0.1.0",
        description = "Video library catalog with probed and looked-up metadata",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "/", description = "Default server")
    ),
    paths(
        super::routes_videos::list_videos,
        super::routes_videos::download_video,
        super::routes_admin::trigger_sync,
        super::routes_admin::get_sync_status,
    ),
    components(
        schemas(
            super::routes_videos::VideoResponse,
            super::routes_videos::MessageResponse,
            crate::sync::SyncStatus,
            crate::sync::SyncReport,
        )
    ),
    tags(
        (name = "videos", description = "Catalogued videos"),
        (name = "admin", description = "Library sync management"),
    )
)]
pub struct ApiDoc;

/// Create OpenAPI documentation routes.
///
/// - `/openapi.json` - Raw OpenAPI JSON document
pub fn openapi_routes() -> Router<AppContext> {
    Router::new().route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
