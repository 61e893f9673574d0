use crate::config::Config;
use crate::store::RecordStore;
use crate::sync::{SyncCoordinator, SyncEngine};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod openapi;
pub mod routes_admin;
pub mod routes_videos;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Record store shared with the sync engine
    pub store: Arc<dyn RecordStore>,
    pub engine: Arc<SyncEngine>,
    /// Single-flight guard for sync passes
    pub coordinator: Arc<SyncCoordinator>,
}

impl AppContext {
    pub fn new(config: Config, store: Arc<dyn RecordStore>, engine: SyncEngine) -> Self {
        Self {
            config: Arc::new(config),
            store,
            engine: Arc::new(engine),
            coordinator: SyncCoordinator::new(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    routes_videos::video_routes()
        .merge(routes_admin::admin_routes())
        .merge(openapi::openapi_routes())
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
///
/// When `sync.on_startup` is set, one pass is started in the background
/// before the listener is bound.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    if ctx.config.sync.on_startup {
        match ctx.coordinator.spawn(Arc::clone(&ctx.engine)) {
            Ok(_) => tracing::info!("Startup sync started"),
            Err(e) => tracing::warn!("Startup sync not started: {}", e),
        }
    }

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
