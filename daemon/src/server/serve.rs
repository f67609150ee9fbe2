//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::SlipwayError;
use crate::server::handlers::{
    deploy_handler, deployment_status_handler, events_handler, get_settings_handler,
    health_handler, update_settings_handler, version_handler,
};
use crate::server::state::ServerState;

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), SlipwayError>>, SlipwayError> {
    let app = Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Deployment control surface
        .route("/api/deploy", post(deploy_handler))
        .route("/api/deployment/status", get(deployment_status_handler))
        // Settings surface
        .route(
            "/api/settings",
            get(get_settings_handler).put(update_settings_handler),
        )
        // Live observer feed
        .route("/api/events", get(events_handler))
        // State and middleware; the console is served from another origin,
        // so the surface stays permissive like the plugin socket it replaces
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SlipwayError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| SlipwayError::ServerError(e.to_string()))
    });

    Ok(handle)
}
