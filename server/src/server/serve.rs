//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::LifelineError;
use crate::server::handlers::{
    cancel_deployment_handler, deployment_status_handler, health_handler,
    install_service_handler, service_events_handler, uninstall_service_handler, upload_handler,
};
use crate::server::state::ServerState;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_handler))
        // Package uploads
        .route("/upload/{name}", post(upload_handler))
        // Deployments
        .route(
            "/deployments/{app_name}/services/{service_name}",
            post(install_service_handler).delete(uninstall_service_handler),
        )
        .route(
            "/deployments/{app_name}/services/{service_name}/events",
            get(service_events_handler),
        )
        .route(
            "/deployments/{deployment_id}/status",
            get(deployment_status_handler),
        )
        .route(
            "/deployments/{deployment_id}/cancel",
            post(cancel_deployment_handler),
        )
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), LifelineError>>, LifelineError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LifelineError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| LifelineError::ServerError(e.to_string()))
    });

    Ok(handle)
}
