//! HTTP request handlers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::LifelineError;
use crate::events::cache::EventsCacheKey;
use crate::events::poller::DeploymentPoller;
use crate::models::deployment::{
    DeploymentStatusResponse, InstallServiceRequest, InstallServiceResponse,
    ServiceDeploymentEvents, UninstallServiceRequest, UninstallServiceResponse, UploadResponse,
};
use crate::server::state::ServerState;

/// Error payload returned to API callers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying a status-mapped [`LifelineError`]
pub struct ApiError(LifelineError);

impl From<LifelineError> for ApiError {
    fn from(err: LifelineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LifelineError::DeploymentConflict(_) => StatusCode::CONFLICT,
            LifelineError::NotFound(_) => StatusCode::NOT_FOUND,
            LifelineError::ValidationError(_) => StatusCode::BAD_REQUEST,
            LifelineError::OrchestratorQuery(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "lifelined".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Upload handler: store a named blob and return its key
pub async fn upload_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if body.is_empty() {
        return Err(LifelineError::ValidationError(
            "uploaded file is empty".to_string(),
        )
        .into());
    }
    let upload_key = state.repo.store(&name, body.to_vec());
    info!(name = %name, size = body.len(), "Stored uploaded package");
    Ok(Json(UploadResponse { upload_key }))
}

/// Install handler: deploy a previously uploaded package and start
/// polling its lifecycle events
pub async fn install_service_handler(
    State(state): State<Arc<ServerState>>,
    Path((app_name, service_name)): Path<(String, String)>,
    Json(request): Json<InstallServiceRequest>,
) -> Result<Json<InstallServiceResponse>, ApiError> {
    if state.registry.has_active_poller_for(&app_name, &service_name) {
        return Err(LifelineError::DeploymentConflict(format!(
            "service {}/{} already has an active deployment",
            app_name, service_name
        ))
        .into());
    }

    let package = state
        .repo
        .retrieve(&request.service_folder_upload_key)
        .ok_or_else(|| {
            LifelineError::ValidationError(format!(
                "unknown service folder upload key: {}",
                request.service_folder_upload_key
            ))
        })?;

    let planned_instances = match request.planned_instances {
        Some(count) => count,
        None => state.orchestrator.planned_instance_count(&service_name).await?,
    };

    state
        .orchestrator
        .deploy_service(&service_name, &package, planned_instances)
        .await?;

    let timeout = request
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(state.default_deployment_timeout);
    let deployment_id = Uuid::new_v4();
    let mut planned_services = HashMap::new();
    planned_services.insert(service_name.clone(), planned_instances);

    DeploymentPoller::start(
        &state.registry,
        state.orchestrator.clone(),
        state.poller_options.clone(),
        deployment_id,
        app_name.clone(),
        service_name.clone(),
        planned_services,
        timeout,
        false,
    )?;

    info!(
        deployment_id = %deployment_id,
        service = %service_name,
        planned = planned_instances,
        "Started polling for install lifecycle events"
    );
    Ok(Json(InstallServiceResponse { deployment_id }))
}

/// Uninstall handler: trigger undeploy and start polling until the
/// orchestrator reports completion
pub async fn uninstall_service_handler(
    State(state): State<Arc<ServerState>>,
    Path((app_name, service_name)): Path<(String, String)>,
    request: Option<Json<UninstallServiceRequest>>,
) -> Result<Json<UninstallServiceResponse>, ApiError> {
    if state.registry.has_active_poller_for(&app_name, &service_name) {
        return Err(LifelineError::DeploymentConflict(format!(
            "service {}/{} already has an active deployment",
            app_name, service_name
        ))
        .into());
    }

    state.orchestrator.undeploy_service(&service_name).await?;

    let request = request.map(|Json(r)| r).unwrap_or_default();
    let timeout = request
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(state.default_deployment_timeout);
    let deployment_id = Uuid::new_v4();

    // Planned count is 0 by construction; completion comes from the
    // orchestrator's undeploy signal, not from instance counting.
    let mut planned_services = HashMap::new();
    planned_services.insert(service_name.clone(), 0);

    DeploymentPoller::start(
        &state.registry,
        state.orchestrator.clone(),
        state.poller_options.clone(),
        deployment_id,
        app_name.clone(),
        service_name.clone(),
        planned_services,
        timeout,
        true,
    )?;

    info!(
        deployment_id = %deployment_id,
        service = %service_name,
        "Started polling for uninstall lifecycle events"
    );
    Ok(Json(UninstallServiceResponse { deployment_id }))
}

/// Range query parameters; a missing `to` becomes `from + 100`
#[derive(Debug, Deserialize)]
pub struct EventsRangeParams {
    #[serde(default)]
    pub from: u64,
    pub to: Option<u64>,
}

/// Ranged events handler. Best-effort: an empty or partial list is a
/// valid response.
pub async fn service_events_handler(
    State(state): State<Arc<ServerState>>,
    Path((app_name, service_name)): Path<(String, String)>,
    Query(params): Query<EventsRangeParams>,
) -> Json<ServiceDeploymentEvents> {
    let key = EventsCacheKey::new(&app_name, &service_name);
    let events = state.query.query(&key, params.from, params.to).await;
    Json(ServiceDeploymentEvents { events })
}

/// Deployment status handler, consumed by the client wait loop
pub async fn deployment_status_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<Uuid>,
) -> Result<Json<DeploymentStatusResponse>, ApiError> {
    let handle = state.registry.get(&deployment_id).ok_or_else(|| {
        LifelineError::NotFound(format!("no tracked deployment {}", deployment_id))
    })?;

    Ok(Json(DeploymentStatusResponse {
        deployment_id,
        status: handle.status(),
        events_recorded: handle.container().event_count(),
    }))
}

/// Cancel handler: stop the poller for a deployment
pub async fn cancel_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<Uuid>,
) -> Result<Json<DeploymentStatusResponse>, ApiError> {
    state.registry.cancel(&deployment_id)?;
    let handle = state.registry.get(&deployment_id).ok_or_else(|| {
        LifelineError::NotFound(format!("no tracked deployment {}", deployment_id))
    })?;

    Ok(Json(DeploymentStatusResponse {
        deployment_id,
        status: handle.status(),
        events_recorded: handle.container().event_count(),
    }))
}
