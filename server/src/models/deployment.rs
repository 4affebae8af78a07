//! Deployment request/response models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::LifecycleEvent;

/// Status of a tracked deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Poller is still tracking lifecycle progress
    InProgress,

    /// All planned services reached their planned instance count,
    /// or the undeploy operation completed
    Succeeded,

    /// Deployment failed
    Failed,

    /// Poller deadline elapsed before completion
    TimedOut,

    /// Poller was cancelled by an explicit request
    Cancelled,
}

impl DeploymentStatus {
    /// Whether the poller has stopped ticking
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeploymentStatus::InProgress)
    }
}

/// Install request for a single service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallServiceRequest {
    /// Key of the previously uploaded service package
    pub service_folder_upload_key: String,

    /// Planned instance count; when absent the orchestrator is asked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_instances: Option<u32>,

    /// Polling deadline in seconds; server default applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Install response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallServiceResponse {
    /// Identifier of the lifecycle event stream for this install
    pub deployment_id: Uuid,
}

/// Uninstall request for a single service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UninstallServiceRequest {
    /// Polling deadline in seconds; server default applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Uninstall response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallServiceResponse {
    /// Identifier of the lifecycle event stream for this uninstall
    pub deployment_id: Uuid,
}

/// Ranged events response
///
/// Best-effort: may hold fewer events than the requested range if the
/// orchestrator has not produced them yet or a cache refresh was
/// rate-limited. An empty list is a valid response, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDeploymentEvents {
    pub events: Vec<LifecycleEvent>,
}

/// Deployment status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStatusResponse {
    pub deployment_id: Uuid,
    pub status: DeploymentStatus,

    /// Number of events recorded so far
    pub events_recorded: u64,
}

/// Upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Key under which the blob can be retrieved
    pub upload_key: String,
}
