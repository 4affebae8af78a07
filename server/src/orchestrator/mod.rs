//! Cluster orchestrator collaborator interface
//!
//! The orchestrator itself (provisioning, placement, health) is an
//! external system; this trait is the narrow surface the lifecycle
//! poller and the install/uninstall paths consume.

use async_trait::async_trait;

use crate::errors::LifelineError;
use crate::models::event::InstanceStateChange;
use crate::repo::UploadedBlob;

pub mod http;

pub use http::HttpOrchestrator;

#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Number of instances the orchestrator plans to bring up for a service
    async fn planned_instance_count(&self, service_name: &str) -> Result<u32, LifelineError>;

    /// Instance-level state transitions with an index strictly greater
    /// than the given watermark, in ascending index order. Indices are
    /// 1-based; watermark 0 requests everything from the beginning.
    async fn instance_state_changes_since(
        &self,
        service_name: &str,
        watermark: u64,
    ) -> Result<Vec<InstanceStateChange>, LifelineError>;

    /// Whether a previously triggered undeploy has finished
    async fn is_undeploy_complete(&self, service_name: &str) -> Result<bool, LifelineError>;

    /// Hand a service package to the orchestrator for deployment
    async fn deploy_service(
        &self,
        service_name: &str,
        package: &UploadedBlob,
        planned_instances: u32,
    ) -> Result<(), LifelineError>;

    /// Trigger removal of a deployed service; completion is polled via
    /// [`Orchestrator::is_undeploy_complete`]
    async fn undeploy_service(&self, service_name: &str) -> Result<(), LifelineError>;
}
