//! Lifecycle event models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded state transition of a service instance during
/// provisioning or deprovisioning.
///
/// Immutable once appended to its event log. `sequence_index` is
/// assigned at append time, strictly increasing per deployment with
/// no gaps, and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Position in the deployment's event log
    pub sequence_index: u64,

    /// Service this event belongs to
    pub service_name: String,

    /// Instance the transition applies to, if instance-scoped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u32>,

    /// Human-readable transition description
    pub description: String,

    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle state of a single service instance, as reported by
/// the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceLifecycleState {
    /// Machine is being allocated
    Provisioning,

    /// Service files are being installed
    Installing,

    /// Service process is starting
    Starting,

    /// Instance is up and serving
    Ready,

    /// Instance is shutting down
    Stopping,

    /// Instance has been removed
    Removed,

    /// Instance failed to come up
    Failed,
}

impl std::fmt::Display for InstanceLifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceLifecycleState::Provisioning => "provisioning",
            InstanceLifecycleState::Installing => "installing",
            InstanceLifecycleState::Starting => "starting",
            InstanceLifecycleState::Ready => "ready",
            InstanceLifecycleState::Stopping => "stopping",
            InstanceLifecycleState::Removed => "removed",
            InstanceLifecycleState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One instance-level state transition reported by the orchestrator.
///
/// `index` is the orchestrator-side watermark for the service: a poller
/// passes the highest index it has already consumed and receives only
/// transitions with a greater index, in ascending order. Indices start
/// at 1 so that watermark 0 means "nothing consumed yet".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStateChange {
    /// Orchestrator-side watermark index, 1-based
    pub index: u64,

    /// Instance the transition applies to
    pub instance_id: u32,

    /// New lifecycle state
    pub state: InstanceLifecycleState,

    /// Transition description
    pub description: String,
}
