//! Registry of active deployment pollers

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::errors::LifelineError;
use crate::events::container::EventLogContainer;
use crate::models::deployment::DeploymentStatus;

/// Handle to one active deployment poller.
///
/// Owned by the registry; one active handle per deployment id. The
/// cancel signal guarantees no further ticks are scheduled, but a tick
/// already in flight is allowed to finish.
pub struct PollerHandle {
    pub deployment_id: Uuid,
    pub application_name: String,
    pub service_name: String,
    pub is_uninstall: bool,
    container: Arc<EventLogContainer>,
    status: RwLock<DeploymentStatus>,
    cancel_tx: watch::Sender<bool>,
}

impl PollerHandle {
    pub fn new(
        deployment_id: Uuid,
        application_name: String,
        service_name: String,
        is_uninstall: bool,
        container: Arc<EventLogContainer>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            deployment_id,
            application_name,
            service_name,
            is_uninstall,
            container,
            status: RwLock::new(DeploymentStatus::InProgress),
            cancel_tx,
        }
    }

    /// Event log owned by this deployment
    pub fn container(&self) -> &Arc<EventLogContainer> {
        &self.container
    }

    /// Current deployment status
    pub fn status(&self) -> DeploymentStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Transition to a terminal status; the first terminal transition
    /// wins, later ones are ignored
    pub fn set_status(&self, status: DeploymentStatus) {
        let mut current = self.status.write().unwrap_or_else(|e| e.into_inner());
        if !current.is_terminal() {
            *current = status;
        }
    }

    /// Request cancellation; no further ticks will be scheduled.
    /// Sticky even when no receiver is live yet: a subscriber created
    /// afterwards observes the cancelled state.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Receiver resolving when cancellation is requested
    pub fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel_tx.subscribe()
    }
}

/// Process-scoped table of active deployment pollers.
///
/// Injected into every component that needs it; entries live until the
/// poller's grace period elapses or the process exits. No persistence.
pub struct PollingRegistry {
    inner: Mutex<HashMap<Uuid, Arc<PollerHandle>>>,
}

impl PollingRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Register a poller handle. A duplicate deployment id is rejected
    /// with a conflict error and the existing poller is unaffected.
    pub fn register(&self, handle: Arc<PollerHandle>) -> Result<(), LifelineError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.contains_key(&handle.deployment_id) {
            return Err(LifelineError::DeploymentConflict(format!(
                "a poller is already active for deployment {}",
                handle.deployment_id
            )));
        }
        inner.insert(handle.deployment_id, handle);
        Ok(())
    }

    /// Look up a handle by deployment id
    pub fn get(&self, deployment_id: &Uuid) -> Option<Arc<PollerHandle>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.get(deployment_id).cloned()
    }

    /// Look up the handle tracking a given service, if any
    pub fn find_by_service(
        &self,
        application_name: &str,
        service_name: &str,
    ) -> Option<Arc<PollerHandle>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .values()
            .find(|h| {
                h.application_name == application_name && h.service_name == service_name
            })
            .cloned()
    }

    /// Whether a non-terminal poller is tracking the given service
    pub fn has_active_poller_for(&self, application_name: &str, service_name: &str) -> bool {
        self.find_by_service(application_name, service_name)
            .map(|h| !h.status().is_terminal())
            .unwrap_or(false)
    }

    /// Remove a handle; returns it if present
    pub fn remove(&self, deployment_id: &Uuid) -> Option<Arc<PollerHandle>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.remove(deployment_id)
    }

    /// Cancel the poller for a deployment
    pub fn cancel(&self, deployment_id: &Uuid) -> Result<(), LifelineError> {
        let handle = self.get(deployment_id).ok_or_else(|| {
            LifelineError::NotFound(format!("no active poller for deployment {}", deployment_id))
        })?;
        info!(deployment_id = %deployment_id, "Cancelling lifecycle poller");
        handle.set_status(DeploymentStatus::Cancelled);
        handle.cancel();
        Ok(())
    }

    /// Cancel every active poller; used on process shutdown
    pub fn shutdown(&self) {
        let handles: Vec<Arc<PollerHandle>> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.values().cloned().collect()
        };
        for handle in handles {
            handle.set_status(DeploymentStatus::Cancelled);
            handle.cancel();
        }
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.len()
    }

    /// Whether no handles are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PollingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
