//! Background lifecycle poller, one task per active deployment

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::LifelineError;
use crate::events::container::EventLogContainer;
use crate::events::registry::{PollerHandle, PollingRegistry};
use crate::models::deployment::DeploymentStatus;
use crate::models::event::InstanceLifecycleState;
use crate::orchestrator::Orchestrator;

/// Poller options
#[derive(Debug, Clone)]
pub struct PollerOptions {
    /// Fixed delay between ticks
    pub interval: Duration,

    /// How long a finished poller's event log stays readable before
    /// its registry entry is removed
    pub grace_period: Duration,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            grace_period: Duration::from_secs(60),
        }
    }
}

/// Repeatedly queries the orchestrator for instance state changes and
/// appends them to the deployment's event log.
///
/// Each tick is a short unit of work re-submitted at a fixed delay; a
/// slow orchestrator call delays only this deployment's next tick. A
/// single failed query is logged and retried on the next tick. Only
/// deadline expiry or an explicit cancel stops the schedule.
pub struct DeploymentPoller {
    handle: Arc<PollerHandle>,
    orchestrator: Arc<dyn Orchestrator>,
    registry: Arc<PollingRegistry>,
    options: PollerOptions,
    deadline: Instant,
    watermarks: HashMap<String, u64>,
}

impl DeploymentPoller {
    /// Register and start a poller for a deployment.
    ///
    /// Fails with a conflict error if a poller is already registered
    /// under the same deployment id.
    pub fn start(
        registry: &Arc<PollingRegistry>,
        orchestrator: Arc<dyn Orchestrator>,
        options: PollerOptions,
        deployment_id: Uuid,
        application_name: String,
        service_name: String,
        planned_services: HashMap<String, u32>,
        timeout: Duration,
        is_uninstall: bool,
    ) -> Result<Arc<PollerHandle>, LifelineError> {
        let container = Arc::new(EventLogContainer::new(&planned_services));
        let handle = Arc::new(PollerHandle::new(
            deployment_id,
            application_name,
            service_name,
            is_uninstall,
            container,
        ));
        registry.register(handle.clone())?;

        let poller = DeploymentPoller {
            handle: handle.clone(),
            orchestrator,
            registry: registry.clone(),
            options,
            deadline: Instant::now() + timeout,
            watermarks: HashMap::new(),
        };
        tokio::spawn(poller.run());

        Ok(handle)
    }

    async fn run(mut self) {
        info!(
            deployment_id = %self.handle.deployment_id,
            service = %self.handle.service_name,
            uninstall = self.handle.is_uninstall,
            "Lifecycle poller starting"
        );
        let mut cancel_rx = self.handle.cancel_receiver();

        loop {
            if self.handle.is_cancelled() {
                info!(deployment_id = %self.handle.deployment_id, "Lifecycle poller cancelled");
                break;
            }
            if Instant::now() >= self.deadline {
                warn!(
                    deployment_id = %self.handle.deployment_id,
                    "Lifecycle poller deadline elapsed"
                );
                self.handle.set_status(DeploymentStatus::TimedOut);
                break;
            }

            self.tick().await;

            if self.handle.status().is_terminal() {
                info!(
                    deployment_id = %self.handle.deployment_id,
                    status = ?self.handle.status(),
                    "Lifecycle poller finished"
                );
                break;
            }

            tokio::select! {
                _ = cancel_rx.changed() => {
                    info!(deployment_id = %self.handle.deployment_id, "Lifecycle poller cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.options.interval) => {}
            }
        }

        // Keep the event log readable for late readers, then drop it.
        let registry = self.registry;
        let deployment_id = self.handle.deployment_id;
        let grace_period = self.options.grace_period;
        tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            registry.remove(&deployment_id);
            debug!(deployment_id = %deployment_id, "Lifecycle poller entry removed");
        });
    }

    async fn tick(&mut self) {
        let container = self.handle.container().clone();

        let tracked = if self.handle.is_uninstall {
            container.service_names()
        } else {
            container.incomplete_services()
        };

        for service_name in tracked {
            let watermark = self.watermarks.get(&service_name).copied().unwrap_or(0);
            match self
                .orchestrator
                .instance_state_changes_since(&service_name, watermark)
                .await
            {
                Ok(changes) => {
                    let mut new_watermark = watermark;
                    for change in changes {
                        container.append(
                            &service_name,
                            Some(change.instance_id),
                            change.description.clone(),
                        );
                        if change.state == InstanceLifecycleState::Ready {
                            container.record_instance_ready(&service_name);
                        }
                        new_watermark = new_watermark.max(change.index);
                    }
                    self.watermarks.insert(service_name, new_watermark);
                }
                Err(e) => {
                    // Transient: absorbed here, retried on the next tick.
                    warn!(
                        deployment_id = %self.handle.deployment_id,
                        service = %service_name,
                        "Orchestrator query failed, will retry: {}", e
                    );
                }
            }
        }

        if self.handle.is_uninstall {
            match self
                .orchestrator
                .is_undeploy_complete(&self.handle.service_name)
                .await
            {
                Ok(true) => {
                    container.append(
                        &self.handle.service_name,
                        None,
                        format!("Service {} undeployed successfully", self.handle.service_name),
                    );
                    self.handle.set_status(DeploymentStatus::Succeeded);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        deployment_id = %self.handle.deployment_id,
                        "Undeploy completion query failed, will retry: {}", e
                    );
                }
            }
        } else if container.is_complete() {
            self.handle.set_status(DeploymentStatus::Succeeded);
        }
    }
}
