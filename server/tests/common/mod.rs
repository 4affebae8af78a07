//! Shared test fixtures
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use lifelined::errors::LifelineError;
use lifelined::models::event::{InstanceLifecycleState, InstanceStateChange};
use lifelined::orchestrator::Orchestrator;
use lifelined::repo::UploadedBlob;

/// Orchestrator double fed from scripted per-poll batches of instance
/// state changes. Each poll for a service pops the next batch.
pub struct ScriptedOrchestrator {
    changes: Mutex<HashMap<String, VecDeque<Vec<InstanceStateChange>>>>,
    planned: Mutex<HashMap<String, u32>>,
    /// Remaining undeploy-completion polls answered `false` per service
    undeploy_polls_left: Mutex<HashMap<String, u32>>,
    pub deployed: Mutex<Vec<String>>,
    pub undeployed: Mutex<Vec<String>>,
}

impl ScriptedOrchestrator {
    pub fn new() -> Self {
        Self {
            changes: Mutex::new(HashMap::new()),
            planned: Mutex::new(HashMap::new()),
            undeploy_polls_left: Mutex::new(HashMap::new()),
            deployed: Mutex::new(Vec::new()),
            undeployed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_planned(&self, service_name: &str, planned: u32) {
        self.planned
            .lock()
            .unwrap()
            .insert(service_name.to_string(), planned);
    }

    /// Queue one poll's worth of state changes for a service
    pub fn push_batch(&self, service_name: &str, batch: Vec<InstanceStateChange>) {
        self.changes
            .lock()
            .unwrap()
            .entry(service_name.to_string())
            .or_default()
            .push_back(batch);
    }

    /// Report the undeploy as complete after `polls` incomplete answers
    pub fn complete_undeploy_after(&self, service_name: &str, polls: u32) {
        self.undeploy_polls_left
            .lock()
            .unwrap()
            .insert(service_name.to_string(), polls);
    }
}

#[async_trait]
impl Orchestrator for ScriptedOrchestrator {
    async fn planned_instance_count(&self, service_name: &str) -> Result<u32, LifelineError> {
        self.planned
            .lock()
            .unwrap()
            .get(service_name)
            .copied()
            .ok_or_else(|| {
                LifelineError::OrchestratorQuery(format!("unknown service {}", service_name))
            })
    }

    async fn instance_state_changes_since(
        &self,
        service_name: &str,
        _watermark: u64,
    ) -> Result<Vec<InstanceStateChange>, LifelineError> {
        let mut changes = self.changes.lock().unwrap();
        Ok(changes
            .get_mut(service_name)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default())
    }

    async fn is_undeploy_complete(&self, service_name: &str) -> Result<bool, LifelineError> {
        let mut left = self.undeploy_polls_left.lock().unwrap();
        match left.get_mut(service_name) {
            Some(0) | None => Ok(true),
            Some(remaining) => {
                *remaining -= 1;
                Ok(false)
            }
        }
    }

    async fn deploy_service(
        &self,
        service_name: &str,
        _package: &UploadedBlob,
        _planned_instances: u32,
    ) -> Result<(), LifelineError> {
        self.deployed.lock().unwrap().push(service_name.to_string());
        Ok(())
    }

    async fn undeploy_service(&self, service_name: &str) -> Result<(), LifelineError> {
        self.undeployed
            .lock()
            .unwrap()
            .push(service_name.to_string());
        Ok(())
    }
}

/// Build one instance state change for scripting
pub fn ready_change(index: u64, instance_id: u32) -> InstanceStateChange {
    InstanceStateChange {
        index,
        instance_id,
        state: InstanceLifecycleState::Ready,
        description: format!("Instance {} is ready", instance_id),
    }
}

pub fn change(
    index: u64,
    instance_id: u32,
    state: InstanceLifecycleState,
    description: &str,
) -> InstanceStateChange {
    InstanceStateChange {
        index,
        instance_id,
        state,
        description: description.to_string(),
    }
}
