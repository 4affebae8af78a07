//! Per-deployment lifecycle event log

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::models::event::LifecycleEvent;

/// Install progress of one tracked service
#[derive(Debug, Clone, Copy)]
pub struct ServiceProgress {
    /// Instances the deployment is expected to bring up
    pub planned: u32,

    /// Instances observed in the ready state so far
    pub observed: u32,
}

/// Append-only, ordered lifecycle event log for one deployment.
///
/// Mutated exclusively by the owning poller; read concurrently by cache
/// refreshes and status checks. Sequence indices are assigned at append
/// time and are strictly increasing with no gaps.
pub struct EventLogContainer {
    inner: RwLock<ContainerInner>,
}

struct ContainerInner {
    events: Vec<LifecycleEvent>,
    services: HashMap<String, ServiceProgress>,
}

impl EventLogContainer {
    /// Create a container tracking the given planned instance counts
    pub fn new(planned_services: &HashMap<String, u32>) -> Self {
        let services = planned_services
            .iter()
            .map(|(name, planned)| {
                (
                    name.clone(),
                    ServiceProgress {
                        planned: *planned,
                        observed: 0,
                    },
                )
            })
            .collect();

        Self {
            inner: RwLock::new(ContainerInner {
                events: Vec::new(),
                services,
            }),
        }
    }

    /// Append one event, assigning the next sequence index
    pub fn append(
        &self,
        service_name: &str,
        instance_id: Option<u32>,
        description: String,
    ) -> u64 {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let sequence_index = inner.events.len() as u64;
        inner.events.push(LifecycleEvent {
            sequence_index,
            service_name: service_name.to_string(),
            instance_id,
            description,
            timestamp: Utc::now(),
        });
        sequence_index
    }

    /// Count one more instance of a service as ready
    pub fn record_instance_ready(&self, service_name: &str) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(progress) = inner.services.get_mut(service_name) {
            progress.observed += 1;
        }
    }

    /// Snapshot of all events with `sequence_index >= from`
    pub fn events_from(&self, from: u64) -> Vec<LifecycleEvent> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let start = (from as usize).min(inner.events.len());
        inner.events[start..].to_vec()
    }

    /// Number of events recorded so far
    pub fn event_count(&self) -> u64 {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.events.len() as u64
    }

    /// Progress of one tracked service
    pub fn progress(&self, service_name: &str) -> Option<ServiceProgress> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.services.get(service_name).copied()
    }

    /// Names of all tracked services
    pub fn service_names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.services.keys().cloned().collect()
    }

    /// Names of tracked services that have not yet reached their
    /// planned instance count
    pub fn incomplete_services(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .services
            .iter()
            .filter(|(_, p)| p.observed < p.planned)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Install completion rule: every tracked service has observed its
    /// planned instance count
    pub fn is_complete(&self) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.services.values().all(|p| p.observed >= p.planned)
    }
}
