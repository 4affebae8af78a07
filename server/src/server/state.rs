//! Server state

use std::sync::Arc;
use std::time::Duration;

use crate::events::poller::PollerOptions;
use crate::events::query::EventsQueryService;
use crate::events::registry::PollingRegistry;
use crate::orchestrator::Orchestrator;
use crate::repo::UploadRepo;

/// Server state shared across handlers
pub struct ServerState {
    pub registry: Arc<PollingRegistry>,
    pub query: Arc<EventsQueryService>,
    pub orchestrator: Arc<dyn Orchestrator>,
    pub repo: Arc<UploadRepo>,
    pub poller_options: PollerOptions,
    pub default_deployment_timeout: Duration,
}

impl ServerState {
    pub fn new(
        registry: Arc<PollingRegistry>,
        query: Arc<EventsQueryService>,
        orchestrator: Arc<dyn Orchestrator>,
        repo: Arc<UploadRepo>,
        poller_options: PollerOptions,
        default_deployment_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            query,
            orchestrator,
            repo,
            poller_options,
            default_deployment_timeout,
        }
    }
}
