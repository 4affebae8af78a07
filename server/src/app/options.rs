//! Application options

use std::time::Duration;

use crate::events::cache::CacheOptions;
use crate::events::poller::PollerOptions;

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Top-level application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub server: ServerOptions,
    /// Base URL of the orchestrator backend
    pub orchestrator_base_url: String,
    pub poller: PollerOptions,
    pub cache: CacheOptions,
    /// Deployment timeout applied when a request does not carry one
    pub default_deployment_timeout: Duration,
    /// Upper bound on graceful shutdown before the process is forced out
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            server: ServerOptions::default(),
            orchestrator_base_url: "http://localhost:9090".to_string(),
            poller: PollerOptions::default(),
            cache: CacheOptions::default(),
            default_deployment_timeout: Duration::from_secs(300),
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}
