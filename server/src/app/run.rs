//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::errors::LifelineError;
use crate::events::cache::EventsCache;
use crate::events::query::EventsQueryService;
use crate::events::registry::PollingRegistry;
use crate::orchestrator::HttpOrchestrator;
use crate::repo::UploadRepo;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the lifeline server
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), LifelineError> {
    info!("Initializing lifeline server...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);

    let orchestrator = Arc::new(HttpOrchestrator::new(&options.orchestrator_base_url)?);
    let registry = Arc::new(PollingRegistry::new());
    let cache = Arc::new(EventsCache::new(registry.clone(), options.cache.clone()));
    let query = Arc::new(EventsQueryService::new(cache));
    let repo = Arc::new(UploadRepo::new());

    let server_state = ServerState::new(
        registry.clone(),
        query,
        orchestrator,
        repo,
        options.poller.clone(),
        options.default_deployment_timeout,
    );

    let mut server_shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = server_shutdown_rx.recv().await;
    })
    .await?;

    tokio::select! {
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    // Shutdown: stop accepting requests, then cancel every live poller
    let _ = shutdown_tx.send(());
    registry.shutdown();

    match tokio::time::timeout(options.max_shutdown_delay, server_handle).await {
        Ok(result) => result.map_err(|e| LifelineError::ShutdownError(e.to_string()))??,
        Err(_) => {
            error!(
                "Shutdown timed out after {:?}, forcing shutdown...",
                options.max_shutdown_delay
            );
            std::process::exit(1);
        }
    }

    info!("Shutdown complete");
    Ok(())
}
