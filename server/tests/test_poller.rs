//! Deployment poller tests

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use common::ScriptedOrchestrator;
use lifelined::events::cache::{CacheOptions, EventsCache, EventsCacheKey};
use lifelined::events::poller::{DeploymentPoller, PollerOptions};
use lifelined::events::query::EventsQueryService;
use lifelined::events::registry::PollingRegistry;
use lifelined::models::deployment::DeploymentStatus;

fn poller_options() -> PollerOptions {
    PollerOptions {
        interval: Duration::from_millis(100),
        grace_period: Duration::from_secs(1),
    }
}

fn planned(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
    pairs.iter().map(|(n, c)| (n.to_string(), *c)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_install_poller_records_ready_events_and_succeeds() {
    let registry = Arc::new(PollingRegistry::new());
    let orchestrator = Arc::new(ScriptedOrchestrator::new());

    // One instance comes up per poll, three polls to completion.
    orchestrator.push_batch("web", vec![common::ready_change(1, 0)]);
    orchestrator.push_batch("web", vec![common::ready_change(2, 1)]);
    orchestrator.push_batch("web", vec![common::ready_change(3, 2)]);

    let deployment_id = Uuid::new_v4();
    let handle = DeploymentPoller::start(
        &registry,
        orchestrator,
        poller_options(),
        deployment_id,
        "shop".to_string(),
        "web".to_string(),
        planned(&[("web", 3)]),
        Duration::from_secs(60),
        false,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(handle.status(), DeploymentStatus::Succeeded);

    let cache = Arc::new(EventsCache::new(registry.clone(), CacheOptions::default()));
    let query = EventsQueryService::new(cache);
    let events = query
        .query(&EventsCacheKey::new("shop", "web"), 0, Some(10))
        .await;

    assert_eq!(events.len(), 3);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.sequence_index, i as u64);
        assert_eq!(event.service_name, "web");
    }
}

#[tokio::test(start_paused = true)]
async fn test_uninstall_poller_appends_marker_on_completion() {
    let registry = Arc::new(PollingRegistry::new());
    let orchestrator = Arc::new(ScriptedOrchestrator::new());
    orchestrator.complete_undeploy_after("web", 2);

    let handle = DeploymentPoller::start(
        &registry,
        orchestrator,
        poller_options(),
        Uuid::new_v4(),
        "shop".to_string(),
        "web".to_string(),
        planned(&[("web", 0)]),
        Duration::from_secs(60),
        true,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(handle.status(), DeploymentStatus::Succeeded);
    let events = handle.container().events_from(0);
    let last = events.last().unwrap();
    assert_eq!(last.description, "Service web undeployed successfully");
    assert!(last.instance_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_poller_times_out_when_instances_never_ready() {
    let registry = Arc::new(PollingRegistry::new());
    let orchestrator = Arc::new(ScriptedOrchestrator::new());

    let handle = DeploymentPoller::start(
        &registry,
        orchestrator,
        poller_options(),
        Uuid::new_v4(),
        "shop".to_string(),
        "web".to_string(),
        planned(&[("web", 1)]),
        Duration::from_secs(1),
        false,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(handle.status(), DeploymentStatus::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_finished_poller_entry_removed_after_grace_period() {
    let registry = Arc::new(PollingRegistry::new());
    let orchestrator = Arc::new(ScriptedOrchestrator::new());
    orchestrator.push_batch("web", vec![common::ready_change(1, 0)]);

    let deployment_id = Uuid::new_v4();
    let handle = DeploymentPoller::start(
        &registry,
        orchestrator,
        poller_options(),
        deployment_id,
        "shop".to_string(),
        "web".to_string(),
        planned(&[("web", 1)]),
        Duration::from_secs(60),
        false,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.status(), DeploymentStatus::Succeeded);

    // The event log stays readable inside the grace window.
    assert!(registry.get(&deployment_id).is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(registry.get(&deployment_id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_poller_stops_and_reports_cancelled() {
    let registry = Arc::new(PollingRegistry::new());
    let orchestrator = Arc::new(ScriptedOrchestrator::new());

    let deployment_id = Uuid::new_v4();
    let handle = DeploymentPoller::start(
        &registry,
        orchestrator,
        poller_options(),
        deployment_id,
        "shop".to_string(),
        "web".to_string(),
        planned(&[("web", 1)]),
        Duration::from_secs(60),
        false,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    registry.cancel(&deployment_id).unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(handle.status(), DeploymentStatus::Cancelled);
}
