//! Polling registry tests

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use lifelined::errors::LifelineError;
use lifelined::events::container::EventLogContainer;
use lifelined::events::registry::{PollerHandle, PollingRegistry};
use lifelined::models::deployment::DeploymentStatus;

fn handle(deployment_id: Uuid, app: &str, service: &str) -> Arc<PollerHandle> {
    let container = Arc::new(EventLogContainer::new(&HashMap::from([(
        service.to_string(),
        1,
    )])));
    Arc::new(PollerHandle::new(
        deployment_id,
        app.to_string(),
        service.to_string(),
        false,
        container,
    ))
}

#[test]
fn test_duplicate_registration_rejected_and_original_untouched() {
    let registry = PollingRegistry::new();
    let deployment_id = Uuid::new_v4();

    let first = handle(deployment_id, "shop", "web");
    first.container().append("web", Some(0), "started".to_string());
    registry.register(first).unwrap();

    let result = registry.register(handle(deployment_id, "shop", "web"));
    assert!(matches!(result, Err(LifelineError::DeploymentConflict(_))));

    // The original entry and its event log survive the rejection.
    let existing = registry.get(&deployment_id).unwrap();
    assert_eq!(existing.container().event_count(), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_find_by_service_and_active_check() {
    let registry = PollingRegistry::new();
    let deployment_id = Uuid::new_v4();
    registry.register(handle(deployment_id, "shop", "web")).unwrap();

    assert!(registry.find_by_service("shop", "web").is_some());
    assert!(registry.find_by_service("shop", "db").is_none());
    assert!(registry.has_active_poller_for("shop", "web"));

    // A terminal poller no longer blocks new deployments of the service.
    registry
        .get(&deployment_id)
        .unwrap()
        .set_status(DeploymentStatus::Succeeded);
    assert!(!registry.has_active_poller_for("shop", "web"));
    assert!(registry.find_by_service("shop", "web").is_some());
}

#[test]
fn test_cancel_marks_cancelled_and_fires_signal() {
    let registry = PollingRegistry::new();
    let deployment_id = Uuid::new_v4();
    let entry = handle(deployment_id, "shop", "web");
    registry.register(entry.clone()).unwrap();

    registry.cancel(&deployment_id).unwrap();

    assert_eq!(entry.status(), DeploymentStatus::Cancelled);
    assert!(entry.is_cancelled());
}

#[test]
fn test_cancel_is_sticky_without_live_receivers() {
    // No poller task has subscribed yet when the cancel lands.
    let entry = handle(Uuid::new_v4(), "shop", "web");
    entry.cancel();

    assert!(entry.is_cancelled());

    // A receiver created after the fact still observes the cancel.
    let receiver = entry.cancel_receiver();
    assert!(*receiver.borrow());
}

#[test]
fn test_cancel_unknown_deployment_is_not_found() {
    let registry = PollingRegistry::new();
    let result = registry.cancel(&Uuid::new_v4());
    assert!(matches!(result, Err(LifelineError::NotFound(_))));
}

#[test]
fn test_first_terminal_status_wins() {
    let entry = handle(Uuid::new_v4(), "shop", "web");

    entry.set_status(DeploymentStatus::Succeeded);
    entry.set_status(DeploymentStatus::Failed);

    assert_eq!(entry.status(), DeploymentStatus::Succeeded);
}

#[test]
fn test_shutdown_cancels_every_poller() {
    let registry = PollingRegistry::new();
    let a = handle(Uuid::new_v4(), "shop", "web");
    let b = handle(Uuid::new_v4(), "shop", "db");
    registry.register(a.clone()).unwrap();
    registry.register(b.clone()).unwrap();

    registry.shutdown();

    assert!(a.is_cancelled());
    assert!(b.is_cancelled());
    assert_eq!(a.status(), DeploymentStatus::Cancelled);
}
