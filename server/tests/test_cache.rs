//! Events cache tests

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use lifelined::events::cache::{CacheOptions, EventsCache, EventsCacheKey};
use lifelined::events::container::EventLogContainer;
use lifelined::events::registry::{PollerHandle, PollingRegistry};

fn tracked_registry(app: &str, service: &str) -> (Arc<PollingRegistry>, Arc<EventLogContainer>) {
    let registry = Arc::new(PollingRegistry::new());
    let container = Arc::new(EventLogContainer::new(&HashMap::from([(
        service.to_string(),
        1,
    )])));
    let handle = Arc::new(PollerHandle::new(
        Uuid::new_v4(),
        app.to_string(),
        service.to_string(),
        false,
        container.clone(),
    ));
    registry.register(handle).unwrap();
    (registry, container)
}

fn cache_options() -> CacheOptions {
    CacheOptions {
        min_refresh_interval: Duration::from_millis(500),
    }
}

#[tokio::test(start_paused = true)]
async fn test_refresh_rate_limited_within_window() {
    let (registry, container) = tracked_registry("shop", "web");
    let cache = EventsCache::new(registry, cache_options());
    let key = EventsCacheKey::new("shop", "web");

    container.append("web", Some(0), "provisioning".to_string());

    let entry = cache.get(&key);
    let mut cached = entry.lock().await;
    assert!(cache.refresh(&key, &mut cached));
    assert_eq!(cached.events.len(), 1);

    // New source events inside the window are served stale.
    container.append("web", Some(0), "installing".to_string());
    assert!(!cache.refresh(&key, &mut cached));
    assert_eq!(cached.events.len(), 1);

    tokio::time::advance(Duration::from_millis(600)).await;
    assert!(cache.refresh(&key, &mut cached));
    assert_eq!(cached.events.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_appends_suffix_only() {
    let (registry, container) = tracked_registry("shop", "web");
    let cache = EventsCache::new(registry, cache_options());
    let key = EventsCacheKey::new("shop", "web");

    for i in 0..3 {
        container.append("web", Some(i), format!("step {}", i));
    }

    let entry = cache.get(&key);
    let mut cached = entry.lock().await;
    cache.refresh(&key, &mut cached);
    let first_snapshot: Vec<u64> = cached.events.iter().map(|e| e.sequence_index).collect();

    for i in 3..5 {
        container.append("web", Some(i), format!("step {}", i));
    }
    tokio::time::advance(Duration::from_millis(600)).await;
    cache.refresh(&key, &mut cached);

    // The previously cached prefix is untouched, the suffix is appended.
    assert_eq!(cached.events.len(), 5);
    let prefix: Vec<u64> = cached.events[..3].iter().map(|e| e.sequence_index).collect();
    assert_eq!(prefix, first_snapshot);
    assert_eq!(cached.events[4].sequence_index, 4);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_without_poller_is_a_stamped_noop() {
    let registry = Arc::new(PollingRegistry::new());
    let cache = EventsCache::new(registry, cache_options());
    let key = EventsCacheKey::new("shop", "web");

    let entry = cache.get(&key);
    let mut cached = entry.lock().await;
    assert!(!cache.refresh(&key, &mut cached));
    assert!(cached.events.is_empty());

    // The miss still consumes the rate-limit window.
    assert!(!cache.refresh(&key, &mut cached));
}

#[tokio::test(start_paused = true)]
async fn test_redeploy_resets_the_snapshot() {
    let registry = Arc::new(PollingRegistry::new());
    let cache = EventsCache::new(registry.clone(), cache_options());
    let key = EventsCacheKey::new("shop", "web");

    let first_id = Uuid::new_v4();
    let first_log = Arc::new(EventLogContainer::new(&HashMap::from([(
        "web".to_string(),
        1,
    )])));
    for i in 0..3 {
        first_log.append("web", Some(0), format!("old step {}", i));
    }
    registry
        .register(Arc::new(PollerHandle::new(
            first_id,
            "shop".to_string(),
            "web".to_string(),
            false,
            first_log,
        )))
        .unwrap();

    let entry = cache.get(&key);
    let mut cached = entry.lock().await;
    cache.refresh(&key, &mut cached);
    assert_eq!(cached.events.len(), 3);

    // The service is redeployed: new poller, fresh log from index 0.
    registry.remove(&first_id);
    let second_log = Arc::new(EventLogContainer::new(&HashMap::from([(
        "web".to_string(),
        1,
    )])));
    second_log.append("web", Some(0), "new step 0".to_string());
    registry
        .register(Arc::new(PollerHandle::new(
            Uuid::new_v4(),
            "shop".to_string(),
            "web".to_string(),
            false,
            second_log,
        )))
        .unwrap();

    tokio::time::advance(Duration::from_millis(600)).await;
    cache.refresh(&key, &mut cached);

    assert_eq!(cached.events.len(), 1);
    assert_eq!(cached.events[0].description, "new step 0");
    assert_eq!(cached.events[0].sequence_index, 0);
}

#[tokio::test]
async fn test_first_access_creates_empty_entry() {
    let registry = Arc::new(PollingRegistry::new());
    let cache = EventsCache::new(registry, cache_options());
    assert!(cache.is_empty());

    let key = EventsCacheKey::new("shop", "web");
    let entry = cache.get(&key);
    assert!(entry.lock().await.events.is_empty());
    assert_eq!(cache.len(), 1);

    // Same entry on repeat access.
    let again = cache.get(&key);
    assert!(Arc::ptr_eq(&entry, &again));
}
