//! Staleness-bounded cache of deployment lifecycle events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::events::registry::PollingRegistry;
use crate::models::event::LifecycleEvent;

/// Cache options
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Minimum interval between refreshes of one entry; bounds load on
    /// the underlying event log regardless of request volume
    pub min_refresh_interval: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            min_refresh_interval: Duration::from_millis(500),
        }
    }
}

/// Identifies one cache entry; duplicate insert overwrites
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventsCacheKey {
    pub application_name: String,
    pub service_name: String,
}

impl EventsCacheKey {
    pub fn new(application_name: &str, service_name: &str) -> Self {
        Self {
            application_name: application_name.to_string(),
            service_name: service_name.to_string(),
        }
    }
}

impl std::fmt::Display for EventsCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.application_name, self.service_name)
    }
}

/// Cached snapshot of one deployment's events.
///
/// `events` is always a prefix-consistent snapshot of the source log;
/// `last_refreshed` is updated only while the guard is held, atomically
/// with the events it describes.
pub struct CachedEvents {
    pub events: Vec<LifecycleEvent>,
    pub last_refreshed: Option<Instant>,
    /// Deployment whose log the snapshot was read from; a new
    /// deployment of the same service resets the snapshot
    pub source_deployment: Option<Uuid>,
}

/// One cache entry behind its mutual-exclusion guard
pub struct EventsCacheValue {
    guard: AsyncMutex<CachedEvents>,
}

impl EventsCacheValue {
    fn new() -> Self {
        Self {
            guard: AsyncMutex::new(CachedEvents {
                events: Vec::new(),
                last_refreshed: None,
                source_deployment: None,
            }),
        }
    }

    /// Acquire the entry guard for a read-then-maybe-refresh sequence
    pub async fn lock(&self) -> MutexGuard<'_, CachedEvents> {
        self.guard.lock().await
    }
}

/// Mapping from deployment-scoped key to a timestamped events snapshot.
///
/// Entries are created empty on first access and only ever grow: a
/// refresh appends the source log's suffix, never rewriting the cached
/// prefix. Refreshes for one key are serialized by the entry guard and
/// rate-limited; different keys proceed fully in parallel.
pub struct EventsCache {
    entries: Mutex<HashMap<EventsCacheKey, Arc<EventsCacheValue>>>,
    registry: Arc<PollingRegistry>,
    min_refresh_interval: Duration,
}

impl EventsCache {
    pub fn new(registry: Arc<PollingRegistry>, options: CacheOptions) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            registry,
            min_refresh_interval: options.min_refresh_interval,
        }
    }

    /// Get the entry for a key, creating an empty one on first access.
    /// Never returns a missing entry.
    pub fn get(&self, key: &EventsCacheKey) -> Arc<EventsCacheValue> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(EventsCacheValue::new()))
            .clone()
    }

    /// Re-read the source event log into the cached snapshot.
    ///
    /// The caller must hold the entry guard. A no-op inside the
    /// rate-limit window, and when no poller is tracking the key.
    /// Returns whether a refresh actually happened.
    pub fn refresh(&self, key: &EventsCacheKey, cached: &mut CachedEvents) -> bool {
        if let Some(at) = cached.last_refreshed {
            if at.elapsed() < self.min_refresh_interval {
                debug!(key = %key, "Cache refresh skipped, within rate limit window");
                return false;
            }
        }

        let Some(handle) = self
            .registry
            .find_by_service(&key.application_name, &key.service_name)
        else {
            debug!(key = %key, "No poller for key, nothing to refresh");
            cached.last_refreshed = Some(Instant::now());
            return false;
        };

        // A new deployment of the same service starts a fresh log at
        // index 0; the old snapshot does not describe it.
        if cached.source_deployment != Some(handle.deployment_id) {
            cached.events.clear();
            cached.source_deployment = Some(handle.deployment_id);
        }

        // The container read acquires and releases its own lock inside
        // the call; the entry guard is the only lock held across this
        // sequence. Append-only: the cached prefix is never rewritten.
        let suffix = handle.container().events_from(cached.events.len() as u64);
        if !suffix.is_empty() {
            debug!(key = %key, appended = suffix.len(), "Cache refreshed");
        }
        cached.events.extend(suffix);
        cached.last_refreshed = Some(Instant::now());
        true
    }

    /// Number of cache entries
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
