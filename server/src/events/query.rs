//! Ranged, best-effort read path over the events cache

use std::sync::Arc;

use tracing::debug;

use crate::events::cache::{EventsCache, EventsCacheKey};
use crate::models::event::LifecycleEvent;

/// Page-size ceiling substituted when a query leaves `to` unset
pub const MAX_EVENTS_PER_QUERY: u64 = 100;

/// Serves `[from, to)` event range queries from the cache, refreshing
/// it (subject to the rate limit) when the range is not yet satisfied.
///
/// Best-effort by contract: the response may hold fewer events than
/// requested if the orchestrator has not produced them yet or the rate
/// limit blocked a refresh. Callers must not assume completeness, and
/// an empty result is not an error.
pub struct EventsQueryService {
    cache: Arc<EventsCache>,
}

impl EventsQueryService {
    pub fn new(cache: Arc<EventsCache>) -> Self {
        Self { cache }
    }

    /// Events with `sequence_index` in `[from, to)`, ascending.
    /// An unset `to` defaults to `from + MAX_EVENTS_PER_QUERY`.
    pub async fn query(
        &self,
        key: &EventsCacheKey,
        from: u64,
        to: Option<u64>,
    ) -> Vec<LifecycleEvent> {
        let to = to.unwrap_or_else(|| from.saturating_add(MAX_EVENTS_PER_QUERY));
        debug!(key = %key, from, to, "Received events range query");

        let value = self.cache.get(key);

        // Hold the entry guard for the whole decide-refresh-slice
        // sequence so a refresh cannot be observed half-applied.
        let mut cached = value.lock().await;
        if events_present(&cached.events, from, to) {
            debug!(key = %key, "All requested events already cached");
        } else {
            self.cache.refresh(key, &mut cached);
        }

        extract_desired_events(&cached.events, from, to)
    }
}

/// Whether the cached sequence already satisfies `[from, to)`.
///
/// Cached events are a contiguous prefix starting at index 0, so the
/// range is satisfied exactly when the snapshot reaches `to - 1`.
fn events_present(events: &[LifecycleEvent], from: u64, to: u64) -> bool {
    if to <= from {
        return true;
    }
    match events.last() {
        Some(last) => last.sequence_index >= to - 1,
        None => false,
    }
}

/// The contiguous slice of events with `sequence_index` in `[from, to)`
fn extract_desired_events(events: &[LifecycleEvent], from: u64, to: u64) -> Vec<LifecycleEvent> {
    events
        .iter()
        .filter(|e| e.sequence_index >= from && e.sequence_index < to)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(sequence_index: u64) -> LifecycleEvent {
        LifecycleEvent {
            sequence_index,
            service_name: "web".to_string(),
            instance_id: None,
            description: format!("event {}", sequence_index),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_events_present_empty_cache() {
        assert!(!events_present(&[], 0, 10));
        // An empty range is trivially satisfied.
        assert!(events_present(&[], 5, 5));
        assert!(events_present(&[], 5, 3));
    }

    #[test]
    fn test_events_present_boundary() {
        let events: Vec<_> = (0..5).map(event).collect();
        assert!(events_present(&events, 0, 5));
        assert!(events_present(&events, 2, 4));
        assert!(!events_present(&events, 0, 6));
        assert!(!events_present(&events, 10, 12));
    }

    #[test]
    fn test_extract_respects_bounds_and_order() {
        let events: Vec<_> = (0..10).map(event).collect();
        let slice = extract_desired_events(&events, 3, 7);
        assert_eq!(slice.len(), 4);
        assert!(slice.windows(2).all(|w| w[0].sequence_index < w[1].sequence_index));
        assert!(slice.iter().all(|e| e.sequence_index >= 3 && e.sequence_index < 7));
    }

    #[test]
    fn test_extract_empty_range_is_not_an_error() {
        let events: Vec<_> = (0..3).map(event).collect();
        assert!(extract_desired_events(&events, 5, 10).is_empty());
        assert!(extract_desired_events(&events, 2, 2).is_empty());
    }
}
