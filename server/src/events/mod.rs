//! Lifecycle event accumulation and delivery
//!
//! One `EventLogContainer` per deployment accumulates ordered events,
//! fed by a background `DeploymentPoller` and served to clients through
//! the staleness-bounded `EventsCache` and `EventsQueryService`.

pub mod cache;
pub mod container;
pub mod poller;
pub mod query;
pub mod registry;
