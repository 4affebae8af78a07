//! Client-side access to the lifecycle API
//!
//! `RestClient` speaks to the server; `LifecycleEventsLatch` blocks a
//! caller until a tracked deployment completes, with an explicit,
//! resumable continuation path across timeouts.

pub mod latch;
pub mod rest;
