//! Lifeline - deployment lifecycle event coordination
//!
//! Tracks service deployments against an orchestrator backend: a
//! per-deployment poller records lifecycle events into an append-only
//! log, a staleness-bounded cache serves best-effort range queries,
//! and a client-side latch lets callers wait for completion with
//! resumable timeouts.

pub mod app;
pub mod client;
pub mod errors;
pub mod events;
pub mod logs;
pub mod models;
pub mod orchestrator;
pub mod repo;
pub mod server;
