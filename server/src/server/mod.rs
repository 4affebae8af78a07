//! HTTP server for the deployment lifecycle API

pub mod handlers;
pub mod serve;
pub mod state;
