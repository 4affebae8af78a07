//! Data models shared between the server and the REST client

pub mod deployment;
pub mod event;
