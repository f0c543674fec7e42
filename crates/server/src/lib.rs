//! HTTP and WebSocket surface over the niluflix download manager.

pub mod api;
pub mod metrics;
pub mod state;
