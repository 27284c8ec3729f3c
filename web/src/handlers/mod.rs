//! HTTP request handlers.
//!
//! Operational endpoints that sit next to pipeline routes.

pub mod health;

pub use health::{health_check, metrics_route};
