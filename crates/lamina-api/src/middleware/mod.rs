//! # Middleware Stack
//!
//! Tower middleware for the gateway:
//! - [`access_log`]: one access event per request, emitted under a fixed
//!   target the sink-side noise filter can match on.
//! - [`metrics`]: Prometheus-compatible request metrics.

pub mod access_log;
pub mod metrics;
