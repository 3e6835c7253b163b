//! Observability subsystem: structured logging and Prometheus metrics.
//!
//! Both are side-effect sinks; nothing in the request or probe path
//! depends on them for correctness.

pub mod logging;
pub mod metrics;
