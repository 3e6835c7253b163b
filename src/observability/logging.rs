//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Level comes from config, overridable via `RUST_LOG`
//! - Initialized once at startup, before any subsystem runs

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to
/// this crate and the HTTP middleware.
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "balancer={level},tower_http={level}"
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
