//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track health state (healthy/unhealthy)
//! - Enforce the per-backend outbound connection cap

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::config::BackendConfig;
use crate::observability::metrics;

/// A single backend server.
///
/// Identity is `(hostname, port)` and is immutable for the process
/// lifetime; the health flag is the only mutable field.
#[derive(Debug)]
pub struct Backend {
    /// Backend hostname.
    pub hostname: String,
    /// Backend port.
    pub port: u16,
    /// Pre-calculated base URL, used to build probe and forward URIs.
    pub base_url: Url,
    /// Maximum concurrent outbound connections allowed.
    pub max_connections: usize,

    /// Current health state. Starts healthy; flipped by the prober in
    /// both directions and by the forwarder on connect failure
    /// (downgrade only).
    healthy: AtomicBool,
    /// Outbound connection slots. Acquiring a permit queues when the
    /// cap is reached rather than exceeding it.
    conn_slots: Arc<Semaphore>,
}

impl Backend {
    /// Create a new backend from its configuration.
    pub fn new(config: &BackendConfig) -> Self {
        // Hostname and port come from validated config, so the URL
        // cannot fail to parse.
        let base_url = Url::parse(&format!("http://{}:{}", config.hostname, config.port))
            .expect("validated hostname:port always forms a URL");
        Self {
            hostname: config.hostname.clone(),
            port: config.port,
            base_url,
            max_connections: config.max_connections,
            healthy: AtomicBool::new(true),
            conn_slots: Arc::new(Semaphore::new(config.max_connections)),
        }
    }

    /// The `host:port` authority string for this backend.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// Return true if the backend is currently considered healthy.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Update the health flag. Idempotent: logs and records the
    /// transition only when the value actually changes.
    pub fn set_healthy(&self, healthy: bool) {
        let previous = self.healthy.swap(healthy, Ordering::Relaxed);
        if previous != healthy {
            tracing::info!(
                backend = %self.authority(),
                healthy,
                "Backend health transition"
            );
            metrics::record_backend_health(&self.authority(), healthy);
        }
    }

    /// Acquire an outbound connection slot, waiting if the cap is
    /// reached. The permit is released when dropped.
    pub async fn acquire_slot(self: &Arc<Self>) -> OwnedSemaphorePermit {
        self.conn_slots
            .clone()
            .acquire_owned()
            .await
            .expect("connection semaphore is never closed")
    }

    /// Number of currently free outbound connection slots.
    pub fn available_slots(&self) -> usize {
        self.conn_slots.available_permits()
    }
}
