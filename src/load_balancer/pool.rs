//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the fixed, ordered set of backends built at startup
//! - Select the next healthy backend via round robin
//! - Expose the pool to the health prober

use std::sync::Arc;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};

/// Error constructing a backend pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Zero backends makes every selection fail; reject at startup.
    #[error("backend pool is empty; at least one backend is required")]
    Empty,
}

/// The fixed registry of backends plus the rotation state.
///
/// Membership never changes at runtime; only the per-backend health
/// flags and the rotation cursor mutate.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    selector: RoundRobin,
}

impl BackendPool {
    /// Build the pool from configuration. Fails fast on an empty pool.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, PoolError> {
        if configs.is_empty() {
            return Err(PoolError::Empty);
        }

        let backends = configs
            .iter()
            .map(|config| Arc::new(Backend::new(config)))
            .collect();

        Ok(Self {
            backends,
            selector: RoundRobin::new(),
        })
    }

    /// Select the next healthy backend, advancing the rotation cursor.
    pub fn next(&self) -> Option<Arc<Backend>> {
        let backend = self.selector.next_backend(&self.backends);
        if backend.is_none() {
            tracing::warn!(
                pool_size = self.backends.len(),
                "No healthy backend available"
            );
        }
        backend
    }

    /// Ordered read-only view of the pool (used by the health prober).
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Number of backends in the pool.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
