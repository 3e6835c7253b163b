//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Check the backend pool is usable at all
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::BalancerConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("backend pool is empty; at least one backend is required")]
    EmptyBackendPool,

    #[error("backend with port {0} has an empty or invalid hostname")]
    InvalidBackendHostname(u16),

    #[error("backend {hostname}:{port} has port 0")]
    InvalidBackendPort { hostname: String, port: u16 },

    #[error("backend {hostname}:{port} has max_connections 0")]
    ZeroBackendConnections { hostname: String, port: u16 },

    #[error("health_check.interval_ms must be greater than 0")]
    ZeroProbeInterval,

    #[error("health_check.timeout_ms must be greater than 0")]
    ZeroProbeTimeout,

    #[error("health_check.timeout_ms ({timeout_ms}) must be below interval_ms ({interval_ms})")]
    ProbeTimeoutExceedsInterval { timeout_ms: u64, interval_ms: u64 },

    #[error("health_check.path {0:?} must start with '/'")]
    InvalidProbePath(String),

    #[error("observability.metrics_address {0:?} is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::EmptyBackendPool);
    }
    for backend in &config.backends {
        if url::Url::parse(&format!("http://{}:{}", backend.hostname, backend.port)).is_err() {
            errors.push(ValidationError::InvalidBackendHostname(backend.port));
        }
        if backend.port == 0 {
            errors.push(ValidationError::InvalidBackendPort {
                hostname: backend.hostname.clone(),
                port: backend.port,
            });
        }
        if backend.max_connections == 0 {
            errors.push(ValidationError::ZeroBackendConnections {
                hostname: backend.hostname.clone(),
                port: backend.port,
            });
        }
    }

    let hc = &config.health_check;
    if hc.interval_ms == 0 {
        errors.push(ValidationError::ZeroProbeInterval);
    }
    if hc.timeout_ms == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }
    if hc.interval_ms > 0 && hc.timeout_ms >= hc.interval_ms {
        errors.push(ValidationError::ProbeTimeoutExceedsInterval {
            timeout_ms: hc.timeout_ms,
            interval_ms: hc.interval_ms,
        });
    }
    if !hc.path.starts_with('/') {
        errors.push(ValidationError::InvalidProbePath(hc.path.clone()));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&BalancerConfig::default()).is_ok());
    }

    #[test]
    fn empty_pool_is_rejected() {
        let mut config = BalancerConfig::default();
        config.backends.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyBackendPool));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = BalancerConfig::default();
        config.listener.bind_address = "not-an-addr".into();
        config.backends.clear();
        config.health_check.interval_ms = 0;
        config.health_check.path = "health".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 4, "expected every problem reported: {errors:?}");
    }

    #[test]
    fn probe_timeout_must_fit_inside_interval() {
        let mut config = BalancerConfig::default();
        config.health_check.interval_ms = 1_000;
        config.health_check.timeout_ms = 2_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::ProbeTimeoutExceedsInterval { .. }
        ));
    }
}
