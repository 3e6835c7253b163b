//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! balancer. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so a minimal (or empty)
//! config file works.

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Backend server pool. Ordered: rotation follows this order.
    pub backends: Vec<BackendConfig>,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Outbound connection pool settings.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            // Canonical local topology: three backends on consecutive ports.
            backends: vec![
                BackendConfig::new("localhost", 3001),
                BackendConfig::new("localhost", 3002),
                BackendConfig::new("localhost", 3003),
            ],
            health_check: HealthCheckConfig::default(),
            upstream: UpstreamConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum inbound body size in bytes. Bodies are buffered in full
    /// before forwarding.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// A single backend server in the pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend hostname (resolved at connect time).
    pub hostname: String,

    /// Backend port.
    pub port: u16,

    /// Maximum concurrent outbound connections to this backend. Excess
    /// requests queue until a slot frees up.
    #[serde(default = "default_max_backend_conns")]
    pub max_connections: usize,
}

impl BackendConfig {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            max_connections: default_max_backend_conns(),
        }
    }
}

fn default_max_backend_conns() -> usize {
    50
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic prober.
    pub enabled: bool,

    /// Probe period in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds. A probe still in flight when
    /// this elapses is aborted and counts as unhealthy.
    pub timeout_ms: u64,

    /// Path probed on each backend.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 10_000,
            timeout_ms: 2_000,
            path: "/health".to_string(),
        }
    }
}

/// Outbound connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// How long an idle keep-alive connection to a backend is retained,
    /// in seconds.
    pub keepalive_idle_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            keepalive_idle_secs: 45,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// End-to-end inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
