//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's health endpoint
//! - Update backend health flags from probe outcomes
//!
//! # Design Decisions
//! - Probes for different backends run concurrently; a cycle settles
//!   fully before the next tick is scheduled (no overlapping cycles)
//! - A single probe outcome flips the flag in either direction; there
//!   is no consecutive-failure threshold
//! - Probe errors are logged and never propagate; only shutdown stops
//!   the monitor

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::join_all;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::{Backend, BackendPool};

/// Periodic prober that owns the authoritative health verdicts.
pub struct HealthMonitor {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(
        pool: Arc<BackendPool>,
        config: HealthCheckConfig,
        client: Client<HttpConnector, Body>,
    ) -> Self {
        Self {
            pool,
            config,
            client,
        }
    }

    /// Run probe cycles until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
        // A slow cycle delays the next tick rather than stacking cycles.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting");
                    break;
                }
            }
        }
    }

    /// Probe every backend concurrently and wait for all outcomes.
    async fn check_all(&self) {
        tracing::debug!(pool_size = self.pool.len(), "Running health checks");
        let probes = self
            .pool
            .backends()
            .iter()
            .map(|backend| self.probe(backend));
        join_all(probes).await;
    }

    /// Probe one backend and apply the outcome to its health flag.
    async fn probe(&self, backend: &Arc<Backend>) {
        let healthy = probe_backend(&self.client, backend, &self.config).await;
        backend.set_healthy(healthy);
    }
}

/// Issue a single GET probe and map its outcome to a health verdict.
///
/// Exactly 200 counts as healthy. Timeouts drop the in-flight request
/// future, which aborts the probe connection.
pub async fn probe_backend(
    client: &Client<HttpConnector, Body>,
    backend: &Backend,
    config: &HealthCheckConfig,
) -> bool {
    let uri = format!("{}{}", backend.base_url, config.path.trim_start_matches('/'));

    let request = match Request::builder()
        .method("GET")
        .uri(uri)
        .header("user-agent", "balancer-health-check")
        .body(Body::empty())
    {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(backend = %backend.authority(), error = %e, "Failed to build probe request");
            return false;
        }
    };

    let timeout = Duration::from_millis(config.timeout_ms);
    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => {
            let healthy = response.status() == StatusCode::OK;
            if !healthy {
                tracing::warn!(
                    backend = %backend.authority(),
                    status = %response.status(),
                    "Health check failed: non-200 status"
                );
            }
            healthy
        }
        Ok(Err(e)) => {
            tracing::warn!(
                backend = %backend.authority(),
                error = %e,
                "Health check failed: transport error"
            );
            false
        }
        Err(_) => {
            tracing::warn!(
                backend = %backend.authority(),
                timeout_ms = config.timeout_ms,
                "Health check timed out; marking backend unhealthy"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use hyper_util::rt::TokioExecutor;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client() -> Client<HttpConnector, Body> {
        Client::builder(TokioExecutor::new()).build(HttpConnector::new())
    }

    fn config(timeout_ms: u64) -> HealthCheckConfig {
        HealthCheckConfig {
            timeout_ms,
            ..HealthCheckConfig::default()
        }
    }

    /// Serve one connection with a fixed raw HTTP response.
    async fn one_shot_server(status_line: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn status_200_is_healthy() {
        let addr = one_shot_server("200 OK").await;
        let backend = Backend::new(&BackendConfig::new("127.0.0.1", addr.port()));
        assert!(probe_backend(&client(), &backend, &config(1_000)).await);
    }

    #[tokio::test]
    async fn non_200_status_is_unhealthy() {
        let addr = one_shot_server("503 Service Unavailable").await;
        let backend = Backend::new(&BackendConfig::new("127.0.0.1", addr.port()));
        assert!(!probe_backend(&client(), &backend, &config(1_000)).await);
    }

    #[tokio::test]
    async fn refused_connection_is_unhealthy() {
        // Bind then drop, so the port is closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = Backend::new(&BackendConfig::new("127.0.0.1", addr.port()));
        assert!(!probe_backend(&client(), &backend, &config(1_000)).await);
    }

    #[tokio::test]
    async fn timeout_is_unhealthy() {
        // Accepts but never responds.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(5)).await;
                drop(socket);
            }
        });

        let backend = Backend::new(&BackendConfig::new("127.0.0.1", addr.port()));
        assert!(!probe_backend(&client(), &backend, &config(100)).await);
    }
}
