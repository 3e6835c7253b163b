//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (timeout, tracing)
//! - Own the shared outbound client and the backend pool
//! - Spawn the health monitor
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::BalancerConfig;
use crate::health::HealthMonitor;
use crate::http::error::ForwardError;
use crate::http::request::build_upstream_request;
use crate::http::response::relay_response;
use crate::load_balancer::{BackendPool, PoolError};
use crate::observability::metrics;

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<BackendPool>,
    pub client: Client<HttpConnector, Body>,
    pub max_body_bytes: usize,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<BackendPool>,
    client: Client<HttpConnector, Body>,
}

impl HttpServer {
    /// Create a new server from validated configuration.
    ///
    /// Fails fast if the backend pool is empty.
    pub fn new(config: BalancerConfig) -> Result<Self, PoolError> {
        let pool = Arc::new(BackendPool::from_config(&config.backends)?);

        // One pooled client shared by the forwarder and the prober.
        // Keep-alive reuse is bounded by the idle window; per-backend
        // concurrency is bounded by the backend's connection slots.
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.upstream.keepalive_idle_secs))
            .build(HttpConnector::new());

        let state = AppState {
            pool: pool.clone(),
            client: client.clone(),
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            pool,
            client,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &BalancerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener,
    /// until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            pool_size = self.pool.len(),
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(
                self.pool.clone(),
                self.config.health_check.clone(),
                self.client.clone(),
            );
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}

/// Main proxy handler: selects a backend and forwards the request.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // Buffer the inbound body before touching the pool: a rejected body
    // should not advance the rotation.
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to buffer request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let Some(backend) = state.pool.next() else {
        metrics::record_request(&method, 503, "none", start);
        return ForwardError::NoHealthyBackend.into_response();
    };
    let backend_authority = backend.authority();

    // Queues when the per-backend cap is reached; released on return.
    let _slot = backend.acquire_slot().await;

    let outbound = match build_upstream_request(
        &parts,
        body_bytes,
        &backend,
        client_addr.ip(),
        &request_id,
    ) {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream request");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        backend = %backend_authority,
        "Forwarding request"
    );

    match state.client.request(outbound).await {
        Ok(response) => {
            let status = response.status();
            match relay_response(response.map(Body::new)).await {
                Ok(relayed) => {
                    tracing::debug!(
                        request_id = %request_id,
                        backend = %backend_authority,
                        status = %status,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Backend responded"
                    );
                    metrics::record_request(&method, status.as_u16(), &backend_authority, start);
                    relayed
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        backend = %backend_authority,
                        error = %e,
                        "Error reading backend response body"
                    );
                    metrics::record_request(&method, 500, &backend_authority, start);
                    e.into_response()
                }
            }
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                backend = %backend_authority,
                error = %e,
                "Upstream connection failed; marking backend unhealthy"
            );
            // Fast reaction, ahead of the next probe cycle. Healed only
            // by a later successful probe.
            backend.set_healthy(false);
            metrics::record_request(&method, 502, &backend_authority, start);
            ForwardError::UpstreamConnect(e).into_response()
        }
    }
}
