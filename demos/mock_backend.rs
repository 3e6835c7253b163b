//! Minimal backend server for exercising the balancer locally.
//!
//! Run a few of these on consecutive ports, then start the balancer:
//!
//! ```text
//! cargo run --example mock_backend 3001
//! cargo run --example mock_backend 3002
//! cargo run --example mock_backend 3003
//! cargo run
//! ```

use axum::{extract::Json, http::StatusCode, routing::get, routing::post, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(3001);

    let app = Router::new()
        .route(
            "/",
            get(move || async move { format!("Hello from backend on port {port}\n") }),
        )
        .route("/health", get(|| async { StatusCode::OK }))
        .route(
            "/echo",
            post(move |Json(body): Json<Value>| async move {
                Json(json!({ "port": port, "received": body }))
            }),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Mock backend listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
