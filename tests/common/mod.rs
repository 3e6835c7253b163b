//! Shared mock backends for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::IntoResponse;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a raw-TCP backend that answers every request with a fixed 200
/// response. Returns the bound address.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, response.to_string()) }).await
}

/// Start a raw-TCP backend whose status/body are produced per request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start an axum backend that echoes selected request headers and the
/// body as JSON, with an `X-Powered-By` signature the balancer is
/// expected to strip.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(request: Request<Body>) -> impl IntoResponse {
        let (parts, body) = request.into_parts();
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

        let payload = serde_json::json!({
            "host": header("host"),
            "connection": header("connection"),
            "x-forwarded-for": header("x-forwarded-for"),
            "x-forwarded-proto": header("x-forwarded-proto"),
            "x-forwarded-host": header("x-forwarded-host"),
            "x-request-id": header("x-request-id"),
            "foo": header("foo"),
            "body": String::from_utf8_lossy(&body),
        });

        (
            [
                ("x-powered-by", "Express"),
                ("x-backend-tag", "echo"),
                ("content-type", "application/json"),
            ],
            payload.to_string(),
        )
    }

    let app = Router::new().fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
