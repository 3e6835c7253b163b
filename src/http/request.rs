//! Upstream request construction.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers, including those named by the inbound
//!   `Connection` header
//! - Inject the `X-Forwarded-*` family and the request ID
//! - Rewrite the URI to target the selected backend
//!
//! # Design Decisions
//! - Exclusion is a case-insensitive set: the fixed hop-by-hop list
//!   extended by the inbound `Connection` tokens
//! - The inbound body is buffered and forwarded verbatim
//! - The outbound connection is always `keep-alive` so the client pool
//!   can reuse it

use std::collections::HashSet;
use std::net::IpAddr;

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderValue, Request};

use crate::load_balancer::Backend;

/// Headers that are meaningful only for a single connection and must
/// not be forwarded across the proxy.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
];

/// The full exclusion set for an inbound request: the fixed hop-by-hop
/// list plus every token named in its `Connection` header value(s).
fn excluded_headers(parts: &Parts) -> HashSet<String> {
    let mut excluded: HashSet<String> =
        HOP_BY_HOP_HEADERS.iter().map(|h| h.to_string()).collect();

    for value in parts.headers.get_all(header::CONNECTION) {
        if let Ok(value) = value.to_str() {
            excluded.extend(
                value
                    .split(',')
                    .map(|token| token.trim().to_ascii_lowercase())
                    .filter(|token| !token.is_empty()),
            );
        }
    }
    excluded
}

/// Build the outbound request for the selected backend from the
/// buffered inbound request.
pub fn build_upstream_request(
    parts: &Parts,
    body: Bytes,
    backend: &Backend,
    client_ip: IpAddr,
    request_id: &str,
) -> Result<Request<Body>, axum::http::Error> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = format!("http://{}{}", backend.authority(), path_and_query);

    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .version(axum::http::Version::HTTP_11);

    let excluded = excluded_headers(parts);
    if let Some(headers) = builder.headers_mut() {
        // Host is dropped: the backend sees its own authority.
        for (name, value) in parts.headers.iter() {
            if name == header::HOST || excluded.contains(name.as_str()) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        // Append this hop to the forwarding chain.
        let forwarded_for = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing},{client_ip}"),
            None => client_ip.to_string(),
        };
        headers.insert("x-forwarded-for", HeaderValue::from_str(&forwarded_for)?);

        let scheme = parts.uri.scheme_str().unwrap_or("http");
        headers.insert("x-forwarded-proto", HeaderValue::from_str(scheme)?);

        if let Some(host) = parts.headers.get(header::HOST) {
            headers.insert("x-forwarded-host", host.clone());
        }

        headers.insert("x-request-id", HeaderValue::from_str(request_id)?);
    }

    builder.body(Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn backend() -> Backend {
        Backend::new(&BackendConfig::new("localhost", 3001))
    }

    fn inbound(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    fn client_ip() -> IpAddr {
        "2.2.2.2".parse().unwrap()
    }

    #[test]
    fn strips_hop_by_hop_and_connection_named_headers() {
        let parts = inbound(
            Request::builder()
                .uri("/api?x=1")
                .header("connection", "foo, Bar")
                .header("foo", "x")
                .header("bar", "y")
                .header("te", "trailers")
                .header("accept", "application/json"),
        );

        let request =
            build_upstream_request(&parts, Bytes::new(), &backend(), client_ip(), "rid-1")
                .unwrap();
        let headers = request.headers();

        assert!(headers.get("foo").is_none());
        assert!(headers.get("bar").is_none());
        assert!(headers.get("te").is_none());
        assert_eq!(headers.get("connection").unwrap(), "keep-alive");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn drops_host_and_sets_forwarding_headers() {
        let parts = inbound(Request::builder().uri("/").header("host", "example.com"));

        let request =
            build_upstream_request(&parts, Bytes::new(), &backend(), client_ip(), "rid-1")
                .unwrap();
        let headers = request.headers();

        assert!(headers.get("host").is_none());
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "2.2.2.2");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "example.com");
        assert_eq!(headers.get("x-request-id").unwrap(), "rid-1");
    }

    #[test]
    fn appends_client_ip_to_existing_forwarded_for() {
        let parts = inbound(Request::builder().uri("/").header("x-forwarded-for", "1.1.1.1"));

        let request =
            build_upstream_request(&parts, Bytes::new(), &backend(), client_ip(), "rid-1")
                .unwrap();

        assert_eq!(
            request.headers().get("x-forwarded-for").unwrap(),
            "1.1.1.1,2.2.2.2"
        );
    }

    #[test]
    fn rewrites_uri_to_backend_preserving_path_and_query() {
        let parts = inbound(Request::builder().method("POST").uri("/items/7?full=true"));

        let request =
            build_upstream_request(&parts, Bytes::from("{}"), &backend(), client_ip(), "rid-1")
                .unwrap();

        assert_eq!(request.uri(), "http://localhost:3001/items/7?full=true");
        assert_eq!(request.method(), "POST");
    }

    #[test]
    fn missing_host_means_no_forwarded_host() {
        let parts = inbound(Request::builder().uri("/"));

        let request =
            build_upstream_request(&parts, Bytes::new(), &backend(), client_ip(), "rid-1")
                .unwrap();

        assert!(request.headers().get("x-forwarded-host").is_none());
    }
}
