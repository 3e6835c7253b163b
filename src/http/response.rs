//! Backend response relay.
//!
//! # Responsibilities
//! - Buffer the backend's response body in full before relaying
//! - Copy status and headers verbatim, minus the backend's signature
//!   header
//!
//! # Design Decisions
//! - Full buffering means the client response is never committed before
//!   the body is complete, so a mid-body upstream failure can still map
//!   to a clean 500

use axum::body::Body;
use axum::http::Response;

use crate::http::error::ForwardError;

/// The backend framework's signature header, stripped from relayed
/// responses.
pub const BACKEND_SIGNATURE_HEADER: &str = "x-powered-by";

/// Collect the backend response and prepare it for the client.
///
/// A failure while reading the body maps to `UpstreamResponse`; the
/// status and headers received so far are discarded.
pub async fn relay_response(response: Response<Body>) -> Result<Response<Body>, ForwardError> {
    let (mut parts, body) = response.into_parts();
    parts.headers.remove(BACKEND_SIGNATURE_HEADER);

    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(ForwardError::UpstreamResponse)?;

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
