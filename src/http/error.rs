//! Forwarding error taxonomy and client-facing status mapping.
//!
//! Every variant is fully handled at the forwarder boundary; upstream
//! error details go to the log, never to the client.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors produced while forwarding a request to a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Selection exhausted its budget without a healthy backend.
    #[error("no healthy backend available")]
    NoHealthyBackend,

    /// Outbound connection could not be established, or was reset
    /// before a response began.
    #[error("upstream connect error: {0}")]
    UpstreamConnect(#[source] hyper_util::client::legacy::Error),

    /// Failure while reading the backend's response body, after the
    /// response headers were already received.
    #[error("upstream response error: {0}")]
    UpstreamResponse(#[source] axum::Error),
}

impl ForwardError {
    /// The status code this error maps to on the client side.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::NoHealthyBackend => StatusCode::SERVICE_UNAVAILABLE,
            ForwardError::UpstreamConnect(_) => StatusCode::BAD_GATEWAY,
            ForwardError::UpstreamResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        match self {
            ForwardError::NoHealthyBackend => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "15")],
                "No healthy servers available\n",
            )
                .into_response(),
            ForwardError::UpstreamConnect(_) => {
                (StatusCode::BAD_GATEWAY, "Bad Gateway\n").into_response()
            }
            // Transport internals stay out of the client response.
            ForwardError::UpstreamResponse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
