//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, proxy handler)
//!     → load balancer picks a healthy backend
//!     → request.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → pooled client call to the backend
//!     → response.rs (buffer, strip signature header)
//!     → Send to client (or error.rs maps the failure)
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::ForwardError;
pub use server::HttpServer;
