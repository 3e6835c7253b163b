//! Health-checking HTTP load balancer.
//!
//! Distributes inbound requests across a fixed pool of backends via
//! health-aware round robin, probes backend liveness on a fixed
//! interval, and rewrites hop-by-hop and forwarding headers on the way
//! through.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
