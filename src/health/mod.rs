//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probes (active.rs):
//!     Periodic timer (no overlapping cycles)
//!     → GET /health on every backend, concurrently
//!     → Backend::set_healthy from each outcome
//!
//! Fast reaction (forwarder):
//!     Outbound connect failure
//!     → Backend::set_healthy(false) immediately
//!     → healed only by the next successful probe
//! ```
//!
//! # Design Decisions
//! - One probe outcome flips the flag; no hysteresis
//! - Exactly 200 counts as healthy
//! - Probe failures never escape the monitor

pub mod active;

pub use active::HealthMonitor;
