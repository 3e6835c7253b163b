//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → pool.rs (fixed registry of backends)
//!     → round_robin.rs (bounded health-aware rotation)
//!     → backend.rs (health flag, connection slot)
//!     → Return backend or explicit "no healthy backend"
//! ```
//!
//! # Design Decisions
//! - Pool membership is fixed at startup; only health flags mutate
//! - Selection budget is 2 × pool length, so an all-unhealthy pool
//!   terminates instead of spinning
//! - The cursor advances on every inspection and is never reset
//! - Per-backend connection caps queue excess requests via semaphore

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::{BackendPool, PoolError};
