//! Round-robin selection with a bounded scan.
//!
//! The cursor advances by exactly one per inspected candidate and is
//! never reset, so rotation stays approximately even across healthy
//! backends and a fully-unhealthy pool terminates after a fixed budget
//! of `2 × pool_len` advances instead of looping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Health-aware round-robin selector.
///
/// The rotation cursor persists across calls, including calls that find
/// no healthy backend.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the next healthy backend.
    ///
    /// Inspects at most `2 × backends.len()` candidates, advancing the
    /// cursor once per inspection regardless of outcome. Returns `None`
    /// when the budget is exhausted without a healthy candidate.
    pub fn next_backend(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let len = backends.len();
        let budget = len * 2;

        for _ in 0..budget {
            // One atomic step per inspection: read-then-advance.
            let position = self.cursor.fetch_add(1, Ordering::Relaxed);
            let backend = &backends[position % len];
            if backend.is_healthy() {
                return Some(backend.clone());
            }
        }
        None
    }

    /// Current cursor position modulo the given pool length.
    pub fn position(&self, len: usize) -> usize {
        self.cursor.load(Ordering::Relaxed) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn pool(n: u16) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| Arc::new(Backend::new(&BackendConfig::new("localhost", 3001 + i))))
            .collect()
    }

    #[test]
    fn wraps_around_after_full_rotation() {
        let backends = pool(3);
        let lb = RoundRobin::new();

        let visited: Vec<u16> = (0..4)
            .map(|_| lb.next_backend(&backends).unwrap().port)
            .collect();

        // Each backend visited once, then back to the first.
        assert_eq!(visited, vec![3001, 3002, 3003, 3001]);
    }

    #[test]
    fn skips_unhealthy_preserving_relative_order() {
        let backends = pool(3);
        backends[1].set_healthy(false);
        let lb = RoundRobin::new();

        let visited: Vec<u16> = (0..4)
            .map(|_| lb.next_backend(&backends).unwrap().port)
            .collect();

        assert_eq!(visited, vec![3001, 3003, 3001, 3003]);
    }

    #[test]
    fn all_unhealthy_exhausts_budget_and_advances_cursor() {
        let backends = pool(3);
        for b in &backends {
            b.set_healthy(false);
        }
        let lb = RoundRobin::new();

        assert!(lb.next_backend(&backends).is_none());
        // Exactly 2 × pool_len advances; net displacement is zero mod len.
        assert_eq!(lb.position(backends.len()), 0);

        // Once a backend recovers, selection resumes from where the
        // cursor landed.
        backends[1].set_healthy(true);
        let chosen = lb.next_backend(&backends).unwrap();
        assert_eq!(chosen.port, 3002);
        // First inspection (index 0, unhealthy) advanced the cursor too.
        assert_eq!(lb.position(backends.len()), 2);
    }

    #[test]
    fn failed_call_still_advances_rotation() {
        let backends = pool(2);
        let lb = RoundRobin::new();

        assert_eq!(lb.next_backend(&backends).unwrap().port, 3001);

        for b in &backends {
            b.set_healthy(false);
        }
        assert!(lb.next_backend(&backends).is_none());

        for b in &backends {
            b.set_healthy(true);
        }
        // 1 + 4 advances so far; 5 % 2 == 1 → backend on port 3002.
        assert_eq!(lb.next_backend(&backends).unwrap().port, 3002);
    }
}
