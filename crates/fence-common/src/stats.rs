//! Decision counters shared by every evaluation path
//!
//! `DecisionStats` is written on every evaluation, so increments are
//! relaxed atomics with no lock. Reset swaps in a fresh counter block:
//! a concurrent reader sees either the old totals or all zeros, never a
//! half-reset mix.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::metrics;
use crate::policy::Action;

#[derive(Debug, Default)]
struct CounterBlock {
    total: AtomicU64,
    blocked: AtomicU64,
    allowed: AtomicU64,
}

/// Point-in-time view of the decision counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Evaluations recorded since start or last reset
    pub total: u64,
    /// Evaluations that ended in Block or Quarantine
    pub blocked: u64,
    /// Evaluations that ended in Allow or Log
    pub allowed: u64,
}

/// Lock-free total/blocked/allowed accounting
#[derive(Debug)]
pub struct DecisionStats {
    block: ArcSwap<CounterBlock>,
}

impl DecisionStats {
    /// Create zeroed stats
    pub fn new() -> Self {
        Self {
            block: ArcSwap::from_pointee(CounterBlock::default()),
        }
    }

    /// Record one evaluation outcome
    #[inline]
    pub fn record(&self, action: Action) {
        let block = self.block.load();
        block.total.fetch_add(1, Ordering::Relaxed);
        if action.is_blocking() {
            block.blocked.fetch_add(1, Ordering::Relaxed);
        } else {
            block.allowed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read all three counters from one counter block
    pub fn snapshot(&self) -> StatsSnapshot {
        let block = self.block.load();
        StatsSnapshot {
            total: block.total.load(Ordering::Relaxed),
            blocked: block.blocked.load(Ordering::Relaxed),
            allowed: block.allowed.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter in one publication
    pub fn reset(&self) {
        self.block.store(Arc::new(CounterBlock::default()));
    }

    /// Render the counters in text exposition format
    pub fn export(&self) -> String {
        let snap = self.snapshot();
        let mut out = String::with_capacity(256);
        metrics::render_counter(
            &mut out,
            "fence_requests_total",
            "Payload evaluations performed",
            snap.total,
        );
        metrics::render_counter(
            &mut out,
            "fence_requests_blocked",
            "Evaluations that blocked or quarantined",
            snap.blocked,
        );
        metrics::render_counter(
            &mut out,
            "fence_requests_allowed",
            "Evaluations that allowed or logged",
            snap.allowed,
        );
        out
    }
}

impl Default for DecisionStats {
    fn default() -> Self {
        Self::new()
    }
}
