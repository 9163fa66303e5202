//! OpenFence Common - Shared types for the LLM enforcement engine
//!
//! This crate provides the primitives every other OpenFence crate builds on:
//! - Boundary enums with stable wire codes (action, direction, zone type)
//! - Error handling
//! - Lock-free decision counters
//! - Prometheus-style text exposition helpers
//!
//! Nothing here allocates on the evaluation hot path; counters are relaxed
//! atomics and snapshots are published through `arc-swap`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod metrics;
pub mod policy;
pub mod stats;

pub use error::*;
pub use policy::*;
pub use stats::*;

use std::sync::atomic::{AtomicU64, Ordering};

/// High-performance counter for lock-free metrics
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Add value and return previous
    #[inline(always)]
    pub fn add(&self, val: u64) -> u64 {
        self.0.fetch_add(val, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
