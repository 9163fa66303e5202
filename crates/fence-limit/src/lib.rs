//! # fence-limit
//!
//! Per-key token bucket rate limiting.
//!
//! Each key (a user id, an API key, a tenant) gets its own bucket
//! holding fractional tokens. Buckets refill continuously at the
//! configured rate and cap at the burst size; a fresh key starts with
//! a full bucket so the first burst is never throttled.
//!
//! ```text
//!   acquire(key) ──> bucket[key] ──> refill(elapsed x rate, cap burst)
//!                                      │
//!                            tokens >= 1.0 ? take : deny
//! ```
//!
//! Target: one shard lock per acquire, no global lock, idle buckets
//! evicted in amortized sweeps.

#![warn(missing_docs)]

use arc_swap::ArcSwap;
use dashmap::DashMap;
use fence_common::{AtomicCounter, FenceError, FenceResult};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default sustained tokens per second
pub const DEFAULT_RATE: f64 = 100.0;

/// Default bucket capacity
pub const DEFAULT_BURST: f64 = 200.0;

/// Default idle lifetime before a bucket is evicted
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(600);

// Amortized eviction sweep period, in acquires. Power of two.
const SWEEP_INTERVAL: u64 = 4096;

#[derive(Debug, Clone, Copy)]
struct LimiterConfig {
    rate: f64,
    burst: f64,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Point-in-time limiter counters
#[derive(Debug, Clone, Serialize)]
pub struct LimiterStats {
    /// Acquires that took a token
    pub allowed: u64,
    /// Acquires that found an empty bucket
    pub denied: u64,
    /// Keys with a live bucket
    pub active_keys: usize,
}

/// Token bucket rate limiter keyed by caller-chosen strings
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    config: ArcSwap<LimiterConfig>,
    idle_ttl: Duration,
    allowed: AtomicCounter,
    denied: AtomicCounter,
    ops: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter with default rate, burst, and idle lifetime
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            config: ArcSwap::from_pointee(LimiterConfig {
                rate: DEFAULT_RATE,
                burst: DEFAULT_BURST,
            }),
            idle_ttl: DEFAULT_IDLE_TTL,
            allowed: AtomicCounter::new(0),
            denied: AtomicCounter::new(0),
            ops: AtomicU64::new(0),
        }
    }

    /// Override how long an untouched bucket survives
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    /// Replace rate and burst; existing buckets pick the new values up
    /// on their next refill
    pub fn configure(&self, rate: f64, burst: f64) -> FenceResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(FenceError::InvalidArgument(format!(
                "rate must be a positive number, got {}",
                rate
            )));
        }
        if !burst.is_finite() || burst < 1.0 {
            return Err(FenceError::InvalidArgument(format!(
                "burst must be at least 1, got {}",
                burst
            )));
        }
        self.config.store(Arc::new(LimiterConfig { rate, burst }));
        tracing::info!(rate = rate, burst = burst, "rate limit configured");
        Ok(())
    }

    /// Take one token for the key; false means over limit
    pub fn acquire(&self, key: &str) -> bool {
        let config = self.config.load();
        let now = Instant::now();
        let allowed = {
            let mut bucket = self
                .buckets
                .entry(key.to_string())
                .or_insert_with(|| Bucket {
                    tokens: config.burst,
                    last_refill: now,
                });
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * config.rate).min(config.burst);
            bucket.last_refill = now;
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                true
            } else {
                false
            }
        };

        if allowed {
            self.allowed.inc();
        } else {
            self.denied.inc();
            tracing::debug!(key = %key, "rate limit exceeded");
        }
        // Entry guard is dropped; safe to sweep the map
        if self.ops.fetch_add(1, Ordering::Relaxed) & (SWEEP_INTERVAL - 1) == 0 {
            self.evict_idle();
        }
        allowed
    }

    /// Would an acquire succeed right now; consumes nothing
    pub fn check(&self, key: &str) -> bool {
        self.peek(key) >= 1.0
    }

    /// Tokens currently available for the key
    pub fn remaining(&self, key: &str) -> f64 {
        self.peek(key)
    }

    fn peek(&self, key: &str) -> f64 {
        let config = self.config.load();
        match self.buckets.get(key) {
            Some(bucket) => {
                let elapsed = bucket.last_refill.elapsed().as_secs_f64();
                (bucket.tokens + elapsed * config.rate).min(config.burst)
            }
            None => config.burst,
        }
    }

    /// Drop the key's bucket; its next acquire starts from full burst
    pub fn reset(&self, key: &str) -> bool {
        self.buckets.remove(key).is_some()
    }

    /// Drop every bucket
    pub fn clear(&self) {
        self.buckets.clear();
    }

    /// Remove buckets untouched for longer than the idle lifetime
    pub fn evict_idle(&self) -> usize {
        let before = self.buckets.len();
        let ttl = self.idle_ttl;
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < ttl);
        before.saturating_sub(self.buckets.len())
    }

    /// Counter snapshot
    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            allowed: self.allowed.get(),
            denied: self.denied.get(),
            active_keys: self.buckets.len(),
        }
    }

    /// Current (rate, burst) pair
    pub fn limits(&self) -> (f64, f64) {
        let config = self.config.load();
        (config.rate, config.burst)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
