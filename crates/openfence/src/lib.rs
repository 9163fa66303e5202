//! # openfence
//!
//! Runtime policy enforcement for LLM applications.
//!
//! One [`Firewall`] instance fronts every enforcement component:
//!
//! ```text
//!                         ┌───────────────────────────────┐
//!    evaluate/check ────> │  PolicyEngine                 │
//!                         │    ZoneRegistry ── RuleStore  │
//!                         ├───────────────────────────────┤
//!    blocklist_check ───> │  Blocklist   (aho-corasick)   │
//!    canary_scan ───────> │  CanaryRegistry               │
//!    rate_acquire ──────> │  RateLimiter (token buckets)  │
//!                         ├───────────────────────────────┤
//!    metrics_export ────> │  DecisionStats + gauges       │
//!                         └───────────────────────────────┘
//! ```
//!
//! Policy evaluation decides allow/block/quarantine/log from zone and
//! rule state alone. The scanners and the rate limiter are separate
//! checks the caller composes around it; none of them feeds the
//! other's verdict.
//!
//! Instances are independent. Two firewalls share no zones, rules,
//! buckets, or counters.
//!
//! Target: safe to call from any thread, no locks held across calls.

#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use fence_common::metrics::{render_counter, render_gauge};
use fence_common::DecisionStats;
use serde::{Deserialize, Serialize};

pub use fence_common::{Action, Direction, FenceError, FenceResult, StatsSnapshot, ZoneType};
pub use fence_limit::{LimiterStats, RateLimiter};
pub use fence_policy::{
    EngineStats, PolicyEngine, Rule, RuleStore, UnknownZonePolicy, Verdict, Zone, ZoneRegistry,
};
pub use fence_scan::{BlockEntry, Blocklist, CanaryHit, CanaryKind, CanaryRegistry, CanaryToken};

/// Construction-time settings for a [`Firewall`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// Fallback when a payload names an unregistered zone
    pub unknown_zone: UnknownZonePolicy,
    /// Sustained rate limit in tokens per second per key
    pub rate: u32,
    /// Rate limit burst capacity per key
    pub burst: u32,
    /// How long an untouched rate bucket survives
    pub idle_ttl: Duration,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            unknown_zone: UnknownZonePolicy::default(),
            rate: fence_limit::DEFAULT_RATE as u32,
            burst: fence_limit::DEFAULT_BURST as u32,
            idle_ttl: fence_limit::DEFAULT_IDLE_TTL,
        }
    }
}

/// Facade over the full enforcement stack
///
/// Every method delegates to one component; nothing is re-implemented
/// here. Drop to the component accessors for the less common
/// operations.
pub struct Firewall {
    engine: PolicyEngine,
    blocklist: Blocklist,
    canaries: CanaryRegistry,
    limiter: RateLimiter,
}

impl Firewall {
    /// Create a firewall with default settings
    pub fn new() -> Self {
        let zones = Arc::new(ZoneRegistry::new());
        let rules = Arc::new(RuleStore::new());
        let stats = Arc::new(DecisionStats::new());
        Self {
            engine: PolicyEngine::new(zones, rules, stats),
            blocklist: Blocklist::new(),
            canaries: CanaryRegistry::new(),
            limiter: RateLimiter::new(),
        }
    }

    /// Create a firewall from explicit settings
    pub fn with_config(config: FirewallConfig) -> FenceResult<Self> {
        let zones = Arc::new(ZoneRegistry::new());
        let rules = Arc::new(RuleStore::new());
        let stats = Arc::new(DecisionStats::new());
        let limiter = RateLimiter::new().with_idle_ttl(config.idle_ttl);
        limiter.configure(f64::from(config.rate), f64::from(config.burst))?;
        tracing::info!(
            unknown_zone = ?config.unknown_zone,
            rate = config.rate,
            burst = config.burst,
            "firewall configured"
        );
        Ok(Self {
            engine: PolicyEngine::with_unknown_zone(zones, rules, stats, config.unknown_zone),
            blocklist: Blocklist::new(),
            canaries: CanaryRegistry::new(),
            limiter,
        })
    }

    // ---- zones ----

    /// Register a zone
    pub fn zone_create(&self, name: &str, zone_type: ZoneType) -> FenceResult<Arc<Zone>> {
        self.engine.zones().create(name, zone_type)
    }

    /// Remove a zone
    pub fn zone_delete(&self, name: &str) -> FenceResult<()> {
        self.engine.zones().delete(name)
    }

    /// Replace one direction's ACL mask on a zone
    pub fn zone_set_acl(&self, name: &str, direction: Direction, mask: u32) -> FenceResult<()> {
        self.engine.zones().set_acl(name, direction, mask)
    }

    /// Replace both of a zone's ACL masks at once
    pub fn zone_set_acls(&self, name: &str, input: u32, output: u32) -> FenceResult<()> {
        self.engine.zones().set_acls(name, input, output)
    }

    /// Fetch a zone by name
    pub fn zone_lookup(&self, name: &str) -> Option<Arc<Zone>> {
        self.engine.zones().lookup(name)
    }

    /// Number of registered zones
    pub fn zone_count(&self) -> usize {
        self.engine.zones().len()
    }

    // ---- rules ----

    /// Add a rule; its pattern is compiled and validated here
    pub fn rule_add(&self, rule: Rule) -> FenceResult<()> {
        self.engine.rules().add(rule)
    }

    /// Remove a rule by (acl, number)
    pub fn rule_delete(&self, acl: u32, number: u32) -> FenceResult<()> {
        self.engine.rules().delete(acl, number)
    }

    /// Number of loaded rules
    pub fn rule_count(&self) -> usize {
        self.engine.rules().len()
    }

    // ---- evaluation ----

    /// Evaluate one payload against a zone
    #[inline]
    pub fn evaluate(&self, zone: &str, direction: Direction, payload: &str) -> Verdict {
        self.engine.evaluate(zone, direction, payload)
    }

    /// Evaluate and collapse to the action
    #[inline]
    pub fn check(&self, zone: &str, direction: Direction, payload: &str) -> Action {
        self.engine.check(zone, direction, payload)
    }

    /// True iff an input-direction check comes back Allow
    #[inline]
    pub fn is_allowed(&self, zone: &str, payload: &str) -> bool {
        self.engine.is_allowed(zone, payload)
    }

    /// True iff an input-direction check comes back Block
    #[inline]
    pub fn is_blocked(&self, zone: &str, payload: &str) -> bool {
        self.engine.is_blocked(zone, payload)
    }

    // ---- content scanners ----

    /// Add a blocklist pattern
    pub fn blocklist_add(&self, pattern: &str, reason: &str) -> FenceResult<()> {
        self.blocklist.add(pattern, reason)
    }

    /// Does the text contain any blocklisted pattern
    #[inline]
    pub fn blocklist_check(&self, text: &str) -> bool {
        self.blocklist.check(text)
    }

    /// Plant a canary value; returns the token id
    pub fn canary_create(&self, value: &str, description: &str) -> FenceResult<String> {
        self.canaries.create(value, description)
    }

    /// Mint and plant a random canary value
    pub fn canary_generate(
        &self,
        kind: CanaryKind,
        description: &str,
    ) -> FenceResult<Arc<CanaryToken>> {
        self.canaries.generate(kind, description)
    }

    /// Does the text leak any planted canary value
    #[inline]
    pub fn canary_scan(&self, text: &str) -> bool {
        self.canaries.scan(text)
    }

    // ---- rate limiting ----

    /// Replace the limiter's rate and burst
    pub fn rate_configure(&self, rate: u32, burst: u32) -> FenceResult<()> {
        self.limiter.configure(f64::from(rate), f64::from(burst))
    }

    /// Take one rate limit token for the key; false means over limit
    #[inline]
    pub fn rate_acquire(&self, key: &str) -> bool {
        self.limiter.acquire(key)
    }

    // ---- observability ----

    /// Engine counter snapshot plus registry sizes
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Zero the decision counters
    pub fn stats_reset(&self) {
        self.engine.decision_stats().reset();
    }

    /// Render every counter and gauge in text exposition format
    ///
    /// Suitable for serving as a Prometheus scrape body.
    pub fn metrics_export(&self) -> String {
        let mut out = self.engine.decision_stats().export();
        render_gauge(
            &mut out,
            "fence_zones",
            "Registered zones",
            self.zone_count() as u64,
        );
        render_gauge(
            &mut out,
            "fence_rules",
            "Loaded rules",
            self.rule_count() as u64,
        );
        render_gauge(
            &mut out,
            "fence_blocklist_entries",
            "Blocklist patterns",
            self.blocklist.len() as u64,
        );
        render_gauge(
            &mut out,
            "fence_canary_tokens",
            "Planted canary tokens",
            self.canaries.len() as u64,
        );
        let limits = self.limiter.stats();
        render_counter(
            &mut out,
            "fence_ratelimit_allowed",
            "Rate limit acquires that took a token",
            limits.allowed,
        );
        render_counter(
            &mut out,
            "fence_ratelimit_denied",
            "Rate limit acquires that found an empty bucket",
            limits.denied,
        );
        render_counter(
            &mut out,
            "fence_canary_triggered",
            "Canary values found in scanned text",
            self.canaries.triggered_total(),
        );
        out
    }

    // ---- components ----

    /// The policy evaluator
    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// The zone registry
    pub fn zones(&self) -> &Arc<ZoneRegistry> {
        self.engine.zones()
    }

    /// The rule store
    pub fn rules(&self) -> &Arc<RuleStore> {
        self.engine.rules()
    }

    /// The phrase blocklist
    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    /// The canary token registry
    pub fn canaries(&self) -> &CanaryRegistry {
        &self.canaries
    }

    /// The per-key rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl Default for Firewall {
    fn default() -> Self {
        Self::new()
    }
}
