//! Payload evaluator with zone-scoped rule dispatch
//!
//! Resolves the zone, walks the pre-sorted candidate bucket for the
//! zone's (type, direction), gates each rule on the ACL mask and takes
//! the first pattern hit. Ascending rule number is the priority order;
//! a rule without a pattern always fires.

use crate::store::{CompiledRule, RuleStore};
use crate::zones::ZoneRegistry;
use fence_common::{Action, AtomicCounter, DecisionStats, Direction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Verdict reason when the named zone is not registered
pub const REASON_UNKNOWN_ZONE: &str = "unknown zone";

/// Verdict reason when no rule fired
pub const REASON_NO_MATCH: &str = "no rule matched";

/// Fallback when a payload names a zone that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownZonePolicy {
    /// Block the payload
    FailClosed,
    /// Let the payload through
    FailOpen,
}

impl UnknownZonePolicy {
    /// Action this fallback resolves to
    #[inline]
    pub const fn action(self) -> Action {
        match self {
            Self::FailClosed => Action::Block,
            Self::FailOpen => Action::Allow,
        }
    }
}

impl Default for UnknownZonePolicy {
    fn default() -> Self {
        Self::FailClosed
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Enforcement action
    pub action: Action,
    /// Number of the deciding rule (0 when none fired)
    pub rule_number: u32,
    /// Match confidence in [0, 1]
    pub confidence: f32,
    /// Short reason derived from rule identity, never from the payload
    pub reason: String,
}

enum Decision {
    UnknownZone,
    NoMatch,
    Matched(Arc<CompiledRule>),
}

/// Zone-aware policy evaluator
///
/// # Performance
///
/// - Zone resolve: one dashmap read
/// - Candidates: pre-sorted bucket behind one arc-swap load
/// - Pattern runs: compiled linear-time matchers only
///
/// Target: <10μs per evaluation against 1000 rules
pub struct PolicyEngine {
    zones: Arc<ZoneRegistry>,
    rules: Arc<RuleStore>,
    stats: Arc<DecisionStats>,

    // Metrics
    unknown_zones: AtomicCounter,

    // Fallback for unregistered zone names
    unknown_zone: UnknownZonePolicy,
}

impl PolicyEngine {
    /// Create an engine over shared registries, failing closed on
    /// unknown zones
    pub fn new(
        zones: Arc<ZoneRegistry>,
        rules: Arc<RuleStore>,
        stats: Arc<DecisionStats>,
    ) -> Self {
        Self::with_unknown_zone(zones, rules, stats, UnknownZonePolicy::default())
    }

    /// Create with an explicit unknown-zone fallback
    pub fn with_unknown_zone(
        zones: Arc<ZoneRegistry>,
        rules: Arc<RuleStore>,
        stats: Arc<DecisionStats>,
        unknown_zone: UnknownZonePolicy,
    ) -> Self {
        Self {
            zones,
            rules,
            stats,
            unknown_zones: AtomicCounter::new(0),
            unknown_zone,
        }
    }

    /// Evaluate one payload against a zone
    ///
    /// # Performance
    ///
    /// This is the hot path; the only allocation is the verdict reason.
    #[inline]
    pub fn evaluate(&self, zone_name: &str, direction: Direction, payload: &str) -> Verdict {
        match self.decide(zone_name, direction, payload) {
            Decision::UnknownZone => Verdict {
                action: self.unknown_zone.action(),
                rule_number: 0,
                confidence: 1.0,
                reason: REASON_UNKNOWN_ZONE.to_string(),
            },
            Decision::Matched(rule) => Verdict {
                action: rule.rule.action,
                rule_number: rule.rule.number,
                // Binary scoring: a rule either fired or it did not
                confidence: 1.0,
                reason: match &rule.rule.remark {
                    Some(remark) => remark.clone(),
                    None => format!("rule {} matched", rule.rule.number),
                },
            },
            Decision::NoMatch => Verdict {
                action: Action::Allow,
                rule_number: 0,
                confidence: 1.0,
                reason: REASON_NO_MATCH.to_string(),
            },
        }
    }

    /// Evaluate and collapse to the action, skipping verdict assembly
    #[inline]
    pub fn check(&self, zone_name: &str, direction: Direction, payload: &str) -> Action {
        match self.decide(zone_name, direction, payload) {
            Decision::UnknownZone => self.unknown_zone.action(),
            Decision::Matched(rule) => rule.rule.action,
            Decision::NoMatch => Action::Allow,
        }
    }

    /// True iff an input-direction check comes back Allow
    #[inline]
    pub fn is_allowed(&self, zone_name: &str, payload: &str) -> bool {
        self.check(zone_name, Direction::Input, payload) == Action::Allow
    }

    /// True iff an input-direction check comes back Block
    #[inline]
    pub fn is_blocked(&self, zone_name: &str, payload: &str) -> bool {
        self.check(zone_name, Direction::Input, payload) == Action::Block
    }

    #[inline]
    fn decide(&self, zone_name: &str, direction: Direction, payload: &str) -> Decision {
        let Some(zone) = self.zones.lookup(zone_name) else {
            self.unknown_zones.inc();
            let action = self.unknown_zone.action();
            tracing::warn!(zone = %zone_name, action = action.name(), "unknown zone");
            self.stats.record(action);
            return Decision::UnknownZone;
        };

        let zone_acl = zone.acl(direction);
        let table = self.rules.snapshot();
        let mut winner: Option<Arc<CompiledRule>> = None;
        for rule in table.candidates(zone.zone_type, direction) {
            if rule.rule.acl & zone_acl == 0 {
                continue;
            }
            if rule.matches_payload(payload) {
                winner = Some(Arc::clone(rule));
                break;
            }
        }

        match winner {
            Some(rule) => {
                rule.matches.inc();
                let action = rule.rule.action;
                if rule.rule.log_matches {
                    tracing::debug!(
                        zone = %zone.name,
                        rule = rule.rule.number,
                        action = action.name(),
                        "rule fired"
                    );
                }
                self.stats.record(action);
                zone.stats.record(direction, action.is_blocking());
                Decision::Matched(rule)
            }
            None => {
                self.stats.record(Action::Allow);
                zone.stats.record(direction, false);
                Decision::NoMatch
            }
        }
    }

    /// Get engine statistics
    pub fn stats(&self) -> EngineStats {
        let snap = self.stats.snapshot();
        EngineStats {
            evaluations: snap.total,
            blocked: snap.blocked,
            allowed: snap.allowed,
            unknown_zones: self.unknown_zones.get(),
            rules_loaded: self.rules.len(),
            zones_registered: self.zones.len(),
            version: self.rules.version(),
        }
    }

    /// Active unknown-zone fallback
    pub fn unknown_zone_policy(&self) -> UnknownZonePolicy {
        self.unknown_zone
    }

    /// Get zone registry reference
    pub fn zones(&self) -> &Arc<ZoneRegistry> {
        &self.zones
    }

    /// Get rule store reference
    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    /// Get shared decision counters
    pub fn decision_stats(&self) -> &Arc<DecisionStats> {
        &self.stats
    }
}

/// Engine statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStats {
    pub evaluations: u64,
    pub blocked: u64,
    pub allowed: u64,
    pub unknown_zones: u64,
    pub rules_loaded: usize,
    pub zones_registered: usize,
    pub version: u64,
}
