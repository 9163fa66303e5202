//! Zone-Aware Policy Evaluator
//!
//! Target: <10μs evaluation against 1000 rules, lock-free reads
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Payload Evaluation                       │
//! │                                                            │
//! │  ┌──────────────┐        ┌─────────────┐      ┌─────────┐  │
//! │  │ ZoneRegistry │ name   │  RuleStore  │ COW  │candidate│  │
//! │  │  (dashmap)   │───────►│ (arc-swap)  │─────►│ buckets │  │
//! │  └──────────────┘        └─────────────┘      └─────────┘  │
//! │         │ ACL mask              first match wins   │       │
//! │         ▼                                          ▼       │
//! │     [gate: rule.acl & zone.acl != 0]          [Verdict]    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules carry a pattern compiled once at add time; the evaluation path
//! only walks pre-sorted candidate buckets and runs compiled matchers.

#![warn(missing_docs)]

pub mod engine;
pub mod store;
pub mod zones;

pub use engine::{EngineStats, PolicyEngine, UnknownZonePolicy, Verdict};
pub use store::{CompiledRule, RuleStore};
pub use zones::{Zone, ZoneRegistry, ZoneStats};

use fence_common::{Action, Direction, ZoneType};

/// Longest accepted rule pattern in bytes
pub const MAX_PATTERN_LEN: usize = 512;

/// Longest accepted rule remark in bytes
pub const MAX_REMARK_LEN: usize = 256;

/// Rule definition supplied by callers
///
/// A rule belongs to an ACL (bitmask, non-zero) and carries a priority
/// number unique within that ACL; lower numbers win. The pattern, when
/// present, is a case-insensitive regex; a rule without a pattern
/// matches every payload.
#[derive(Debug, Clone)]
pub struct Rule {
    /// ACL bitmask the rule belongs to
    pub acl: u32,
    /// Priority number, unique per ACL (lower = higher priority)
    pub number: u32,
    /// Action when the rule fires
    pub action: Action,
    /// Direction the rule applies to
    pub direction: Direction,
    /// Zone type filter (Unknown = every type)
    pub zone_type: ZoneType,
    /// Case-insensitive regex; None matches unconditionally
    pub pattern: Option<String>,
    /// Operator note, reported as the verdict reason
    pub remark: Option<String>,
    /// Emit a tracing event when the rule fires
    pub log_matches: bool,
}

impl Rule {
    /// Create a rule with an explicit action
    pub fn new(
        acl: u32,
        number: u32,
        action: Action,
        direction: Direction,
        zone_type: ZoneType,
    ) -> Self {
        Self {
            acl,
            number,
            action,
            direction,
            zone_type,
            pattern: None,
            remark: None,
            log_matches: false,
        }
    }

    /// Create an allow rule
    pub fn allow(acl: u32, number: u32, direction: Direction, zone_type: ZoneType) -> Self {
        Self::new(acl, number, Action::Allow, direction, zone_type)
    }

    /// Create a block rule
    pub fn block(acl: u32, number: u32, direction: Direction, zone_type: ZoneType) -> Self {
        Self::new(acl, number, Action::Block, direction, zone_type)
    }

    /// Attach a pattern
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Attach a remark
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    /// Log every time this rule fires
    pub fn with_log(mut self) -> Self {
        self.log_matches = true;
        self
    }

    /// Key identifying this rule in a store
    #[inline]
    pub fn key(&self) -> (u32, u32) {
        (self.acl, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builders() {
        let rule = Rule::block(0x01, 10, Direction::Input, ZoneType::Llm)
            .with_pattern("ignore previous")
            .with_remark("prompt injection")
            .with_log();

        assert_eq!(rule.key(), (0x01, 10));
        assert_eq!(rule.action, Action::Block);
        assert_eq!(rule.pattern.as_deref(), Some("ignore previous"));
        assert_eq!(rule.remark.as_deref(), Some("prompt injection"));
        assert!(rule.log_matches);
    }

    #[test]
    fn test_rule_defaults() {
        let rule = Rule::allow(0x02, 5, Direction::Output, ZoneType::Unknown);
        assert_eq!(rule.action, Action::Allow);
        assert!(rule.pattern.is_none());
        assert!(rule.remark.is_none());
        assert!(!rule.log_matches);
    }
}
