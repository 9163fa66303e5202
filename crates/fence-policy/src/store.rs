//! Copy-on-write rule store with pre-indexed candidates
//!
//! Rules are validated and their patterns compiled at add time; the
//! published table carries one pre-sorted candidate bucket per
//! (zone type, direction) pair, so the evaluation path never sorts,
//! filters by zone type, or touches a lock. Mutations clone the rule
//! list, rebuild the buckets and publish a new table through arc-swap.

use arc_swap::ArcSwap;
use fence_common::{AtomicCounter, Direction, FenceError, FenceResult, ZoneType};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Rule, MAX_PATTERN_LEN, MAX_REMARK_LEN};

/// Compiled-program cap handed to the regex builder
const REGEX_SIZE_LIMIT: usize = 1 << 18;

/// 7 zone types x 2 directions
const BUCKETS: usize = 14;

#[inline(always)]
fn bucket_index(zone_type: ZoneType, direction: Direction) -> usize {
    zone_type.code() as usize * 2 + direction.code() as usize
}

/// Rule with its pattern compiled, shared across store snapshots
#[derive(Debug)]
pub struct CompiledRule {
    /// Definition as supplied
    pub rule: Rule,
    regex: Option<Regex>,
    /// Times this rule decided an evaluation
    pub matches: AtomicCounter,
}

impl CompiledRule {
    fn compile(rule: Rule) -> FenceResult<Self> {
        if rule.acl == 0 {
            return Err(FenceError::InvalidArgument("rule acl mask is zero".into()));
        }
        if let Some(remark) = &rule.remark {
            if remark.len() > MAX_REMARK_LEN {
                return Err(FenceError::InvalidArgument(format!(
                    "remark exceeds {} bytes",
                    MAX_REMARK_LEN
                )));
            }
        }
        let regex = match &rule.pattern {
            Some(p) if p.is_empty() => {
                return Err(FenceError::InvalidArgument(
                    "pattern is empty; omit it to match unconditionally".into(),
                ));
            }
            Some(p) => {
                if p.len() > MAX_PATTERN_LEN {
                    return Err(FenceError::PatternTooLong {
                        len: p.len(),
                        max: MAX_PATTERN_LEN,
                    });
                }
                let compiled = RegexBuilder::new(p)
                    .case_insensitive(true)
                    .size_limit(REGEX_SIZE_LIMIT)
                    .build()
                    .map_err(|e| FenceError::InvalidPattern(e.to_string()))?;
                Some(compiled)
            }
            None => None,
        };
        Ok(Self {
            rule,
            regex,
            matches: AtomicCounter::new(0),
        })
    }

    /// Does the payload satisfy this rule's condition
    #[inline]
    pub fn matches_payload(&self, payload: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(payload),
            None => true,
        }
    }

    /// Store key (acl, number)
    #[inline]
    pub fn key(&self) -> (u32, u32) {
        self.rule.key()
    }

    #[inline]
    fn applies_to(&self, zone_type: ZoneType) -> bool {
        self.rule.zone_type == ZoneType::Unknown || self.rule.zone_type == zone_type
    }

    fn renumbered(&self, number: u32) -> Self {
        Self {
            rule: Rule {
                number,
                ..self.rule.clone()
            },
            regex: self.regex.clone(),
            matches: AtomicCounter::new(self.matches.get()),
        }
    }
}

/// Immutable rule snapshot with pre-sorted candidate buckets
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Arc<CompiledRule>>,
    buckets: [Vec<Arc<CompiledRule>>; BUCKETS],
}

impl RuleTable {
    fn empty() -> Self {
        Self {
            rules: Vec::new(),
            buckets: std::array::from_fn(|_| Vec::new()),
        }
    }

    fn build(rules: Vec<Arc<CompiledRule>>) -> Self {
        let mut buckets: [Vec<Arc<CompiledRule>>; BUCKETS] = std::array::from_fn(|_| Vec::new());
        for zone_type in ZoneType::ALL {
            for direction in [Direction::Input, Direction::Output] {
                let mut bucket: Vec<Arc<CompiledRule>> = rules
                    .iter()
                    .filter(|r| r.applies_to(zone_type) && r.rule.direction == direction)
                    .map(Arc::clone)
                    .collect();
                // Stable sort keeps insertion order between equal numbers
                bucket.sort_by_key(|r| r.rule.number);
                buckets[bucket_index(zone_type, direction)] = bucket;
            }
        }
        Self { rules, buckets }
    }

    /// Rules applicable to (zone_type, direction), ascending number
    #[inline]
    pub fn candidates(&self, zone_type: ZoneType, direction: Direction) -> &[Arc<CompiledRule>] {
        &self.buckets[bucket_index(zone_type, direction)]
    }

    /// Every rule in insertion order
    pub fn rules(&self) -> &[Arc<CompiledRule>] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the table has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Copy-on-write rule store
///
/// Readers load the current table and never block; an evaluation sees
/// either the table from before a mutation or the one after it, never
/// a half-applied mix. The version counter invalidates caller caches.
pub struct RuleStore {
    table: ArcSwap<RuleTable>,
    version: AtomicU64,
    write_lock: Mutex<()>,
}

impl RuleStore {
    /// Create empty store
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RuleTable::empty()),
            version: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Current version
    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Current table snapshot
    #[inline]
    pub fn snapshot(&self) -> Arc<RuleTable> {
        self.table.load_full()
    }

    /// Validate, compile and insert a rule
    pub fn add(&self, rule: Rule) -> FenceResult<()> {
        let compiled = Arc::new(CompiledRule::compile(rule)?);
        let _guard = self.write_lock.lock();
        let current = self.table.load();
        if current.rules.iter().any(|r| r.key() == compiled.key()) {
            let (acl, number) = compiled.key();
            return Err(FenceError::RuleExists { acl, number });
        }
        tracing::info!(
            acl = compiled.rule.acl,
            number = compiled.rule.number,
            action = compiled.rule.action.name(),
            "rule added"
        );
        let mut rules = current.rules.clone();
        rules.push(compiled);
        self.publish(rules);
        Ok(())
    }

    /// Remove a rule by key
    pub fn delete(&self, acl: u32, number: u32) -> FenceResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.table.load();
        let Some(pos) = current.rules.iter().position(|r| r.key() == (acl, number)) else {
            return Err(FenceError::RuleNotFound { acl, number });
        };
        let mut rules = current.rules.clone();
        rules.remove(pos);
        self.publish(rules);
        tracing::info!(acl, number, "rule deleted");
        Ok(())
    }

    /// Find a rule by key
    pub fn get(&self, acl: u32, number: u32) -> Option<Arc<CompiledRule>> {
        self.table
            .load()
            .rules
            .iter()
            .find(|r| r.key() == (acl, number))
            .map(Arc::clone)
    }

    /// Applicable rules for (zone_type, direction), ascending number
    pub fn candidates_for(
        &self,
        zone_type: ZoneType,
        direction: Direction,
    ) -> Vec<Arc<CompiledRule>> {
        self.table.load().candidates(zone_type, direction).to_vec()
    }

    /// Renumber one ACL's rules as start, start+step, start+2*step, ...
    ///
    /// Relative priority order and per-rule match counters survive the
    /// renumbering. Returns how many rules were renumbered.
    pub fn resequence(&self, acl: u32, start: u32, step: u32) -> FenceResult<usize> {
        if step == 0 {
            return Err(FenceError::InvalidArgument("resequence step is zero".into()));
        }
        let _guard = self.write_lock.lock();
        let current = self.table.load();
        let mut positions: Vec<usize> = (0..current.rules.len())
            .filter(|&i| current.rules[i].rule.acl == acl)
            .collect();
        positions.sort_by_key(|&i| current.rules[i].rule.number);
        if let Some(last_seq) = positions.len().checked_sub(1) {
            let last = start as u64 + last_seq as u64 * step as u64;
            if last > u32::MAX as u64 {
                return Err(FenceError::InvalidArgument(
                    "resequence overflows rule numbers".into(),
                ));
            }
        }
        let mut rules = current.rules.clone();
        for (seq, &pos) in positions.iter().enumerate() {
            let number = start + seq as u32 * step;
            rules[pos] = Arc::new(rules[pos].renumbered(number));
        }
        let renumbered = positions.len();
        self.publish(rules);
        tracing::info!(acl, start, step, renumbered, "acl resequenced");
        Ok(renumbered)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    /// True when the store has no rules
    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    fn publish(&self, rules: Vec<Arc<CompiledRule>>) {
        self.table.store(Arc::new(RuleTable::build(rules)));
        self.version.fetch_add(1, Ordering::Release);
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}
