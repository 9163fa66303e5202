//! Literal blocklist with single-pass scanning

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use fence_common::{AtomicCounter, FenceError, FenceResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Longest accepted blocklist pattern in bytes
pub const MAX_BLOCK_PATTERN_LEN: usize = 256;

/// One blocklist entry
#[derive(Debug)]
pub struct BlockEntry {
    /// Literal pattern, matched as a case-insensitive substring
    pub pattern: String,
    /// Why the pattern is listed
    pub reason: String,
    /// When the entry was added
    pub added_at: DateTime<Utc>,
    /// Times the entry matched a checked text
    pub hits: AtomicCounter,
}

struct BlockSet {
    entries: Vec<Arc<BlockEntry>>,
    matcher: Option<AhoCorasick>,
}

impl BlockSet {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            matcher: None,
        }
    }

    fn build(entries: Vec<Arc<BlockEntry>>) -> FenceResult<Self> {
        let matcher = if entries.is_empty() {
            None
        } else {
            let patterns: Vec<&str> = entries.iter().map(|e| e.pattern.as_str()).collect();
            let automaton = AhoCorasickBuilder::new()
                .match_kind(MatchKind::LeftmostFirst)
                .ascii_case_insensitive(true)
                .build(&patterns)
                .map_err(|e| FenceError::InvalidPattern(e.to_string()))?;
            Some(automaton)
        };
        Ok(Self { entries, matcher })
    }
}

/// Blocklist of literal strings
///
/// `check` runs one Aho-Corasick pass over the text; cost is linear in
/// the text length regardless of how many entries are listed. Case
/// folding is ASCII. Mutations rebuild the automaton and publish it
/// atomically.
pub struct Blocklist {
    set: ArcSwap<BlockSet>,
    write_lock: Mutex<()>,
}

impl Blocklist {
    /// Create empty blocklist
    pub fn new() -> Self {
        Self {
            set: ArcSwap::from_pointee(BlockSet::empty()),
            write_lock: Mutex::new(()),
        }
    }

    /// Add a pattern with its reason
    pub fn add(&self, pattern: &str, reason: &str) -> FenceResult<()> {
        if pattern.is_empty() {
            return Err(FenceError::InvalidArgument(
                "blocklist pattern is empty".into(),
            ));
        }
        if pattern.len() > MAX_BLOCK_PATTERN_LEN {
            return Err(FenceError::PatternTooLong {
                len: pattern.len(),
                max: MAX_BLOCK_PATTERN_LEN,
            });
        }
        let _guard = self.write_lock.lock();
        let current = self.set.load();
        if current
            .entries
            .iter()
            .any(|e| e.pattern.eq_ignore_ascii_case(pattern))
        {
            return Err(FenceError::EntryExists(pattern.to_string()));
        }
        let mut entries = current.entries.clone();
        entries.push(Arc::new(BlockEntry {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
            added_at: Utc::now(),
            hits: AtomicCounter::new(0),
        }));
        self.set.store(Arc::new(BlockSet::build(entries)?));
        tracing::info!(pattern = %pattern, "blocklist entry added");
        Ok(())
    }

    /// Remove a pattern (case-insensitive lookup)
    pub fn remove(&self, pattern: &str) -> FenceResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.set.load();
        let Some(pos) = current
            .entries
            .iter()
            .position(|e| e.pattern.eq_ignore_ascii_case(pattern))
        else {
            return Err(FenceError::EntryNotFound(pattern.to_string()));
        };
        let mut entries = current.entries.clone();
        entries.remove(pos);
        self.set.store(Arc::new(BlockSet::build(entries)?));
        tracing::info!(pattern = %pattern, "blocklist entry removed");
        Ok(())
    }

    /// Drop every entry
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.set.store(Arc::new(BlockSet::empty()));
    }

    /// Does any listed pattern occur in the text
    #[inline]
    pub fn check(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// First matching entry, with its reason
    #[inline]
    pub fn find(&self, text: &str) -> Option<Arc<BlockEntry>> {
        let set = self.set.load();
        let matcher = set.matcher.as_ref()?;
        let hit = matcher.find(text)?;
        let entry = &set.entries[hit.pattern().as_usize()];
        entry.hits.inc();
        Some(Arc::clone(entry))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.set.load().entries.len()
    }

    /// True when no entry is listed
    pub fn is_empty(&self) -> bool {
        self.set.load().entries.is_empty()
    }

    /// Snapshot of every entry
    pub fn entries(&self) -> Vec<Arc<BlockEntry>> {
        self.set.load().entries.clone()
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_check() {
        let blocklist = Blocklist::new();
        blocklist.add("forbidden phrase", "policy").unwrap();

        assert!(blocklist.check("this contains the forbidden phrase here"));
        assert!(!blocklist.check("this is fine"));
        assert_eq!(blocklist.len(), 1);
    }

    #[test]
    fn test_case_insensitive() {
        let blocklist = Blocklist::new();
        blocklist.add("BadWord", "test").unwrap();

        assert!(blocklist.check("contains badword here"));
        assert!(blocklist.check("contains BADWORD here"));
        assert!(blocklist.check("contains BaDwOrD here"));
    }

    #[test]
    fn test_duplicate_rejected_case_insensitively() {
        let blocklist = Blocklist::new();
        blocklist.add("BadWord", "first").unwrap();
        let err = blocklist.add("badword", "second").unwrap_err();
        assert!(matches!(err, FenceError::EntryExists(_)));
        assert_eq!(blocklist.len(), 1);
    }

    #[test]
    fn test_empty_and_oversized_rejected() {
        let blocklist = Blocklist::new();
        assert!(matches!(
            blocklist.add("", "x"),
            Err(FenceError::InvalidArgument(_))
        ));
        let long = "a".repeat(MAX_BLOCK_PATTERN_LEN + 1);
        assert!(matches!(
            blocklist.add(&long, "x"),
            Err(FenceError::PatternTooLong { .. })
        ));
    }

    #[test]
    fn test_any_of_many_matches() {
        let blocklist = Blocklist::new();
        for (i, pattern) in ["alpha", "beta", "gamma", "delta"].iter().enumerate() {
            blocklist.add(pattern, &format!("reason {}", i)).unwrap();
        }

        assert!(blocklist.check("some gamma in the middle"));
        assert!(!blocklist.check("epsilon only"));
    }

    #[test]
    fn test_find_returns_entry_with_reason() {
        let blocklist = Blocklist::new();
        blocklist.add("secret-project", "codename leak").unwrap();

        let entry = blocklist.find("mentions secret-project openly").unwrap();
        assert_eq!(entry.pattern, "secret-project");
        assert_eq!(entry.reason, "codename leak");
        assert!(blocklist.find("nothing listed").is_none());
    }

    #[test]
    fn test_hits_counter() {
        let blocklist = Blocklist::new();
        blocklist.add("tracked", "test").unwrap();

        blocklist.check("tracked once");
        blocklist.check("tracked twice");
        blocklist.check("no match");

        let entry = &blocklist.entries()[0];
        assert_eq!(entry.hits.get(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let blocklist = Blocklist::new();
        blocklist.add("one", "a").unwrap();
        blocklist.add("two", "b").unwrap();

        blocklist.remove("ONE").unwrap();
        assert_eq!(blocklist.len(), 1);
        assert!(!blocklist.check("one left?"));
        assert!(blocklist.check("two left?"));
        assert!(matches!(
            blocklist.remove("one"),
            Err(FenceError::EntryNotFound(_))
        ));

        blocklist.clear();
        assert!(blocklist.is_empty());
        assert!(!blocklist.check("two left?"));
    }

    #[test]
    fn test_empty_blocklist_never_matches() {
        let blocklist = Blocklist::new();
        assert!(!blocklist.check(""));
        assert!(!blocklist.check("anything at all"));
    }
}
