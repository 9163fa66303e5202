//! Canary token registry and leak detection
//!
//! A canary is a unique bait string planted somewhere a model can see
//! it (a system prompt, a retrieval document, a tool description). The
//! value has no legitimate reason to appear in output, so a scan hit
//! is a leak.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fence_common::{AtomicCounter, FenceError, FenceResult};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Longest canary id in bytes
pub const MAX_CANARY_ID_LEN: usize = 64;

/// Longest planted value in bytes
pub const MAX_CANARY_VALUE_LEN: usize = 256;

/// Kind of bait value `generate` mints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanaryKind {
    /// Hyphenated UUID
    Uuid,
    /// Plausible-looking address on a reserved domain
    Email,
    /// Plausible-looking document URL
    Url,
    /// 32 hex characters
    Hex,
}

/// One planted token
#[derive(Debug)]
pub struct CanaryToken {
    /// Unique registry id
    pub id: String,
    /// Planted bait value
    pub value: String,
    /// Operator description of where the bait was planted
    pub description: String,
    /// When the token was planted
    pub created_at: DateTime<Utc>,
    /// Times a scan found the value
    pub triggered: AtomicCounter,
}

/// A planted value found in scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanaryHit {
    /// Token id whose value was found
    pub id: String,
    /// Byte offset of the value in the scanned text
    pub position: usize,
}

struct CanaryIndex {
    tokens: Vec<Arc<CanaryToken>>,
    matcher: Option<AhoCorasick>,
}

impl CanaryIndex {
    fn empty() -> Self {
        Self {
            tokens: Vec::new(),
            matcher: None,
        }
    }

    fn build(tokens: Vec<Arc<CanaryToken>>) -> FenceResult<Self> {
        let matcher = if tokens.is_empty() {
            None
        } else {
            let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
            // Case-sensitive: bait values must leak verbatim to count
            let automaton = AhoCorasickBuilder::new()
                .build(&values)
                .map_err(|e| FenceError::InvalidPattern(e.to_string()))?;
            Some(automaton)
        };
        Ok(Self { tokens, matcher })
    }
}

/// Registry of planted canary tokens
///
/// Token records live in a dashmap keyed by id; the scan path reads a
/// compiled automaton over all values, published through arc-swap.
pub struct CanaryRegistry {
    tokens: DashMap<String, Arc<CanaryToken>>,
    index: ArcSwap<CanaryIndex>,
    write_lock: Mutex<()>,
}

impl CanaryRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
            index: ArcSwap::from_pointee(CanaryIndex::empty()),
            write_lock: Mutex::new(()),
        }
    }

    /// Plant a caller-chosen value; returns the token id
    pub fn create(&self, value: &str, description: &str) -> FenceResult<String> {
        let token = self.insert(value.to_string(), description)?;
        Ok(token.id.clone())
    }

    /// Mint a random bait value of the given kind and plant it
    pub fn generate(&self, kind: CanaryKind, description: &str) -> FenceResult<Arc<CanaryToken>> {
        let value = match kind {
            CanaryKind::Uuid => Uuid::new_v4().to_string(),
            CanaryKind::Email => format!("audit-{}@example.com", random_hex(8)),
            CanaryKind::Url => format!("https://example.com/doc/{}", random_hex(12)),
            CanaryKind::Hex => random_hex(16),
        };
        self.insert(value, description)
    }

    fn insert(&self, value: String, description: &str) -> FenceResult<Arc<CanaryToken>> {
        if value.is_empty() {
            return Err(FenceError::InvalidArgument("canary value is empty".into()));
        }
        if value.len() > MAX_CANARY_VALUE_LEN {
            return Err(FenceError::InvalidArgument(format!(
                "canary value exceeds {} bytes",
                MAX_CANARY_VALUE_LEN
            )));
        }
        let id = format!("canary-{}", Uuid::new_v4().simple());
        debug_assert!(id.len() <= MAX_CANARY_ID_LEN);
        let token = Arc::new(CanaryToken {
            id: id.clone(),
            value,
            description: description.to_string(),
            created_at: Utc::now(),
            triggered: AtomicCounter::new(0),
        });

        let _guard = self.write_lock.lock();
        self.tokens.insert(id.clone(), Arc::clone(&token));
        if let Err(e) = self.rebuild() {
            self.tokens.remove(&id);
            return Err(e);
        }
        tracing::info!(id = %id, "canary planted");
        Ok(token)
    }

    /// Retrieve a token by id
    pub fn get(&self, id: &str) -> Option<Arc<CanaryToken>> {
        self.tokens.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a token
    pub fn delete(&self, id: &str) -> FenceResult<()> {
        let _guard = self.write_lock.lock();
        if self.tokens.remove(id).is_none() {
            return Err(FenceError::TokenNotFound(id.to_string()));
        }
        self.rebuild()?;
        tracing::info!(id = %id, "canary removed");
        Ok(())
    }

    /// Does any planted value occur in the text
    #[inline]
    pub fn scan(&self, text: &str) -> bool {
        let index = self.index.load();
        let Some(matcher) = index.matcher.as_ref() else {
            return false;
        };
        match matcher.find(text) {
            Some(hit) => {
                index.tokens[hit.pattern().as_usize()].triggered.inc();
                true
            }
            None => false,
        }
    }

    /// Every distinct planted value found, with byte offsets
    pub fn scan_detailed(&self, text: &str) -> Vec<CanaryHit> {
        let index = self.index.load();
        let Some(matcher) = index.matcher.as_ref() else {
            return Vec::new();
        };
        let mut seen = vec![false; index.tokens.len()];
        let mut hits = Vec::new();
        for m in matcher.find_overlapping_iter(text) {
            let idx = m.pattern().as_usize();
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            let token = &index.tokens[idx];
            token.triggered.inc();
            hits.push(CanaryHit {
                id: token.id.clone(),
                position: m.start(),
            });
        }
        hits
    }

    /// Number of planted tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when nothing is planted
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Sum of trigger counts across every planted token
    pub fn triggered_total(&self) -> u64 {
        self.tokens
            .iter()
            .map(|entry| entry.value().triggered.get())
            .sum()
    }

    // Caller holds write_lock
    fn rebuild(&self) -> FenceResult<()> {
        let tokens: Vec<Arc<CanaryToken>> = self
            .tokens
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.index.store(Arc::new(CanaryIndex::build(tokens)?));
        Ok(())
    }
}

impl Default for CanaryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.gen::<u8>()))
        .collect()
}
