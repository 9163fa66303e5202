//! Zone registry keyed by name
//!
//! Zones are handed out as `Arc<Zone>` from a dashmap. The two
//! direction ACL masks live packed in a single atomic word, so an ACL
//! update is one store and a concurrent reader always sees a coherent
//! (input, output) pair.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fence_common::{AtomicCounter, Direction, FenceError, FenceResult, ZoneType};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Longest accepted zone name in bytes
pub const MAX_ZONE_NAME_LEN: usize = 64;

/// Per-zone traffic counters
#[derive(Debug, Default)]
pub struct ZoneStats {
    /// Input payloads evaluated
    pub requests_in: AtomicCounter,
    /// Output payloads evaluated
    pub requests_out: AtomicCounter,
    /// Input payloads blocked
    pub blocked_in: AtomicCounter,
    /// Output payloads blocked
    pub blocked_out: AtomicCounter,
}

impl ZoneStats {
    /// Record one evaluation against this zone
    #[inline]
    pub fn record(&self, direction: Direction, blocked: bool) {
        match direction {
            Direction::Input => {
                self.requests_in.inc();
                if blocked {
                    self.blocked_in.inc();
                }
            }
            Direction::Output => {
                self.requests_out.inc();
                if blocked {
                    self.blocked_out.inc();
                }
            }
        }
    }
}

/// Named enforcement zone
#[derive(Debug)]
pub struct Zone {
    /// Unique name, the registry key
    pub name: String,
    /// Kind of surface the zone protects
    pub zone_type: ZoneType,
    provider: RwLock<Option<String>>,
    description: RwLock<Option<String>>,
    enabled: AtomicBool,
    /// Input mask in the high word, output mask in the low word
    acls: AtomicU64,
    /// Traffic counters
    pub stats: ZoneStats,
}

impl Zone {
    fn new(name: String, zone_type: ZoneType) -> Self {
        Self {
            name,
            zone_type,
            provider: RwLock::new(None),
            description: RwLock::new(None),
            enabled: AtomicBool::new(true),
            acls: AtomicU64::new(0),
            stats: ZoneStats::default(),
        }
    }

    /// ACL mask for one direction
    #[inline(always)]
    pub fn acl(&self, direction: Direction) -> u32 {
        let packed = self.acls.load(Ordering::Acquire);
        match direction {
            Direction::Input => (packed >> 32) as u32,
            Direction::Output => packed as u32,
        }
    }

    /// Both masks as one coherent (input, output) pair
    pub fn acl_pair(&self) -> (u32, u32) {
        let packed = self.acls.load(Ordering::Acquire);
        ((packed >> 32) as u32, packed as u32)
    }

    /// Replace the mask for one direction
    pub fn set_acl(&self, direction: Direction, mask: u32) {
        let _ = self
            .acls
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
                Some(match direction {
                    Direction::Input => (packed & 0x0000_0000_FFFF_FFFF) | ((mask as u64) << 32),
                    Direction::Output => (packed & 0xFFFF_FFFF_0000_0000) | mask as u64,
                })
            });
    }

    /// Replace both masks in one store, so readers never observe a
    /// half-updated pair
    pub fn set_acls(&self, input: u32, output: u32) {
        let packed = ((input as u64) << 32) | output as u64;
        self.acls.store(packed, Ordering::Release);
    }

    /// Administrative enable flag (metadata; evaluation does not consult it)
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Flip the enable flag
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Upstream provider label
    pub fn provider(&self) -> Option<String> {
        self.provider.read().clone()
    }

    /// Set the provider label
    pub fn set_provider(&self, provider: Option<String>) {
        *self.provider.write() = provider;
    }

    /// Free-form description
    pub fn description(&self) -> Option<String> {
        self.description.read().clone()
    }

    /// Set the description
    pub fn set_description(&self, description: Option<String>) {
        *self.description.write() = description;
    }
}

/// Concurrent zone registry
pub struct ZoneRegistry {
    zones: DashMap<String, Arc<Zone>>,
}

impl ZoneRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            zones: DashMap::new(),
        }
    }

    /// Register a zone
    pub fn create(&self, name: &str, zone_type: ZoneType) -> FenceResult<Arc<Zone>> {
        if name.is_empty() {
            return Err(FenceError::InvalidArgument("zone name is empty".into()));
        }
        if name.len() > MAX_ZONE_NAME_LEN {
            return Err(FenceError::InvalidArgument(format!(
                "zone name exceeds {} bytes",
                MAX_ZONE_NAME_LEN
            )));
        }
        match self.zones.entry(name.to_string()) {
            Entry::Occupied(_) => Err(FenceError::ZoneExists(name.to_string())),
            Entry::Vacant(slot) => {
                let zone = Arc::new(Zone::new(name.to_string(), zone_type));
                slot.insert(Arc::clone(&zone));
                tracing::info!(zone = %name, zone_type = zone_type.name(), "zone registered");
                Ok(zone)
            }
        }
    }

    /// Remove a zone
    pub fn delete(&self, name: &str) -> FenceResult<()> {
        match self.zones.remove(name) {
            Some(_) => {
                tracing::info!(zone = %name, "zone removed");
                Ok(())
            }
            None => Err(FenceError::ZoneNotFound(name.to_string())),
        }
    }

    /// Find a zone by name
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<Arc<Zone>> {
        self.zones.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Replace one direction's ACL mask on a named zone
    pub fn set_acl(&self, name: &str, direction: Direction, mask: u32) -> FenceResult<()> {
        let zone = self
            .lookup(name)
            .ok_or_else(|| FenceError::ZoneNotFound(name.to_string()))?;
        zone.set_acl(direction, mask);
        tracing::info!(zone = %name, direction = direction.name(), mask, "zone ACL updated");
        Ok(())
    }

    /// Replace both ACL masks on a named zone at once
    pub fn set_acls(&self, name: &str, input: u32, output: u32) -> FenceResult<()> {
        let zone = self
            .lookup(name)
            .ok_or_else(|| FenceError::ZoneNotFound(name.to_string()))?;
        zone.set_acls(input, output);
        tracing::info!(zone = %name, input, output, "zone ACLs updated");
        Ok(())
    }

    /// Set a named zone's provider label
    pub fn set_provider(&self, name: &str, provider: Option<String>) -> FenceResult<()> {
        let zone = self
            .lookup(name)
            .ok_or_else(|| FenceError::ZoneNotFound(name.to_string()))?;
        zone.set_provider(provider);
        Ok(())
    }

    /// Set a named zone's description
    pub fn set_description(&self, name: &str, description: Option<String>) -> FenceResult<()> {
        let zone = self
            .lookup(name)
            .ok_or_else(|| FenceError::ZoneNotFound(name.to_string()))?;
        zone.set_description(description);
        Ok(())
    }

    /// Flip a named zone's enable flag
    pub fn set_enabled(&self, name: &str, enabled: bool) -> FenceResult<()> {
        let zone = self
            .lookup(name)
            .ok_or_else(|| FenceError::ZoneNotFound(name.to_string()))?;
        zone.set_enabled(enabled);
        Ok(())
    }

    /// Number of registered zones
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// True when no zone is registered
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Visit every zone
    pub fn for_each(&self, mut f: impl FnMut(&Arc<Zone>)) {
        for entry in self.zones.iter() {
            f(entry.value());
        }
    }
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}
