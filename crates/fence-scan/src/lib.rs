//! OpenFence Scan - blocklist and canary-token detection
//!
//! Two payload scanners that callers compose alongside policy
//! evaluation:
//! - `Blocklist`: case-insensitive literal denylist, one automaton
//!   pass per check regardless of entry count
//! - `CanaryRegistry`: planted bait values whose appearance in model
//!   output means content leaked
//!
//! Both publish their compiled automata through `arc-swap`, so scans
//! never block behind mutations.

#![warn(missing_docs)]

pub mod blocklist;
pub mod canary;

pub use blocklist::{BlockEntry, Blocklist};
pub use canary::{CanaryHit, CanaryKind, CanaryRegistry, CanaryToken};
