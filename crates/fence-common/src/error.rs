//! Error types for OpenFence

use thiserror::Error;

/// OpenFence error type
#[derive(Error, Debug)]
pub enum FenceError {
    /// Zone name already registered
    #[error("zone already exists: {0}")]
    ZoneExists(String),

    /// Zone not found
    #[error("zone not found: {0}")]
    ZoneNotFound(String),

    /// Rule key (acl, number) already present
    #[error("rule already exists: acl {acl:#06x} number {number}")]
    RuleExists {
        /// ACL bitmask of the colliding rule
        acl: u32,
        /// Priority number of the colliding rule
        number: u32,
    },

    /// Rule not found
    #[error("rule not found: acl {acl:#06x} number {number}")]
    RuleNotFound {
        /// ACL bitmask searched for
        acl: u32,
        /// Priority number searched for
        number: u32,
    },

    /// Pattern failed to compile
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Pattern exceeds the length cap
    #[error("pattern too long: {len} bytes (max {max})")]
    PatternTooLong {
        /// Offending pattern length
        len: usize,
        /// Maximum accepted length
        max: usize,
    },

    /// Blocklist entry already present
    #[error("blocklist entry already exists: {0}")]
    EntryExists(String),

    /// Blocklist entry not found
    #[error("blocklist entry not found: {0}")]
    EntryNotFound(String),

    /// Canary token not found
    #[error("canary token not found: {0}")]
    TokenNotFound(String),

    /// Caller-supplied argument rejected
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for OpenFence
pub type FenceResult<T> = Result<T, FenceError>;
