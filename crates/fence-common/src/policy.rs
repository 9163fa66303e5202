//! Boundary enums with stable wire codes
//!
//! The numeric codes are a contract with embedders: they appear in
//! serialized rules, exported metrics and foreign-language callers, and
//! must never be renumbered.

use serde::{Deserialize, Serialize};

/// Enforcement action for an evaluated payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    /// Let the payload through
    Allow = 0,
    /// Reject the payload
    Block = 1,
    /// Divert the payload for review
    Quarantine = 2,
    /// Let the payload through but record it
    Log = 3,
}

impl Action {
    /// Stable wire code
    #[inline(always)]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire code
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Allow),
            1 => Some(Self::Block),
            2 => Some(Self::Quarantine),
            3 => Some(Self::Log),
            _ => None,
        }
    }

    /// Human-readable label
    pub const fn name(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Block => "block",
            Self::Quarantine => "quarantine",
            Self::Log => "log",
        }
    }

    /// True for actions that stop the payload
    #[inline(always)]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Block | Self::Quarantine)
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::Allow
    }
}

/// Traffic direction relative to the protected model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// Toward the model (prompts, tool results)
    Input = 0,
    /// From the model (completions, tool calls)
    Output = 1,
}

impl Direction {
    /// Stable wire code
    #[inline(always)]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire code
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Input),
            1 => Some(Self::Output),
            _ => None,
        }
    }

    /// Human-readable label
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Input
    }
}

/// Kind of application surface a zone protects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ZoneType {
    /// Unclassified. On a rule this acts as a wildcard over all types.
    Unknown = 0,
    /// Model prompt/completion boundary
    Llm = 1,
    /// Retrieval-augmented generation pipeline
    Rag = 2,
    /// Autonomous agent loop
    Agent = 3,
    /// Tool invocation boundary
    Tool = 4,
    /// Model Context Protocol server
    Mcp = 5,
    /// External API surface
    Api = 6,
}

impl ZoneType {
    /// Every zone type in wire-code order
    pub const ALL: [ZoneType; 7] = [
        ZoneType::Unknown,
        ZoneType::Llm,
        ZoneType::Rag,
        ZoneType::Agent,
        ZoneType::Tool,
        ZoneType::Mcp,
        ZoneType::Api,
    ];

    /// Stable wire code
    #[inline(always)]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire code
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Llm),
            2 => Some(Self::Rag),
            3 => Some(Self::Agent),
            4 => Some(Self::Tool),
            5 => Some(Self::Mcp),
            6 => Some(Self::Api),
            _ => None,
        }
    }

    /// Human-readable label
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Llm => "llm",
            Self::Rag => "rag",
            Self::Agent => "agent",
            Self::Tool => "tool",
            Self::Mcp => "mcp",
            Self::Api => "api",
        }
    }
}

impl Default for ZoneType {
    fn default() -> Self {
        Self::Unknown
    }
}
