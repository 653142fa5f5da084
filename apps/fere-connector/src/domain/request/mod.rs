//! Agent Request Types
//!
//! The two request variants the backend accepts over a streaming session.
//!
//! - **ProAgent**: a threaded chat turn that may continue a prior turn
//! - **MarketAnalyzerAgent**: a market summary, always rooted
//!
//! The variant determines every field the request carries. The wire
//! representation lives in [`crate::domain::payload`].

use std::fmt;
use std::str::FromStr;

// =============================================================================
// Error Type
// =============================================================================

/// Errors raised while describing a session, before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The agent kind is not one the backend serves.
    #[error("unknown agent kind: {0}")]
    UnknownAgentKind(String),

    /// A value required to build the endpoint is missing.
    #[error("{0} cannot be empty")]
    EmptyValue(&'static str),

    /// The root sentinel representation is not recognised.
    #[error("unknown root parent representation: {0}")]
    UnknownRootSentinel(String),
}

// =============================================================================
// Agent Kind
// =============================================================================

/// The agent a session addresses. Doubles as the `agent` tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// Threaded chat/query agent.
    ProAgent,
    /// Portfolio and market summary agent.
    MarketAnalyzer,
}

impl AgentKind {
    /// Get the wire tag for this agent.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProAgent => "ProAgent",
            Self::MarketAnalyzer => "MarketAnalyzerAgent",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = ConfigurationError;

    /// Accepts the wire tag, case-insensitively, plus the short
    /// `MarketAnalyzer` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "proagent" => Ok(Self::ProAgent),
            "marketanalyzeragent" | "marketanalyzer" => Ok(Self::MarketAnalyzer),
            _ => Err(ConfigurationError::UnknownAgentKind(s.to_string())),
        }
    }
}

// =============================================================================
// Parent Linkage
// =============================================================================

/// Textual form of the root-of-thread sentinel.
pub const ROOT_PARENT_TOKEN: &str = "0";

/// Thread linkage of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentId {
    /// Start of a thread (no parent turn).
    #[default]
    Root,
    /// Continuation of the turn identified by this opaque token.
    Turn(String),
}

impl ParentId {
    /// Parse a continuation token.
    ///
    /// A blank token or the sentinel `"0"` both mean the root of a thread,
    /// so callers that carry the sentinel as text and callers that carry it
    /// as a number end up with the same value.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if Self::is_root_token(token) {
            Self::Root
        } else {
            Self::Turn(token.trim().to_string())
        }
    }

    /// Whether `token` spells the root of a thread (blank or `"0"`).
    #[must_use]
    pub fn is_root_token(token: &str) -> bool {
        let trimmed = token.trim();
        trimmed.is_empty() || trimmed == ROOT_PARENT_TOKEN
    }

    /// Check if this is the root sentinel, including a `Turn` that carries it.
    #[must_use]
    pub fn is_root(&self) -> bool {
        match self {
            Self::Root => true,
            Self::Turn(token) => Self::is_root_token(token),
        }
    }
}

impl From<&str> for ParentId {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}

// =============================================================================
// Request Variants
// =============================================================================

/// A single query/response exchange that may reference a prior turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadedChatTurn {
    /// Query text. Forwarded as-is; the backend validates content.
    pub query_text: String,
    /// Thread linkage.
    pub parent: ParentId,
    /// Hours of market context the agent should consider.
    pub context_hours: u32,
    /// Whether the backend should stream partial responses.
    /// `None` is sent as `false`.
    pub stream: Option<bool>,
}

impl ThreadedChatTurn {
    /// Create a root turn with one hour of context and streaming unspecified.
    #[must_use]
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            parent: ParentId::Root,
            context_hours: 1,
            stream: None,
        }
    }

    /// Continue the thread from `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<ParentId>) -> Self {
        self.parent = parent.into();
        self
    }

    /// Set the context window in hours.
    #[must_use]
    pub const fn with_context_hours(mut self, hours: u32) -> Self {
        self.context_hours = hours;
        self
    }

    /// Set the streaming flag.
    #[must_use]
    pub const fn streamed(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }
}

/// A stateless request for an aggregate market summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSummaryTurn {
    /// Hours of market context the summary should cover.
    pub context_hours: u32,
    /// Whether the backend should stream partial responses.
    /// `None` is sent as `false`.
    pub stream: Option<bool>,
}

impl MarketSummaryTurn {
    /// Create a summary request over `context_hours`.
    #[must_use]
    pub const fn new(context_hours: u32) -> Self {
        Self {
            context_hours,
            stream: None,
        }
    }

    /// Set the streaming flag.
    #[must_use]
    pub const fn streamed(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }
}

/// Everything a caller can ask for over one streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRequest {
    /// Threaded chat turn addressed to `ProAgent`.
    ThreadedChat(ThreadedChatTurn),
    /// Market summary addressed to `MarketAnalyzerAgent`.
    MarketSummary(MarketSummaryTurn),
}

impl AgentRequest {
    /// The agent this request addresses.
    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        match self {
            Self::ThreadedChat(_) => AgentKind::ProAgent,
            Self::MarketSummary(_) => AgentKind::MarketAnalyzer,
        }
    }

    /// Context window in hours.
    #[must_use]
    pub const fn context_hours(&self) -> u32 {
        match self {
            Self::ThreadedChat(turn) => turn.context_hours,
            Self::MarketSummary(turn) => turn.context_hours,
        }
    }

    /// Effective streaming flag (`false` when unspecified).
    #[must_use]
    pub fn stream(&self) -> bool {
        match self {
            Self::ThreadedChat(turn) => turn.stream,
            Self::MarketSummary(turn) => turn.stream,
        }
        .unwrap_or(false)
    }
}

impl From<ThreadedChatTurn> for AgentRequest {
    fn from(turn: ThreadedChatTurn) -> Self {
        Self::ThreadedChat(turn)
    }
}

impl From<MarketSummaryTurn> for AgentRequest {
    fn from(turn: MarketSummaryTurn) -> Self {
        Self::MarketSummary(turn)
    }
}
