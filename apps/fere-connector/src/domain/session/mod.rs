//! Session Lifecycle
//!
//! The record of one streaming session and the edges its state may take.
//!
//! ```text
//! Connecting ──► Open ──► Closing ──► Closed
//!     │            │                    ▲
//!     │            └────────────────────┤   (transport dropped)
//!     └─────────────────────────────────┘   (establishment failed)
//! ```
//!
//! Only the session manager drives transitions. Anything else sees the
//! state through a read-only handle.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Transport requested, not yet established.
    Connecting,
    /// Established; the payload has been (or is being) sent.
    Open,
    /// Close requested, transport shutting down.
    Closing,
    /// Terminal.
    Closed,
}

impl SessionState {
    /// Check whether `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Open | Self::Closed)
                | (Self::Open, Self::Closing | Self::Closed)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Check whether the session is Closing or Closed.
    #[must_use]
    pub const fn is_closing_or_closed(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid session transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// State the session was in.
    pub from: SessionState,
    /// State that was requested.
    pub to: SessionState,
}

// =============================================================================
// Close Cause
// =============================================================================

/// Why a session left the Open state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCause {
    /// The caller asked for it.
    Requested,
    /// The idle window elapsed.
    IdleTimeout,
    /// The outbound payload could not be sent.
    SendFailed,
    /// The server closed the connection or the transport dropped.
    Remote,
    /// The transport never established.
    ConnectFailed,
}

impl CloseCause {
    /// Get the cause name (metric label).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::IdleTimeout => "idle_timeout",
            Self::SendFailed => "send_failed",
            Self::Remote => "remote",
            Self::ConnectFailed => "connect_failed",
        }
    }
}

impl fmt::Display for CloseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Session
// =============================================================================

/// One streaming session.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    endpoint_url: String,
    state: SessionState,
    opened_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session in `Connecting` for `endpoint_url`.
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint_url: endpoint_url.into(),
            state: SessionState::Connecting,
            opened_at: None,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Endpoint this session connects to.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// When the session entered `Open`.
    #[must_use]
    pub const fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    /// Move to `next`.
    ///
    /// Entering `Open` stamps `opened_at`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if `next` is not a successor of the
    /// current state.
    pub fn transition(&mut self, next: SessionState) -> Result<SessionState, InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        let previous = self.state;
        self.state = next;
        if next == SessionState::Open {
            self.opened_at = Some(Utc::now());
        }
        Ok(previous)
    }

    /// Enter `Closing` unless already on the way out.
    ///
    /// Returns `true` if this call started the close. Calling it again while
    /// Closing or Closed is a no-op.
    pub fn begin_close(&mut self) -> bool {
        match self.state {
            SessionState::Open => {
                self.state = SessionState::Closing;
                true
            }
            SessionState::Connecting | SessionState::Closing | SessionState::Closed => false,
        }
    }
}
