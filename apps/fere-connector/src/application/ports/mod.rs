//! Port Interfaces
//!
//! Defines the interfaces (ports) the session manager drives, following
//! the Hexagonal Architecture pattern. Infrastructure adapters implement
//! them; tests substitute scripted fakes.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Connector`: establishes a transport to an endpoint URL
//! - `Transport`: one established bidirectional frame stream

use async_trait::async_trait;

// =============================================================================
// Transport Types
// =============================================================================

/// A frame received from the backend, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Text frame.
    Text(String),
    /// Binary frame. The backend may send JSON this way too.
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// Frame length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Check whether the frame is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Close handshake details, surfaced for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseInfo {
    /// Close code, if the peer sent one.
    pub code: Option<u16>,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Create close details with a code and reason.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
        }
    }
}

/// Events a transport delivers while established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A data frame arrived.
    Frame(InboundFrame),
    /// A non-fatal transport error. The transport's own close is
    /// authoritative for ending the session.
    Error(String),
    /// The close handshake completed or the peer closed.
    Closed(CloseInfo),
}

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// A frame could not be sent.
    #[error("send failed: {0}")]
    Send(String),

    /// The close handshake could not be started.
    #[error("close failed: {0}")]
    Close(String),
}

// =============================================================================
// Ports
// =============================================================================

/// Establishes transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Connect to `url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` if establishment fails.
    async fn connect(&self, url: &str) -> Result<Self::Transport, TransportError>;
}

/// One established connection.
#[async_trait]
pub trait Transport: Send {
    /// Send a text frame.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Send` if the frame could not be written.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next event. `None` means the connection is gone
    /// without a close handshake.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Start the close handshake.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Close` if the close frame could not be sent.
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length() {
        assert_eq!(InboundFrame::Text("{}".to_string()).len(), 2);
        assert!(InboundFrame::Binary(Vec::new()).is_empty());
    }

    #[test]
    fn close_info_default_has_no_code() {
        let info = CloseInfo::default();
        assert_eq!(info.code, None);
        assert!(info.reason.is_empty());
        assert_eq!(CloseInfo::new(1000, "bye").code, Some(1000));
    }
}
