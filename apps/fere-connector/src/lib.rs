#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Fere Connector - Streaming Agent Client
//!
//! Opens one WebSocket session per request to the Fere AI backend, sends a
//! single JSON payload, and streams the decoded response frames back until
//! the session closes. Also wraps the managed trading-agent REST API.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: Request and payload types, session state machine
//!   - `request`: Agent kinds and the two request variants
//!   - `payload`: Wire payload construction
//!   - `session`: Session lifecycle and close causes
//!
//! - **Application**: Port definitions and session services
//!   - `ports`: Connector and transport interfaces
//!   - `services`: Session manager, response dispatcher, idle timeout
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `fere`: Endpoint resolution, WebSocket transport, streaming client
//!   - `rest`: Trading-agent REST client
//!   - `config`: Environment-driven configuration
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//! AgentRequest ──► PayloadBuilder ──► WirePayload ──┐
//!                                                    ▼
//! EndpointResolver ──► URL ──► SessionManager ◄──► WebSocket
//!                                   │
//!                                   ▼
//!                   SessionEvent stream ──► caller
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Request, payload and session types with no I/O.
pub mod domain;

/// Application layer - Ports and session services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::payload::{PayloadBuilder, RootSentinel, WireParent, WirePayload};
pub use domain::request::{
    AgentKind, AgentRequest, ConfigurationError, MarketSummaryTurn, ParentId, ThreadedChatTurn,
};
pub use domain::session::{CloseCause, Session, SessionState};

// Session services
pub use application::ports::{CloseInfo, Connector, InboundFrame, Transport, TransportEvent};
pub use application::services::{
    CloseReport, DecodeFailure, IdleTimeoutConfig, ResponseDispatcher, SessionError, SessionEvent,
    SessionHandle, SessionManager, SessionSettings,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, ConnectorConfig, Credentials};

// Streaming client
pub use infrastructure::fere::{
    EndpointResolver, RunningSession, StreamingClient, WsConnector, WsConnectorConfig,
};

// REST client
pub use infrastructure::rest::{CreateAgentParams, TradingAgentClient, UpdateAgentParams};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
