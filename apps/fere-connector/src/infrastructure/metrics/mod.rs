//! Prometheus Metrics Module
//!
//! Records connector metrics through the `metrics` facade. Without an
//! installed recorder every call is a no-op, so library users pay nothing
//! unless the binary enables the exporter.
//!
//! # Metrics Categories
//!
//! - **Sessions**: opened, closed by cause, connect failures
//! - **Frames**: decoded frames, decode failures, transport errors
//! - **REST**: trading-agent API calls by operation and outcome
//!
//! # Integration
//!
//! When `FERE_METRICS_PORT` is non-zero the binary serves `/metrics` on
//! that port.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::domain::request::AgentKind;
use crate::domain::session::CloseCause;

// =============================================================================
// Exporter
// =============================================================================

static EXPORTER_PORT: OnceLock<u16> = OnceLock::new();

/// Install the Prometheus exporter on `port`. `0` leaves metrics disabled.
///
/// Returns `true` if an exporter is running after the call. Calling again
/// after a successful install is a no-op.
///
/// # Errors
///
/// Returns an error if the recorder or HTTP listener cannot be installed.
/// Must be called from within a tokio runtime.
pub fn init_metrics(port: u16) -> Result<bool, BuildError> {
    if port == 0 {
        return Ok(EXPORTER_PORT.get().is_some());
    }
    if EXPORTER_PORT.get().is_some() {
        return Ok(true);
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    if EXPORTER_PORT.set(port).is_err() {
        tracing::debug!(port, "Metrics exporter port already recorded");
    }

    register_metrics();
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(true)
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "fere_sessions_opened_total",
        "Streaming sessions that reached Open"
    );
    describe_counter!(
        "fere_sessions_closed_total",
        "Streaming sessions that reached Closed, by cause"
    );
    describe_counter!(
        "fere_connect_failures_total",
        "Streaming sessions whose transport failed to establish"
    );
    describe_counter!(
        "fere_frames_received_total",
        "Inbound frames decoded successfully"
    );
    describe_counter!(
        "fere_decode_failures_total",
        "Inbound frames that were not valid JSON"
    );
    describe_counter!(
        "fere_transport_errors_total",
        "Transport errors reported while a session was Open"
    );
    describe_counter!(
        "fere_rest_requests_total",
        "Trading-agent REST calls by operation and outcome"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for REST calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestOutcome {
    /// 2xx response with a decodable body.
    Success,
    /// Non-2xx response.
    Status,
    /// Network or decode failure.
    Failed,
}

impl RestOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Status => "status",
            Self::Failed => "failed",
        }
    }
}

const fn agent_label(agent: AgentKind) -> &'static str {
    match agent {
        AgentKind::ProAgent => "pro_agent",
        AgentKind::MarketAnalyzer => "market_analyzer",
    }
}

/// Record a session entering Open.
pub fn record_session_opened(agent: AgentKind) {
    counter!("fere_sessions_opened_total", "agent" => agent_label(agent)).increment(1);
}

/// Record a session reaching Closed.
pub fn record_session_closed(agent: AgentKind, cause: CloseCause) {
    counter!(
        "fere_sessions_closed_total",
        "agent" => agent_label(agent),
        "cause" => cause.as_str()
    )
    .increment(1);
}

/// Record a failed connection attempt.
pub fn record_connect_failure(agent: AgentKind) {
    counter!("fere_connect_failures_total", "agent" => agent_label(agent)).increment(1);
}

/// Record a decoded frame.
pub fn record_frame_received(agent: AgentKind) {
    counter!("fere_frames_received_total", "agent" => agent_label(agent)).increment(1);
}

/// Record a frame that failed to decode.
pub fn record_decode_failure(agent: AgentKind) {
    counter!("fere_decode_failures_total", "agent" => agent_label(agent)).increment(1);
}

/// Record a transport error while Open.
pub fn record_transport_error(agent: AgentKind) {
    counter!("fere_transport_errors_total", "agent" => agent_label(agent)).increment(1);
}

/// Record a REST call.
pub fn record_rest_request(operation: &'static str, outcome: RestOutcome) {
    counter!(
        "fere_rest_requests_total",
        "operation" => operation,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
