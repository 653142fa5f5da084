//! Fere Connector Binary
//!
//! Runs one streaming session against the Fere AI backend and logs every
//! event until the session closes.
//!
//! # Usage
//!
//! ```bash
//! FERE_QUERY="What is moving in SOL today?" cargo run --bin fere-connector
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FERE_API_KEY`: API key, sent as `X-FRIDAY-KEY`
//! - `FERE_USER_ID`: Fere user id
//!
//! ## Optional
//! - `FERE_HOST`: Streaming host (default: api.fereai.xyz)
//! - `FERE_AGENT`: ProAgent | MarketAnalyzerAgent (default: ProAgent)
//! - `FERE_QUERY`: Chat query text (default: empty)
//! - `FERE_PARENT_ID`: Continuation token of the prior turn (default: root)
//! - `FERE_CONTEXT_HOURS`: Market context window in hours (default: 1)
//! - `FERE_STREAM`: Request incremental frames (default: true)
//! - `FERE_ROOT_PARENT`: text | number (default: text)
//! - `FERE_IDLE_TIMEOUT_SECS`: Idle window after open (default: 300)
//! - `FERE_CLOSE_TIMEOUT_SECS`: Close handshake wait (default: 5)
//! - `FERE_CHAT_WS_PATH` / `FERE_SUMMARY_WS_PATH`: Endpoint path prefixes
//! - `FERE_METRICS_PORT`: Prometheus metrics port (default: 0, disabled)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: fere-connector)
//! - `RUST_LOG`: Log filter (default: fere_connector=info)

use anyhow::Context;
use fere_connector::infrastructure::fere::endpoint::redact;
use fere_connector::infrastructure::telemetry;
use fere_connector::{
    ConnectorConfig, EndpointResolver, RunningSession, SessionEvent, StreamingClient, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialise telemetry")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Fere connector");

    let config = ConnectorConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    init_metrics(config.metrics_port).context("failed to start metrics exporter")?;

    let client = StreamingClient::from_config(&config);
    let RunningSession {
        handle,
        mut events,
        task,
    } = client
        .start(config.request.to_request())
        .context("failed to resolve agent endpoint")?;

    let shutdown_token = CancellationToken::new();
    tokio::spawn(await_shutdown(shutdown_token.clone()));

    loop {
        tokio::select! {
            () = shutdown_token.cancelled(), if !handle.is_close_requested() => {
                handle.close();
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                log_event(&event);
            }
        }
    }

    let report = task.await.context("session task panicked")??;
    tracing::info!(
        session_id = %report.session_id,
        cause = %report.cause,
        frames = report.frames_received,
        decode_failures = report.decode_failures,
        "Fere connector finished"
    );

    Ok(())
}

/// Log one session event.
fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Opened { session_id } => {
            tracing::info!(%session_id, "Session open");
        }
        SessionEvent::PayloadSent { bytes } => {
            tracing::debug!(bytes, "Request sent");
        }
        SessionEvent::Frame(value) => {
            tracing::info!(frame = %value, "Response frame");
        }
        SessionEvent::DecodeFailure(failure) => {
            tracing::warn!(error = %failure.error, raw = %failure.preview(), "Undecodable frame");
        }
        SessionEvent::TransportError(error) => {
            tracing::warn!(%error, "Transport error");
        }
        SessionEvent::ConnectFailed(error) => {
            tracing::error!(%error, "Connection failed");
        }
        SessionEvent::Closed(report) => {
            tracing::info!(
                session_id = %report.session_id,
                cause = %report.cause,
                code = ?report.close.code,
                reason = %report.close.reason,
                "Session closed"
            );
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ConnectorConfig) {
    tracing::info!(
        host = %config.endpoint.host,
        agent = %config.request.agent,
        context_hours = config.request.context_hours,
        stream = config.request.stream,
        root_parent = config.request.root_parent.as_str(),
        idle_timeout_secs = config.session.idle.idle_window.as_secs(),
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );

    let resolver = EndpointResolver::new(
        config.endpoint.chat_path.clone(),
        config.endpoint.summary_path.clone(),
    );
    if let Ok(url) = resolver.endpoint(
        config.request.agent,
        &config.endpoint.host,
        config.credentials.user_id(),
        config.credentials.api_key(),
    ) {
        tracing::debug!(url = %redact(&url), "Agent endpoint");
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, closing session");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, closing session");
        }
    }

    shutdown_token.cancel();
}
