//! Session Manager
//!
//! Drives one streaming session from open to close:
//!
//! 1. **Connecting**: ask the connector for a transport
//! 2. **Open**: send the wire payload once, arm the idle timeout, then
//!    dispatch every inbound frame
//! 3. **Closing**: on caller close, idle expiry or send failure, start the
//!    close handshake and wait for it (bounded)
//! 4. **Closed**: release the transport and report
//!
//! Everything the caller needs to observe (frames, decode failures,
//! transport errors, the final close) arrives on the event channel passed
//! to [`SessionManager::new`]. The caller closes the session through a
//! [`SessionHandle`]; closing is idempotent and safe in any state.
//!
//! Event delivery never holds a session open. While Open, a blocked send
//! gives way to a close request or idle expiry and the event is dropped.
//! After Open, each send waits at most the close timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::dispatcher::{DecodeFailure, ResponseDispatcher};
use super::idle::{IdleTimeoutConfig, IdleTimeoutGuard};
use crate::application::ports::{
    CloseInfo, Connector, InboundFrame, Transport, TransportError, TransportEvent,
};
use crate::domain::payload::PayloadBuilder;
use crate::domain::request::AgentRequest;
use crate::domain::session::{CloseCause, InvalidTransition, Session, SessionState};
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that end a session abnormally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport could not be established. Terminal, not retried.
    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),

    /// The state machine was asked to take an illegal edge.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

// =============================================================================
// Session Events
// =============================================================================

/// Events delivered to the caller over the session's lifetime.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Transport established; the session is Open.
    Opened {
        /// Session identifier.
        session_id: Uuid,
    },
    /// The wire payload was sent.
    PayloadSent {
        /// Encoded payload size.
        bytes: usize,
    },
    /// A decoded response frame.
    Frame(Value),
    /// A frame that was not valid JSON. The session stays Open.
    DecodeFailure(DecodeFailure),
    /// A transport error reported while Open. Diagnostic only.
    TransportError(String),
    /// The transport could not be established.
    ConnectFailed(String),
    /// The session reached Closed. Always the last event.
    Closed(CloseReport),
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    /// Session identifier.
    pub session_id: Uuid,
    /// Why the session closed.
    pub cause: CloseCause,
    /// Close handshake details, when one was observed.
    pub close: CloseInfo,
    /// When the session entered Open.
    pub opened_at: Option<DateTime<Utc>>,
    /// Frames decoded successfully.
    pub frames_received: u64,
    /// Frames that failed to decode.
    pub decode_failures: u64,
}

// =============================================================================
// Settings
// =============================================================================

/// Session timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Idle timeout, measured from Open entry.
    pub idle: IdleTimeoutConfig,
    /// How long to wait for the peer to finish the close handshake.
    pub close_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle: IdleTimeoutConfig::default(),
            close_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// Caller-side view of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    state: Arc<RwLock<SessionState>>,
    close: CancellationToken,
}

impl SessionHandle {
    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Request the session to close. Idempotent; a no-op once Closing or
    /// Closed.
    pub fn close(&self) {
        if self.close.is_cancelled() {
            return;
        }
        tracing::debug!(session_id = %self.id, "Close requested");
        self.close.cancel();
    }

    /// Check whether a close has been requested.
    #[must_use]
    pub fn is_close_requested(&self) -> bool {
        self.close.is_cancelled()
    }
}

// =============================================================================
// Session Manager
// =============================================================================

/// How the Open phase ended.
enum OpenExit {
    /// Closed from this side; a handshake must be started.
    Local(CloseCause),
    /// The peer closed or the transport dropped.
    Remote(CloseInfo),
}

/// Owns one session's transport and state from creation to Closed.
pub struct SessionManager<C: Connector> {
    connector: C,
    session: Session,
    request: AgentRequest,
    builder: PayloadBuilder,
    dispatcher: ResponseDispatcher,
    settings: SessionSettings,
    shared_state: Arc<RwLock<SessionState>>,
    close: CancellationToken,
    idle: IdleTimeoutGuard,
    interrupted: Option<CloseCause>,
    event_tx: mpsc::Sender<SessionEvent>,
    frames_received: u64,
    decode_failures: u64,
}

impl<C: Connector> SessionManager<C> {
    /// Create a session in Connecting for `endpoint_url`.
    #[must_use]
    pub fn new(
        connector: C,
        endpoint_url: impl Into<String>,
        request: AgentRequest,
        builder: PayloadBuilder,
        settings: SessionSettings,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let session = Session::new(endpoint_url);
        let shared_state = Arc::new(RwLock::new(session.state()));

        Self {
            connector,
            session,
            request,
            builder,
            dispatcher: ResponseDispatcher::new(),
            idle: IdleTimeoutGuard::new(settings.idle),
            settings,
            shared_state,
            close: CancellationToken::new(),
            interrupted: None,
            event_tx,
            frames_received: 0,
            decode_failures: 0,
        }
    }

    /// Get a handle for observing and closing the session.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.session.id(),
            state: Arc::clone(&self.shared_state),
            close: self.close.clone(),
        }
    }

    /// Run the session to completion.
    ///
    /// Returns the close report once the session is Closed, whatever the
    /// cause. Decode failures and post-establishment transport errors are
    /// reported as events and never end the run with an error.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Connection` if the transport could not be
    /// established. The `ConnectFailed` and `Closed` events are emitted
    /// first.
    pub async fn run(mut self) -> Result<CloseReport, SessionError> {
        let session_id = self.session.id();
        let url = self.session.endpoint_url().to_string();
        tracing::info!(
            %session_id,
            agent = %self.request.kind(),
            "Connecting to agent stream"
        );

        let connected = tokio::select! {
            biased;
            () = self.close.cancelled() => None,
            result = self.connector.connect(&url) => Some(result),
        };

        let mut transport = match connected {
            None => {
                tracing::info!(%session_id, "Session closed before connecting");
                self.set_state(SessionState::Closed)?;
                return Ok(self.finish(CloseCause::Requested, CloseInfo::default()).await);
            }
            Some(Err(e)) => {
                tracing::error!(%session_id, error = %e, "Agent stream connection failed");
                metrics::record_connect_failure(self.request.kind());
                self.set_state(SessionState::Closed)?;
                self.emit(SessionEvent::ConnectFailed(e.to_string())).await;
                self.finish(CloseCause::ConnectFailed, CloseInfo::default())
                    .await;
                return Err(SessionError::Connection(e));
            }
            Some(Ok(transport)) => transport,
        };

        self.set_state(SessionState::Open)?;
        metrics::record_session_opened(self.request.kind());
        tracing::info!(%session_id, "Agent stream open");
        self.idle.start();
        self.emit(SessionEvent::Opened { session_id }).await;

        let exit = match self.send_payload(&mut transport).await {
            Ok(()) => self.pump(&mut transport).await,
            Err(e) => {
                tracing::error!(%session_id, error = %e, "Failed to send payload");
                self.emit(SessionEvent::TransportError(e.to_string())).await;
                OpenExit::Local(CloseCause::SendFailed)
            }
        };
        self.idle.cancel();

        let (cause, close) = match exit {
            OpenExit::Local(cause) => {
                if self.session.begin_close() {
                    *self.shared_state.write() = SessionState::Closing;
                    tracing::info!(%session_id, %cause, "Closing agent stream");
                }
                let close = self.close_transport(&mut transport).await;
                (cause, close)
            }
            OpenExit::Remote(close) => {
                tracing::info!(
                    %session_id,
                    code = ?close.code,
                    reason = %close.reason,
                    "Agent stream closed by server"
                );
                (CloseCause::Remote, close)
            }
        };

        drop(transport);
        self.set_state(SessionState::Closed)?;
        Ok(self.finish(cause, close).await)
    }

    /// Build and send the wire payload. Called exactly once per session.
    async fn send_payload(&mut self, transport: &mut C::Transport) -> Result<(), TransportError> {
        let payload = self.builder.build(&self.request);
        let json = payload
            .to_json()
            .map_err(|e| TransportError::Send(format!("failed to serialize payload: {e}")))?;
        let bytes = json.len();

        transport.send_text(json).await?;

        tracing::debug!(
            session_id = %self.session.id(),
            agent = payload.agent(),
            stream = payload.stream(),
            x_hours = payload.x_hours(),
            bytes,
            "Payload sent"
        );
        self.emit(SessionEvent::PayloadSent { bytes }).await;
        Ok(())
    }

    /// Dispatch inbound events until something ends the Open phase.
    async fn pump(&mut self, transport: &mut C::Transport) -> OpenExit {
        loop {
            if let Some(cause) = self.interrupted.take() {
                return OpenExit::Local(cause);
            }

            tokio::select! {
                biased;
                () = self.close.cancelled() => {
                    return OpenExit::Local(CloseCause::Requested);
                }
                () = self.idle.expired() => {
                    return OpenExit::Local(CloseCause::IdleTimeout);
                }
                event = transport.next_event() => {
                    match event {
                        Some(TransportEvent::Frame(frame)) => {
                            self.dispatch(frame).await;
                        }
                        Some(TransportEvent::Error(e)) => {
                            tracing::warn!(session_id = %self.session.id(), error = %e, "Agent stream error");
                            metrics::record_transport_error(self.request.kind());
                            self.emit(SessionEvent::TransportError(e)).await;
                        }
                        Some(TransportEvent::Closed(close)) => {
                            return OpenExit::Remote(close);
                        }
                        None => {
                            tracing::warn!(session_id = %self.session.id(), "Agent stream ended without close frame");
                            return OpenExit::Remote(CloseInfo::default());
                        }
                    }
                }
            }
        }
    }

    /// Decode one frame and forward the result.
    async fn dispatch(&mut self, frame: InboundFrame) {
        match self.dispatcher.on_frame(frame) {
            Ok(value) => {
                self.frames_received += 1;
                metrics::record_frame_received(self.request.kind());
                tracing::trace!(session_id = %self.session.id(), "Frame received");
                self.emit(SessionEvent::Frame(value)).await;
            }
            Err(failure) => {
                self.decode_failures += 1;
                metrics::record_decode_failure(self.request.kind());
                tracing::warn!(
                    session_id = %self.session.id(),
                    error = %failure.error,
                    raw = %failure.preview(),
                    "Failed to decode frame"
                );
                self.emit(SessionEvent::DecodeFailure(failure)).await;
            }
        }
    }

    /// Start the close handshake and wait (bounded) for it to finish.
    async fn close_transport(&mut self, transport: &mut C::Transport) -> CloseInfo {
        if let Err(e) = transport.close().await {
            tracing::warn!(session_id = %self.session.id(), error = %e, "Close handshake failed");
            self.emit(SessionEvent::TransportError(e.to_string())).await;
            return CloseInfo::default();
        }

        let drain = async {
            loop {
                match transport.next_event().await {
                    Some(TransportEvent::Closed(close)) => return close,
                    None => return CloseInfo::default(),
                    Some(TransportEvent::Frame(frame)) => {
                        tracing::debug!(len = frame.len(), "Dropping frame received while closing");
                    }
                    Some(TransportEvent::Error(e)) => {
                        tracing::debug!(error = %e, "Transport error while closing");
                    }
                }
            }
        };

        if let Ok(close) = tokio::time::timeout(self.settings.close_timeout, drain).await {
            close
        } else {
            tracing::warn!(
                session_id = %self.session.id(),
                timeout_secs = self.settings.close_timeout.as_secs(),
                "Close handshake timed out"
            );
            CloseInfo::default()
        }
    }

    fn set_state(&mut self, next: SessionState) -> Result<(), InvalidTransition> {
        let previous = self.session.transition(next)?;
        *self.shared_state.write() = next;
        tracing::debug!(
            session_id = %self.session.id(),
            from = %previous,
            to = %next,
            "Session state changed"
        );
        Ok(())
    }

    async fn finish(&mut self, cause: CloseCause, close: CloseInfo) -> CloseReport {
        metrics::record_session_closed(self.request.kind(), cause);
        let report = CloseReport {
            session_id: self.session.id(),
            cause,
            close,
            opened_at: self.session.opened_at(),
            frames_received: self.frames_received,
            decode_failures: self.decode_failures,
        };
        tracing::info!(
            session_id = %report.session_id,
            %cause,
            frames = report.frames_received,
            decode_failures = report.decode_failures,
            "Session closed"
        );
        self.emit(SessionEvent::Closed(report.clone())).await;
        report
    }

    /// Deliver one event to the caller.
    ///
    /// While Open, a send blocked on a full channel loses to a close request
    /// or idle expiry; the event is dropped and the cause is left for
    /// [`Self::pump`]. Otherwise the send is bounded by the close timeout.
    async fn emit(&mut self, event: SessionEvent) {
        let session_id = self.session.id();

        if self.session.state() == SessionState::Open {
            let cause = tokio::select! {
                biased;
                result = self.event_tx.send(event) => {
                    if result.is_err() {
                        tracing::debug!(%session_id, "Event receiver dropped");
                    }
                    return;
                }
                () = self.close.cancelled() => CloseCause::Requested,
                () = self.idle.expired() => CloseCause::IdleTimeout,
            };
            tracing::warn!(%session_id, %cause, "Event receiver not draining, event dropped");
            self.interrupted.get_or_insert(cause);
            return;
        }

        match tokio::time::timeout(self.settings.close_timeout, self.event_tx.send(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                tracing::debug!(%session_id, "Event receiver dropped");
            }
            Err(_) => {
                tracing::warn!(
                    %session_id,
                    timeout_secs = self.settings.close_timeout.as_secs(),
                    "Event receiver not draining, event dropped"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::domain::request::{MarketSummaryTurn, ThreadedChatTurn};

    /// Replays scripted events, then either ends or waits for close.
    struct ScriptedTransport {
        script: VecDeque<TransportEvent>,
        sent: Arc<parking_lot::Mutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
        closing: bool,
        fail_send: bool,
        hang_up: bool,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            if self.fail_send {
                return Err(TransportError::Send("broken pipe".to_string()));
            }
            self.sent.lock().push(text);
            Ok(())
        }

        async fn next_event(&mut self) -> Option<TransportEvent> {
            if let Some(event) = self.script.pop_front() {
                return Some(event);
            }
            if self.closing {
                self.closing = false;
                return Some(TransportEvent::Closed(CloseInfo::new(1000, "bye")));
            }
            if self.hang_up {
                return None;
            }
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.closing = true;
            Ok(())
        }
    }

    struct ScriptedConnector {
        script: parking_lot::Mutex<Option<VecDeque<TransportEvent>>>,
        sent: Arc<parking_lot::Mutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
        refuse: bool,
        fail_send: bool,
        hang_up: bool,
    }

    impl ScriptedConnector {
        fn new(script: Vec<TransportEvent>) -> Self {
            Self {
                script: parking_lot::Mutex::new(Some(script.into())),
                sent: Arc::default(),
                closes: Arc::default(),
                refuse: false,
                fail_send: false,
                hang_up: false,
            }
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        type Transport = ScriptedTransport;

        async fn connect(&self, _url: &str) -> Result<ScriptedTransport, TransportError> {
            if self.refuse {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            Ok(ScriptedTransport {
                script: self.script.lock().take().unwrap_or_default(),
                sent: Arc::clone(&self.sent),
                closes: Arc::clone(&self.closes),
                closing: false,
                fail_send: self.fail_send,
                hang_up: self.hang_up,
            })
        }
    }

    fn build_manager(
        connector: ScriptedConnector,
        request: AgentRequest,
    ) -> (SessionManager<ScriptedConnector>, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let manager = SessionManager::new(
            connector,
            "wss://example.test/chat/v2/ws/u1?X-FRIDAY-KEY=k",
            request,
            PayloadBuilder::default(),
            SessionSettings::default(),
            tx,
        );
        (manager, rx)
    }

    async fn collect(mut rx: mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn sends_payload_once_then_dispatches_frames() {
        let connector = ScriptedConnector::new(vec![
            TransportEvent::Frame(InboundFrame::Text(r#"{"chunk":"a"}"#.to_string())),
            TransportEvent::Frame(InboundFrame::Text(r#"{"chunk":"b"}"#.to_string())),
            TransportEvent::Closed(CloseInfo::new(1000, "done")),
        ]);
        let sent = Arc::clone(&connector.sent);
        let (manager, rx) = build_manager(
            connector,
            ThreadedChatTurn::new("hello").streamed(true).into(),
        );
        let handle = manager.handle();

        let report = manager.run().await.unwrap();
        let events = collect(rx).await;

        assert_eq!(sent.lock().len(), 1);
        let payload: Value = serde_json::from_str(&sent.lock()[0]).unwrap();
        assert_eq!(payload["message"], json!("hello"));
        assert_eq!(payload["stream"], json!(true));

        assert_eq!(report.cause, CloseCause::Remote);
        assert_eq!(report.close, CloseInfo::new(1000, "done"));
        assert_eq!(report.frames_received, 2);
        assert!(report.opened_at.is_some());
        assert_eq!(handle.state(), SessionState::Closed);

        let frames: Vec<&Value> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Frame(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(frames, vec![&json!({"chunk": "a"}), &json!({"chunk": "b"})]);
        assert!(matches!(events.first(), Some(SessionEvent::Opened { .. })));
        assert!(matches!(events.get(1), Some(SessionEvent::PayloadSent { .. })));
        assert!(matches!(events.last(), Some(SessionEvent::Closed(_))));
    }

    #[tokio::test]
    async fn decode_failure_keeps_session_open() {
        let connector = ScriptedConnector::new(vec![
            TransportEvent::Frame(InboundFrame::Text(r#"{"chunk":"#.to_string())),
            TransportEvent::Frame(InboundFrame::Text(r#"{"chunk":"ok"}"#.to_string())),
            TransportEvent::Closed(CloseInfo::new(1000, "")),
        ]);
        let (manager, rx) = build_manager(connector, MarketSummaryTurn::new(1).into());

        let report = manager.run().await.unwrap();
        let events = collect(rx).await;

        assert_eq!(report.decode_failures, 1);
        assert_eq!(report.frames_received, 1);
        let failures = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::DecodeFailure(_)))
            .count();
        assert_eq!(failures, 1);
    }

    #[tokio::test]
    async fn transport_error_does_not_close() {
        let connector = ScriptedConnector::new(vec![
            TransportEvent::Error("reset by peer".to_string()),
            TransportEvent::Frame(InboundFrame::Text("{}".to_string())),
            TransportEvent::Closed(CloseInfo::new(1006, "")),
        ]);
        let (manager, rx) = build_manager(connector, MarketSummaryTurn::new(1).into());

        let report = manager.run().await.unwrap();
        let events = collect(rx).await;

        assert_eq!(report.frames_received, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::TransportError(msg) if msg == "reset by peer")));
    }

    #[tokio::test]
    async fn abrupt_drop_goes_open_to_closed() {
        let mut connector = ScriptedConnector::new(vec![TransportEvent::Frame(
            InboundFrame::Text(r#"{"chunk":"partial"}"#.to_string()),
        )]);
        connector.hang_up = true;
        let closes = Arc::clone(&connector.closes);
        let (manager, rx) = build_manager(connector, MarketSummaryTurn::new(1).into());
        let handle = manager.handle();

        let report = manager.run().await.unwrap();
        let events = collect(rx).await;

        assert_eq!(report.cause, CloseCause::Remote);
        assert_eq!(report.close, CloseInfo::default());
        assert_eq!(report.frames_received, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        assert_eq!(handle.state(), SessionState::Closed);
        let closed = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Closed(_)))
            .count();
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn explicit_close_runs_handshake_once() {
        let connector = ScriptedConnector::new(vec![]);
        let closes = Arc::clone(&connector.closes);
        let (manager, rx) = build_manager(connector, MarketSummaryTurn::new(1).into());
        let handle = manager.handle();

        let run = tokio::spawn(manager.run());
        while handle.state() != SessionState::Open {
            tokio::task::yield_now().await;
        }
        handle.close();
        handle.close();
        let report = run.await.unwrap().unwrap();
        let events = collect(rx).await;

        assert_eq!(report.cause, CloseCause::Requested);
        assert_eq!(report.close, CloseInfo::new(1000, "bye"));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(handle.is_close_requested());
        let closed = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Closed(_)))
            .count();
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn connect_failure_is_terminal() {
        let mut connector = ScriptedConnector::new(vec![]);
        connector.refuse = true;
        let closes = Arc::clone(&connector.closes);
        let (manager, rx) = build_manager(connector, MarketSummaryTurn::new(1).into());
        let handle = manager.handle();

        let err = manager.run().await.unwrap_err();
        let events = collect(rx).await;

        assert!(matches!(err, SessionError::Connection(TransportError::Connect(_))));
        assert_eq!(handle.state(), SessionState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::ConnectFailed(_)));
        assert!(
            matches!(&events[1], SessionEvent::Closed(report) if report.cause == CloseCause::ConnectFailed)
        );
    }

    #[tokio::test]
    async fn send_failure_closes_session() {
        let mut connector = ScriptedConnector::new(vec![]);
        connector.fail_send = true;
        let closes = Arc::clone(&connector.closes);
        let (manager, rx) = build_manager(connector, MarketSummaryTurn::new(1).into());

        let report = manager.run().await.unwrap();
        let events = collect(rx).await;

        assert_eq!(report.cause, CloseCause::SendFailed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::TransportError(_))));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::PayloadSent { .. })));
    }

    #[tokio::test]
    async fn close_before_connect_skips_transport() {
        let connector = ScriptedConnector::new(vec![]);
        let sent = Arc::clone(&connector.sent);
        let (manager, rx) = build_manager(connector, MarketSummaryTurn::new(1).into());
        let handle = manager.handle();
        handle.close();
        handle.close();

        let report = manager.run().await.unwrap();
        let events = collect(rx).await;

        assert_eq!(report.cause, CloseCause::Requested);
        assert!(report.opened_at.is_none());
        assert!(sent.lock().is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(handle.state(), SessionState::Closed);
    }
}
