//! Streaming Client
//!
//! Entry point for callers: resolves the endpoint for a request, spawns a
//! [`SessionManager`] on the runtime, and hands back everything needed to
//! observe and close the session.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::endpoint::EndpointResolver;
use super::websocket::{WsConnector, WsConnectorConfig};
use crate::application::ports::Connector;
use crate::application::services::{
    CloseReport, SessionError, SessionEvent, SessionHandle, SessionManager, SessionSettings,
};
use crate::domain::payload::PayloadBuilder;
use crate::domain::request::{AgentRequest, ConfigurationError};
use crate::infrastructure::config::{ConnectorConfig, Credentials};

/// Buffered session events before the session task waits on the caller.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A spawned session.
#[derive(Debug)]
pub struct RunningSession {
    /// Observe state and request close.
    pub handle: SessionHandle,
    /// Session events, ending with `SessionEvent::Closed`.
    pub events: mpsc::Receiver<SessionEvent>,
    /// The session task.
    pub task: JoinHandle<Result<CloseReport, SessionError>>,
}

/// Starts streaming sessions against one backend.
#[derive(Debug, Clone)]
pub struct StreamingClient<C = WsConnector> {
    connector: C,
    resolver: EndpointResolver,
    host: String,
    credentials: Credentials,
    builder: PayloadBuilder,
    settings: SessionSettings,
}

impl StreamingClient<WsConnector> {
    /// Create a WebSocket client from configuration.
    #[must_use]
    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self::with_connector(
            WsConnector::new(WsConnectorConfig::default()),
            config.credentials.clone(),
            config.endpoint.host.clone(),
        )
        .with_resolver(EndpointResolver::new(
            config.endpoint.chat_path.clone(),
            config.endpoint.summary_path.clone(),
        ))
        .with_payload_builder(config.request.payload_builder())
        .with_settings(config.session)
    }
}

impl<C> StreamingClient<C>
where
    C: Connector + Clone + 'static,
    C::Transport: 'static,
{
    /// Create a client over a custom connector with default paths, timing,
    /// and root representation.
    #[must_use]
    pub fn with_connector(connector: C, credentials: Credentials, host: impl Into<String>) -> Self {
        Self {
            connector,
            resolver: EndpointResolver::default(),
            host: host.into(),
            credentials,
            builder: PayloadBuilder::default(),
            settings: SessionSettings::default(),
        }
    }

    /// Replace the endpoint resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: EndpointResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the payload builder.
    #[must_use]
    pub const fn with_payload_builder(mut self, builder: PayloadBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Replace the session timing.
    #[must_use]
    pub const fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start a session for `request`.
    ///
    /// The endpoint is resolved before anything touches the network. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the endpoint cannot be resolved.
    pub fn start(
        &self,
        request: impl Into<AgentRequest>,
    ) -> Result<RunningSession, ConfigurationError> {
        let request = request.into();
        let url = self.resolver.endpoint(
            request.kind(),
            &self.host,
            self.credentials.user_id(),
            self.credentials.api_key(),
        )?;

        let (event_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let manager = SessionManager::new(
            self.connector.clone(),
            url,
            request,
            self.builder,
            self.settings,
            event_tx,
        );
        let handle = manager.handle();
        let task = tokio::spawn(manager.run());

        Ok(RunningSession {
            handle,
            events,
            task,
        })
    }
}
