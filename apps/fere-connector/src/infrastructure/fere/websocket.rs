//! WebSocket Transport
//!
//! Implements the [`Connector`] and [`Transport`] ports over
//! `tokio-tungstenite`. TLS uses rustls with the webpki root store.
//!
//! # Protocol
//!
//! - One outbound JSON text frame per session
//! - Inbound text and binary frames are handed to the session as-is
//! - Pings are answered by tungstenite on the next read; pongs are ignored
//! - A close frame, from either side, ends the event stream

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::endpoint::redact;
use crate::application::ports::{
    CloseInfo, Connector, InboundFrame, Transport, TransportError, TransportEvent,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsConnectorConfig {
    /// Upper bound on the TCP, TLS and upgrade handshake.
    pub connect_timeout: Duration,
}

impl Default for WsConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Opens WebSocket transports.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    config: WsConnectorConfig,
}

impl WsConnector {
    /// Create a connector.
    #[must_use]
    pub const fn new(config: WsConnectorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport, TransportError> {
        tracing::debug!(url = %redact(url), "Opening WebSocket");

        let (stream, response) =
            tokio::time::timeout(self.config.connect_timeout, tokio_tungstenite::connect_async(url))
                .await
                .map_err(|_| {
                    TransportError::Connect(format!(
                        "timed out after {}s",
                        self.config.connect_timeout.as_secs()
                    ))
                })?
                .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(status = %response.status(), "WebSocket established");
        Ok(WsTransport::new(stream))
    }
}

/// One WebSocket connection.
pub struct WsTransport {
    stream: WsStream,
    broken: bool,
}

impl WsTransport {
    const fn new(stream: WsStream) -> Self {
        Self {
            stream,
            broken: false,
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        // tungstenite errors leave the connection unusable; report once, then end.
        if self.broken {
            return None;
        }

        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(TransportEvent::Frame(InboundFrame::Text(
                        text.as_str().to_owned(),
                    )));
                }
                Ok(Message::Binary(data)) => {
                    return Some(TransportEvent::Frame(InboundFrame::Binary(data.to_vec())));
                }
                Ok(Message::Close(frame)) => {
                    let info = frame.map_or_else(CloseInfo::default, |frame| {
                        CloseInfo::new(u16::from(frame.code), frame.reason.as_str())
                    });
                    tracing::debug!(code = ?info.code, reason = %info.reason, "Close frame received");
                    // Push out the queued close reply before the stream is dropped.
                    if let Err(e) = self.stream.flush().await {
                        tracing::debug!(error = %e, "Close reply not flushed");
                    }
                    return Some(TransportEvent::Closed(info));
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(e) => {
                    self.broken = true;
                    return Some(TransportEvent::Error(e.to_string()));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        match self.stream.close(Some(frame)).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Close(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_connect_timeout() {
        assert_eq!(
            WsConnectorConfig::default().connect_timeout,
            Duration::from_secs(10)
        );
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = WsConnector::default()
            .connect(&format!("ws://{addr}/chat/v2/ws/u1?X-FRIDAY-KEY=k"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn invalid_url_is_connect_error() {
        let err = WsConnector::default().connect("not a url").await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
