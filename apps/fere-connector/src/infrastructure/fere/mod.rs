//! Fere Streaming Adapters
//!
//! - **Endpoint**: agent kind to WebSocket URL
//! - **WebSocket**: `tokio-tungstenite` transport behind the session ports
//! - **Client**: spawns sessions for callers

pub mod client;
pub mod endpoint;
pub mod websocket;

pub use client::{RunningSession, StreamingClient};
pub use endpoint::{EndpointResolver, redact};
pub use websocket::{WsConnector, WsConnectorConfig, WsTransport};
