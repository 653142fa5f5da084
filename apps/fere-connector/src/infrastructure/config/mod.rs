//! Configuration Module
//!
//! Environment-driven configuration for the connector binary and clients.

mod settings;

pub use settings::{
    ConfigError, ConnectorConfig, Credentials, DEFAULT_HOST, DEFAULT_REST_BASE_URL,
    EndpointSettings, RequestSettings, RestSettings,
};
