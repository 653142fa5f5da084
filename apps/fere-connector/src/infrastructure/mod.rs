//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loaded from the environment.
pub mod config;

/// Fere WebSocket adapters and the streaming client.
pub mod fere;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Trading-agent REST client.
pub mod rest;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
