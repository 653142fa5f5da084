//! Application Layer - Session services and port definitions.
//!
//! This layer contains the session manager and the services it composes,
//! plus the transport ports they drive.

/// Port interfaces for external systems (transport, connector).
pub mod ports;

/// Application services: session manager, frame dispatch, idle timeout.
pub mod services;
