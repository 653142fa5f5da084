//! Domain Layer - Request, payload and session types.
//!
//! This layer contains the pure types of the connector: what a caller can
//! ask the backend, what goes over the wire, and the session state machine.
//! Nothing here performs I/O.

/// Agent request variants (threaded chat turn, market summary turn).
pub mod request;

/// Wire payload construction.
pub mod payload;

/// Session record and lifecycle state machine.
pub mod session;
