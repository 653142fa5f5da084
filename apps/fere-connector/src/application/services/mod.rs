//! Application Services
//!
//! Services that drive a streaming session through its lifecycle.
//!
//! - `SessionManager`: owns one connection from open to close
//! - `ResponseDispatcher`: decodes inbound frames
//! - `IdleTimeoutGuard`: forces a close after the idle window

pub mod dispatcher;
pub mod idle;
pub mod session;

pub use dispatcher::{DecodeFailure, ResponseDispatcher};
pub use idle::{IdleTimeoutConfig, IdleTimeoutGuard};
pub use session::{
    CloseReport, SessionError, SessionEvent, SessionHandle, SessionManager, SessionSettings,
};
