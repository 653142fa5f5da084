//! Idle Timeout Guard
//!
//! Forces a session closed once its idle window elapses. The guard is a
//! single stored timer owned by the session: it is started when the session
//! enters Open, and cancelling or dropping it stops the timer, so it never
//! outlives the session it guards.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Sleep;

/// Configuration for the idle timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimeoutConfig {
    /// Time after Open entry at which the session is closed.
    pub idle_window: Duration,
}

impl Default for IdleTimeoutConfig {
    fn default() -> Self {
        Self {
            idle_window: Duration::from_secs(5 * 60),
        }
    }
}

impl IdleTimeoutConfig {
    /// Create a configuration with a custom window.
    #[must_use]
    pub const fn new(idle_window: Duration) -> Self {
        Self { idle_window }
    }
}

/// One-shot cancellable close timer.
///
/// # Example
///
/// ```rust,no_run
/// use fere_connector::application::services::idle::{IdleTimeoutConfig, IdleTimeoutGuard};
/// use std::time::Duration;
///
/// async fn example() {
///     let mut guard = IdleTimeoutGuard::arm(IdleTimeoutConfig::new(Duration::from_secs(300)));
///
///     tokio::select! {
///         () = guard.expired() => {
///             // Close the session
///         }
///         () = tokio::time::sleep(Duration::from_secs(1)) => {
///             guard.cancel();
///         }
///     }
/// }
/// ```
#[derive(Debug)]
pub struct IdleTimeoutGuard {
    window: Duration,
    timer: Option<Pin<Box<Sleep>>>,
    cancelled: bool,
    fired: bool,
}

impl IdleTimeoutGuard {
    /// Create a guard that is not yet running.
    #[must_use]
    pub const fn new(config: IdleTimeoutConfig) -> Self {
        Self {
            window: config.idle_window,
            timer: None,
            cancelled: false,
            fired: false,
        }
    }

    /// Create a guard and start it immediately.
    #[must_use]
    pub fn arm(config: IdleTimeoutConfig) -> Self {
        let mut guard = Self::new(config);
        guard.start();
        guard
    }

    /// Start the timer. The window is measured from this call.
    ///
    /// Only the first call counts; a no-op once running, fired or cancelled.
    pub fn start(&mut self) {
        if self.timer.is_some() || self.fired || self.cancelled {
            return;
        }
        self.timer = Some(Box::pin(tokio::time::sleep(self.window)));
        tracing::debug!(
            idle_window_secs = self.window.as_secs(),
            "Idle timeout armed"
        );
    }

    /// Resolve when the window elapses.
    ///
    /// Resolves at most once. Before start, after that, or after
    /// cancellation, the future stays pending, so it can sit in a `select!`
    /// loop unconditionally. Cancel-safe.
    pub async fn expired(&mut self) {
        let Some(timer) = self.timer.as_mut() else {
            return future::pending().await;
        };

        timer.as_mut().await;
        self.timer = None;
        self.fired = true;
        tracing::info!(
            idle_window_secs = self.window.as_secs(),
            "Idle timeout elapsed"
        );
    }

    /// Stop the timer. Idempotent; a no-op once it has fired.
    pub fn cancel(&mut self) {
        if self.timer.take().is_some() {
            tracing::debug!("Idle timeout cancelled");
        }
        if !self.fired {
            self.cancelled = true;
        }
    }

    /// Check whether the timer is running.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Check whether the timer has been cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Check whether the timer fired.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }
}
