//! Shutdown coordination shared by signals, idle expiry, and the launch path.
//!
//! Both ways a daemon ends (the inactivity window elapsing, or an external
//! termination signal) funnel into one [`ShutdownLatch`]. The launch
//! sequence blocks on the latch and then runs a single exit-cleanup path,
//! so the two causes cannot diverge in behaviour.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Why the daemon is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The inactivity window elapsed in non-persistent mode.
    Idle,
    /// A termination signal arrived.
    Signal(i32),
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => formatter.write_str("idle timeout"),
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
        }
    }
}

/// Latch recording the first shutdown cause and waking the launch path.
///
/// Cheap to clone; all clones share the same state. The first recorded
/// cause wins, so a signal arriving during idle-driven shutdown (or the
/// reverse) cannot restart the sequence.
#[derive(Clone)]
pub struct ShutdownLatch {
    inner: Arc<(Mutex<Option<ShutdownCause>>, Condvar)>,
}

impl ShutdownLatch {
    /// Creates an untriggered latch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(None), Condvar::new())),
        }
    }

    /// Records `cause` unless a shutdown is already in progress.
    pub fn trigger(&self, cause: ShutdownCause) {
        let (state, wakeup) = &*self.inner;
        let mut current = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if current.is_none() {
            *current = Some(cause);
            wakeup.notify_all();
        }
    }

    /// Blocks until a shutdown cause is recorded.
    #[must_use]
    pub fn wait(&self) -> ShutdownCause {
        let (state, wakeup) = &*self.inner;
        let mut guard = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if let Some(cause) = *guard {
                return cause;
            }
            guard = match wakeup.wait(guard) {
                Ok(next) => next,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Waits up to `timeout` for a cause; `None` when nothing fired.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ShutdownCause> {
        let deadline = Instant::now() + timeout;
        let (state, wakeup) = &*self.inner;
        let mut guard = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if let Some(cause) = *guard {
                return Some(cause);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (next, _timed_out) = match wakeup.wait_timeout(guard, deadline - now) {
                Ok(result) => result,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard = next;
        }
    }
}

impl Default for ShutdownLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors reported by the signal listener.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Spawns a listener thread feeding termination signals into the latch.
///
/// # Errors
///
/// Returns [`SignalError::Install`] when the handlers cannot be registered.
pub fn listen_for_signals(latch: ShutdownLatch) -> Result<(), SignalError> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).map_err(|source| SignalError::Install { source })?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(
                target: LIFECYCLE_TARGET,
                signal,
                "termination signal received"
            );
            latch.trigger(ShutdownCause::Signal(signal));
        }
    });
    Ok(())
}
