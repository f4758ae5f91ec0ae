//! Idle lifecycle monitoring.
//!
//! The monitor is a two-state machine. It starts **Active** with the
//! inactivity window armed; every inbound request re-arms the window via
//! [`IdleMonitor::touch`], so a busy daemon stays Active indefinitely. When
//! the window elapses without activity and the daemon is not persistent,
//! the monitor transitions to **Terminating** and fires the shutdown latch,
//! which drives the same exit cleanup as a termination signal. In
//! persistent mode an elapsed window is a no-op and the monitor re-arms.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::lifecycle::{ShutdownCause, ShutdownLatch};

pub(crate) const IDLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::idle");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleState {
    Active,
    Terminating,
}

#[derive(Debug)]
struct Monitor {
    deadline: Instant,
    state: IdleState,
}

#[derive(Debug)]
struct Inner {
    monitor: Mutex<Monitor>,
    wakeup: Condvar,
    window: Duration,
    persistent: bool,
}

/// Timer-driven state machine that ends an idle daemon.
///
/// Cheap to clone; all clones share the same watcher.
#[derive(Clone)]
pub struct IdleMonitor {
    inner: Arc<Inner>,
}

impl IdleMonitor {
    /// Starts the monitor in the Active state with the window armed.
    pub fn start(window: Duration, persistent: bool, latch: ShutdownLatch) -> Self {
        let inner = Arc::new(Inner {
            monitor: Mutex::new(Monitor {
                deadline: Instant::now() + window,
                state: IdleState::Active,
            }),
            wakeup: Condvar::new(),
            window,
            persistent,
        });
        let watcher = Arc::clone(&inner);
        thread::spawn(move || watch(&watcher, &latch));
        Self { inner }
    }

    /// Re-arms the inactivity window; called for every inbound request.
    pub fn touch(&self) {
        let Ok(mut monitor) = self.inner.monitor.lock() else {
            return;
        };
        if monitor.state == IdleState::Active {
            monitor.deadline = Instant::now() + self.inner.window;
            self.inner.wakeup.notify_all();
        }
    }

    /// Stops the watcher thread; used once shutdown is underway.
    pub fn stop(&self) {
        if let Ok(mut monitor) = self.inner.monitor.lock() {
            monitor.state = IdleState::Terminating;
            self.inner.wakeup.notify_all();
        }
    }
}

fn watch(inner: &Inner, latch: &ShutdownLatch) {
    let Ok(mut monitor) = inner.monitor.lock() else {
        return;
    };
    loop {
        if monitor.state == IdleState::Terminating {
            return;
        }
        let now = Instant::now();
        if now < monitor.deadline {
            let wait = monitor.deadline - now;
            let Ok((guard, _timed_out)) = inner.wakeup.wait_timeout(monitor, wait) else {
                return;
            };
            monitor = guard;
            continue;
        }
        if inner.persistent {
            debug!(
                target: IDLE_TARGET,
                "inactivity window elapsed; persistent mode keeps the daemon alive"
            );
            monitor.deadline = now + inner.window;
            continue;
        }
        monitor.state = IdleState::Terminating;
        drop(monitor);
        info!(
            target: IDLE_TARGET,
            idle_secs = inner.window.as_secs(),
            "no activity within the idle window; shutting down"
        );
        latch.trigger(ShutdownCause::Idle);
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_into_the_latch_when_idle() {
        let latch = ShutdownLatch::new();
        let _monitor = IdleMonitor::start(Duration::from_millis(50), false, latch.clone());

        assert_eq!(
            latch.wait_timeout(Duration::from_secs(2)),
            Some(ShutdownCause::Idle)
        );
    }

    #[test]
    fn touch_keeps_the_daemon_active() {
        let latch = ShutdownLatch::new();
        let monitor = IdleMonitor::start(Duration::from_millis(200), false, latch.clone());

        for _ in 0..8 {
            thread::sleep(Duration::from_millis(50));
            monitor.touch();
        }
        assert_eq!(latch.wait_timeout(Duration::from_millis(10)), None);

        monitor.stop();
    }

    #[test]
    fn persistent_mode_never_expires() {
        let latch = ShutdownLatch::new();
        let monitor = IdleMonitor::start(Duration::from_millis(30), true, latch.clone());

        assert_eq!(latch.wait_timeout(Duration::from_millis(300)), None);

        monitor.stop();
    }

    #[test]
    fn stop_prevents_a_pending_expiry() {
        let latch = ShutdownLatch::new();
        let monitor = IdleMonitor::start(Duration::from_millis(60), false, latch.clone());

        monitor.stop();
        assert_eq!(latch.wait_timeout(Duration::from_millis(200)), None);
    }
}
