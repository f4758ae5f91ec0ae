//! Listener and accept loop for the HTTP bridge.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tiny_http::Server;
use tracing::{info, warn};

use perch_config::PortPreference;

use super::HTTP_TARGET;
use super::handler::RequestHandler;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Errors raised while standing up or tearing down the HTTP listener.
#[derive(Debug, Error)]
pub enum HttpBridgeError {
    /// Binding the loopback listener failed.
    #[error("failed to bind 127.0.0.1:{port}: {message}")]
    Bind {
        /// Requested port (zero for ephemeral).
        port: u16,
        /// Description reported by the listener.
        message: String,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}

/// Loopback HTTP listener bound for this project's daemon.
pub struct HttpBridge {
    server: Arc<Server>,
    port: u16,
}

impl HttpBridge {
    /// Binds the listener on the loopback interface.
    ///
    /// An explicit preference binds exactly that port; otherwise the
    /// platform chooses an ephemeral one.
    ///
    /// # Errors
    ///
    /// Returns [`HttpBridgeError::Bind`] when the bind fails, including when
    /// an explicitly requested port is already in use.
    pub fn bind(preference: PortPreference) -> Result<Self, HttpBridgeError> {
        let requested = preference.bind_port();
        let server = Server::http(("127.0.0.1", requested)).map_err(|error| {
            HttpBridgeError::Bind {
                port: requested,
                message: error.to_string(),
            }
        })?;
        let port = server.server_addr().port();
        info!(target: HTTP_TARGET, port, "listener bound on loopback");
        Ok(Self {
            server: Arc::new(server),
            port,
        })
    }

    /// Port the listener actually bound.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Starts serving on a background accept thread.
    ///
    /// Each accepted request is handed to its own handler thread so one
    /// slow request never blocks the others.
    pub fn start(&self, handler: RequestHandler) -> HttpBridgeHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let server = Arc::clone(&self.server);
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || accept_loop(&server, &flag, &handler));
        HttpBridgeHandle {
            shutdown,
            handle: Some(handle),
        }
    }
}

/// Handle to the background accept thread.
pub struct HttpBridgeHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl HttpBridgeHandle {
    /// Signals the accept loop to stop after its current poll.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept thread to finish.
    ///
    /// # Errors
    ///
    /// Returns [`HttpBridgeError::ThreadPanic`] when the thread panicked.
    pub fn join(mut self) -> Result<(), HttpBridgeError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| HttpBridgeError::ThreadPanic)?;
        }
        Ok(())
    }
}

impl Drop for HttpBridgeHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn accept_loop(server: &Server, shutdown: &AtomicBool, handler: &RequestHandler) {
    info!(target: HTTP_TARGET, "http bridge serving");
    while !shutdown.load(Ordering::SeqCst) {
        match server.try_recv() {
            Ok(Some(request)) => {
                let handler = handler.clone();
                thread::spawn(move || handler.handle(request));
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                warn!(target: HTTP_TARGET, error = %error, "listener receive error");
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: HTTP_TARGET, "http bridge stopped");
}
