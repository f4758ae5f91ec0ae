//! Daemon launch sequencing.
//!
//! Startup is strictly ordered: telemetry, then project discovery (the only
//! fatal configuration point, before anything binds), then dependency
//! resolution and engine construction, then the bind, the port
//! advertisement, and finally the serve loop. Shutdown is the mirror image
//! and runs once, whichever of idle expiry or a termination signal fires
//! first.

use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use perch_config::{
    DaemonOptions, DaemonSettings, ProjectConfigError, discover, shared_defs_dir,
};
use perch_engine::{EngineError, EngineFactory, EngineSettings, StubEngineFactory, builtin_registry};

use crate::engine_bridge::{EngineBridge, ProjectFileLoader};
use crate::http::{HttpBridge, HttpBridgeError, RequestHandler};
use crate::idle::IdleMonitor;
use crate::lifecycle::{ShutdownLatch, SignalError, listen_for_signals};
use crate::port_file::PortFile;
use crate::resolver::{resolve_libraries, resolve_plugins};
use crate::telemetry::{self, TelemetryError};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors surfaced while launching the daemon.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Working directory could not be determined.
    #[error("failed to determine working directory: {source}")]
    WorkingDir {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// Project configuration failed to load.
    #[error(transparent)]
    Configuration(#[from] ProjectConfigError),
    /// Engine construction failed.
    #[error("failed to construct analysis engine: {0}")]
    Engine(#[from] EngineError),
    /// HTTP listener failed.
    #[error(transparent)]
    Http(#[from] HttpBridgeError),
    /// Signal handlers failed to install.
    #[error(transparent)]
    Signals(#[from] SignalError),
    /// Port file could not be written.
    #[error("failed to write port file: {source}")]
    PortFile {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Collaborators required to launch the daemon runtime.
pub struct LaunchPlan {
    /// Normalised process settings.
    pub settings: DaemonSettings,
    /// Directory project discovery starts from.
    pub start_dir: PathBuf,
    /// Factory building the engine collaborator.
    pub factory: Box<dyn EngineFactory + Send + Sync>,
    /// Latch that ends the serve loop.
    pub latch: ShutdownLatch,
}

/// Runs the daemon with the production collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] when any startup stage fails; serving itself
/// only ends through the shutdown latch.
pub fn run_daemon(options: DaemonOptions) -> Result<(), LaunchError> {
    let start_dir = env::current_dir().map_err(|source| LaunchError::WorkingDir { source })?;
    let latch = ShutdownLatch::new();
    listen_for_signals(latch.clone())?;
    run_daemon_with(LaunchPlan {
        settings: DaemonSettings::from(options),
        start_dir,
        factory: Box::new(StubEngineFactory),
        latch,
    })
}

/// Runs the daemon with injected collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] when any startup stage fails.
pub fn run_daemon_with(plan: LaunchPlan) -> Result<(), LaunchError> {
    let LaunchPlan {
        settings,
        start_dir,
        factory,
        latch,
    } = plan;

    telemetry::initialise(&settings)?;
    info!(target: PROCESS_TARGET, "starting daemon runtime");

    let project = discover(&start_dir)?;
    info!(
        target: PROCESS_TARGET,
        root = %project.root.display(),
        "project discovered"
    );

    let registry = builtin_registry();
    let definitions = resolve_libraries(&project.root, &shared_defs_dir(), &project.config);
    let plugins = resolve_plugins(&registry, &project.config);

    let bridge = EngineBridge::new(
        factory.as_ref(),
        EngineSettings {
            loader: Arc::new(ProjectFileLoader::new(project.root.clone())),
            definitions,
            plugins,
            debug: settings.verbose,
            project_root: project.root.clone(),
        },
    )?;
    bridge.register_eager_files(project.config.load_eagerly.files());

    let listener = HttpBridge::bind(settings.port)?;
    let port_guard = if settings.write_port_file {
        let guard = PortFile::publish(&project.root, listener.port())
            .map_err(|source| LaunchError::PortFile { source })?;
        Some(guard)
    } else {
        None
    };

    let idle = IdleMonitor::start(settings.idle_window, settings.persistent, latch.clone());
    let serving = listener.start(RequestHandler::new(bridge, idle.clone()));

    let cause = latch.wait();
    info!(target: PROCESS_TARGET, cause = %cause, "shutting down");

    idle.stop();
    serving.shutdown();
    if let Err(error) = serving.join() {
        warn!(
            target: PROCESS_TARGET,
            error = %error,
            "listener did not stop cleanly"
        );
    }
    drop(port_guard);
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
