//! Daemon process flags and their normalized runtime settings.
//!
//! The flag surface is deliberately small: everything project-specific lives
//! in the marker file, while these flags only shape the process itself
//! (port, persistence, verbosity, discovery-file writing).

use std::time::Duration;

use clap::Parser;

use crate::defaults::DEFAULT_IDLE_SECONDS;
use crate::logging::LogFormat;

/// Command-line options accepted by the daemon binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "perchd", version, about = "Per-project code-analysis daemon")]
pub struct DaemonOptions {
    /// Bind this exact port instead of an ephemeral one.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Keep running even when no requests arrive.
    #[arg(long)]
    pub persistent: bool,

    /// Enable debug logging and engine diagnostics.
    #[arg(long)]
    pub verbose: bool,

    /// Do not advertise the bound port in the project root.
    #[arg(long = "no-port-file")]
    pub no_port_file: bool,

    /// Seconds of inactivity before a non-persistent daemon exits.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_IDLE_SECONDS)]
    pub idle_timeout: u64,

    /// Log output format.
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::default())]
    pub log_format: LogFormat,
}

/// Preference for the listener port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPreference {
    /// Let the platform pick a free port.
    Ephemeral,
    /// Bind exactly this port.
    Explicit(u16),
}

impl PortPreference {
    /// Port number handed to the bind call.
    #[must_use]
    pub fn bind_port(self) -> u16 {
        match self {
            Self::Ephemeral => 0,
            Self::Explicit(port) => port,
        }
    }
}

/// Normalized daemon settings derived from the process flags.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    /// Listener port preference.
    pub port: PortPreference,
    /// Whether idle expiry is ignored.
    pub persistent: bool,
    /// Whether debug logging and engine diagnostics are enabled.
    pub verbose: bool,
    /// Whether the port discovery file is written after binding.
    pub write_port_file: bool,
    /// Inactivity window observed by the idle monitor.
    pub idle_window: Duration,
    /// Log output format.
    pub log_format: LogFormat,
}

impl From<DaemonOptions> for DaemonSettings {
    fn from(options: DaemonOptions) -> Self {
        let port = match options.port {
            Some(port) if port > 0 => PortPreference::Explicit(port),
            // An explicit zero asks for exactly what an ephemeral bind does.
            _ => PortPreference::Ephemeral,
        };
        Self {
            port,
            persistent: options.persistent,
            verbose: options.verbose,
            write_port_file: !options.no_port_file,
            idle_window: Duration::from_secs(options.idle_timeout),
            log_format: options.log_format,
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            port: PortPreference::Ephemeral,
            persistent: false,
            verbose: false,
            write_port_file: true,
            idle_window: Duration::from_secs(DEFAULT_IDLE_SECONDS),
            log_format: LogFormat::default(),
        }
    }
}
