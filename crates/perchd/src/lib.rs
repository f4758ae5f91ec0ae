//! Per-project analysis daemon.
//!
//! `perchd` keeps one analysis engine warm per project and bridges it to
//! editor plug-ins over a loopback HTTP interface, so completions, type
//! lookups, and definition queries never pay engine startup cost per
//! keystroke. The daemon discovers the project root by walking upward to the
//! nearest `.perch-project` marker, resolves library definitions and plugins
//! with project-local copies preferred over shared ones, and advertises its
//! bound port in a `.perch-port` discovery file so concurrent editor
//! sessions share the same instance.
//!
//! Lifecycle is self-managing: every inbound request re-arms an inactivity
//! timer, and a non-persistent daemon exits once the idle window elapses.
//! Termination signals drive the same cleanup path, which removes the
//! discovery file only while it still belongs to this instance.

mod engine_bridge;
mod http;
mod idle;
mod lifecycle;
mod port_file;
mod process;
mod resolver;
mod telemetry;

pub use engine_bridge::{EngineBridge, ProjectFileLoader};
pub use http::{HttpBridge, HttpBridgeError, HttpBridgeHandle, RequestHandler};
pub use idle::IdleMonitor;
pub use lifecycle::{ShutdownCause, ShutdownLatch, SignalError, listen_for_signals};
pub use port_file::PortFile;
pub use process::{LaunchError, LaunchPlan, run_daemon, run_daemon_with};
pub use resolver::{resolve_libraries, resolve_plugins};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
