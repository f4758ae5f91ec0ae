//! Configuration surface shared by the perch daemon and its collaborators.
//!
//! The crate covers three concerns: discovering the project root and its
//! marker-file configuration ([`project`]), normalizing the daemon's process
//! flags into settings ([`settings`]), and the conventions both sides of the
//! daemon agree on ([`defaults`], [`logging`]).

mod defaults;
mod logging;
mod project;
mod settings;

pub use defaults::{
    BASELINE_LIBRARY, DEFAULT_IDLE_SECONDS, DEFAULT_LOG_FILTER, DEFINITION_SUFFIX,
    DEFS_DIR_ENV_VAR, LOG_FILTER_ENV_VAR, PORT_FILE_NAME, PROJECT_MARKER_FILE, shared_defs_dir,
};
pub use logging::{LogFormat, LogFormatParseError, log_filter};
pub use project::{
    EagerLoad, Project, ProjectConfig, ProjectConfigError, discover, find_project_root,
    load_config,
};
pub use settings::{DaemonOptions, DaemonSettings, PortPreference};
