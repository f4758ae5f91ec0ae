use std::env;
use std::path::PathBuf;

/// Marker file whose presence identifies a directory as a project root.
pub const PROJECT_MARKER_FILE: &str = ".perch-project";

/// Discovery file advertising the daemon's bound port to same-project clients.
pub const PORT_FILE_NAME: &str = ".perch-port";

/// Library identifier implied when a project enables `ecmaScript`.
pub const BASELINE_LIBRARY: &str = "ecmascript";

/// File suffix carried by library definition documents.
pub const DEFINITION_SUFFIX: &str = ".json";

/// Seconds of inactivity after which a non-persistent daemon exits.
pub const DEFAULT_IDLE_SECONDS: u64 = 300;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable overriding the default log filter.
pub const LOG_FILTER_ENV_VAR: &str = "PERCH_LOG";

/// Environment variable overriding the shared definitions directory.
pub const DEFS_DIR_ENV_VAR: &str = "PERCH_DEFS_DIR";

/// Computes the shared built-in definitions directory.
///
/// `PERCH_DEFS_DIR` wins when set; otherwise the platform data directory
/// hosts the installed definitions.
#[must_use]
pub fn shared_defs_dir() -> PathBuf {
    if let Some(dir) = env::var_os(DEFS_DIR_ENV_VAR) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("perch").join("defs"))
        .unwrap_or_else(|| PathBuf::from("/usr/local/share/perch/defs"))
}
