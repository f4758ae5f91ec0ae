use std::env;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{DEFAULT_LOG_FILTER, LOG_FILTER_ENV_VAR};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for editor log collectors.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolves the log filter expression for the daemon.
///
/// `--verbose` forces the debug filter; otherwise the `PERCH_LOG`
/// environment variable wins over the built-in default.
#[must_use]
pub fn log_filter(verbose: bool) -> String {
    if verbose {
        return "debug".to_owned();
    }
    env::var(LOG_FILTER_ENV_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("Compact").unwrap(), LogFormat::Compact);
        assert!(LogFormat::from_str("fancy").is_err());
    }

    #[test]
    fn verbose_forces_debug_filter() {
        assert_eq!(log_filter(true), "debug");
    }
}
