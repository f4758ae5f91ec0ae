//! Project discovery and marker-file configuration.
//!
//! A directory becomes a project root by containing a `.perch-project`
//! marker file: a JSON object whose recognized keys override a fixed default
//! set. Discovery walks upward from the working directory so every editor
//! session inside the project resolves to the same root, and therefore to
//! the same daemon instance.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::defaults::PROJECT_MARKER_FILE;

/// Project configuration loaded from the marker file.
///
/// Every key is optional; a key absent from the document keeps its default,
/// so a partial marker file is always valid. Unrecognized keys are ignored.
/// Only malformed JSON is rejected, and that rejection is fatal: the daemon
/// must not start with ambiguous configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Library definition identifiers resolved at startup.
    pub libs: Vec<String>,
    /// Files registered with the engine before any request arrives.
    pub load_eagerly: EagerLoad,
    /// Plugin options keyed by plugin name.
    pub plugins: BTreeMap<String, Value>,
    /// Whether the baseline ECMAScript definitions are implied.
    pub ecma_script: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            libs: Vec::new(),
            load_eagerly: EagerLoad::Disabled,
            plugins: BTreeMap::new(),
            ecma_script: true,
        }
    }
}

/// Eager-load instruction from the marker file.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EagerLoad {
    /// No files are pre-registered.
    #[default]
    Disabled,
    /// The listed files are registered with the engine at startup.
    Files(Vec<String>),
}

impl EagerLoad {
    /// Files to pre-register; empty when disabled.
    #[must_use]
    pub fn files(&self) -> &[String] {
        match self {
            Self::Disabled => &[],
            Self::Files(files) => files,
        }
    }

    /// `true` when there is nothing to pre-register.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    fn from_value(value: &Value) -> Self {
        // The marker file historically uses `false` to disable eager
        // loading; anything that is not an array of paths is treated the
        // same way rather than guessed at. Non-string entries are dropped.
        match value {
            Value::Array(entries) => {
                let files: Vec<String> = entries
                    .iter()
                    .filter_map(|entry| entry.as_str().map(str::to_owned))
                    .collect();
                if files.is_empty() {
                    Self::Disabled
                } else {
                    Self::Files(files)
                }
            }
            _ => Self::Disabled,
        }
    }
}

impl<'de> Deserialize<'de> for EagerLoad {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// A discovered project: its root directory and effective configuration.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory all relative paths resolve against.
    pub root: PathBuf,
    /// Effective configuration after default filling.
    pub config: ProjectConfig,
}

/// Errors raised while loading the marker file.
#[derive(Debug, Error)]
pub enum ProjectConfigError {
    /// Marker file could not be read.
    #[error("failed to read project file '{path}': {source}")]
    Read {
        /// Marker file location.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Marker file held malformed JSON.
    #[error("malformed project file '{path}': {source}")]
    Parse {
        /// Marker file location.
        path: PathBuf,
        /// Parser diagnostic.
        #[source]
        source: serde_json::Error,
    },
}

/// Walks upward from `start` looking for the project marker file.
///
/// Returns the first directory (including `start` itself) containing a
/// regular file named [`PROJECT_MARKER_FILE`], or `None` when the filesystem
/// root is reached without a match.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(PROJECT_MARKER_FILE).is_file() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

/// Loads the marker file found under `root` and fills defaults.
///
/// # Errors
///
/// Returns [`ProjectConfigError::Read`] when the file cannot be read and
/// [`ProjectConfigError::Parse`] when it holds malformed JSON. Both abort
/// daemon startup.
pub fn load_config(root: &Path) -> Result<ProjectConfig, ProjectConfigError> {
    let path = root.join(PROJECT_MARKER_FILE);
    let contents = fs::read_to_string(&path).map_err(|source| ProjectConfigError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ProjectConfigError::Parse { path, source })
}

/// Discovers the project governing `start`.
///
/// When no marker file exists anywhere above `start`, the defaults apply and
/// `start` itself becomes the project root.
///
/// # Errors
///
/// Propagates [`load_config`] failures for a discovered root.
pub fn discover(start: &Path) -> Result<Project, ProjectConfigError> {
    match find_project_root(start) {
        Some(root) => {
            let config = load_config(&root)?;
            Ok(Project { root, config })
        }
        None => Ok(Project {
            root: start.to_path_buf(),
            config: ProjectConfig::default(),
        }),
    }
}
