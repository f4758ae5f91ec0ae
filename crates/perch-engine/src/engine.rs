//! The analysis engine contract.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::definitions::LibraryDefinition;

/// Callback used by the engine to read project files on demand.
///
/// Relative names are resolved against the project root by the
/// implementation; the engine never touches the filesystem directly.
pub trait FileLoader: Send + Sync {
    /// Reads the named file as text.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FileLoad`] when the file cannot be read.
    fn load(&self, name: &str) -> Result<String, EngineError>;
}

/// Construction contract for an analysis engine instance.
pub struct EngineSettings {
    /// File-read callback resolving names against the project root.
    pub loader: Arc<dyn FileLoader>,
    /// Library definitions in resolution order; later documents may shadow
    /// declarations made by earlier ones.
    pub definitions: Vec<LibraryDefinition>,
    /// Options for each resolved plugin, keyed by canonical plugin name.
    pub plugins: BTreeMap<String, Value>,
    /// Whether the engine should emit diagnostic output.
    pub debug: bool,
    /// Project root all relative paths resolve against.
    pub project_root: PathBuf,
}

impl fmt::Debug for EngineSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EngineSettings")
            .field("definitions", &self.definitions.len())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("debug", &self.debug)
            .field("project_root", &self.project_root)
            .finish_non_exhaustive()
    }
}

/// Errors reported by an analysis engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request document does not describe a supported operation.
    #[error("unsupported request type '{kind}'")]
    UnsupportedRequest {
        /// Value of the document's `type` property.
        kind: String,
    },
    /// The request document is structurally invalid.
    #[error("malformed request document: {message}")]
    MalformedDocument {
        /// Description of the structural problem.
        message: String,
    },
    /// A file could not be loaded through the file-read callback.
    #[error("failed to load file '{name}': {source}")]
    FileLoad {
        /// Name the engine asked for.
        name: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The engine failed internally.
    #[error("engine failure: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Creates an unsupported-request error.
    #[must_use]
    pub fn unsupported_request(kind: impl Into<String>) -> Self {
        Self::UnsupportedRequest { kind: kind.into() }
    }

    /// Creates a malformed-document error.
    #[must_use]
    pub fn malformed_document(message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: message.into(),
        }
    }

    /// Creates a file-load error.
    #[must_use]
    pub fn file_load(name: impl Into<String>, source: io::Error) -> Self {
        Self::FileLoad {
            name: name.into(),
            source,
        }
    }

    /// Creates an internal engine error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// A single analysis engine instance.
///
/// Implementations must serialize or safely interleave concurrent
/// [`AnalysisEngine::request`] calls: the daemon issues them from
/// independent connection threads and holds no lock of its own around the
/// call.
pub trait AnalysisEngine: Send + Sync {
    /// Registers a file with the engine ahead of any request that needs it.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the file cannot be registered.
    fn add_file(&self, name: &str) -> Result<(), EngineError>;

    /// Runs one analysis request document to completion.
    ///
    /// Every call yields exactly one outcome: a result value or an
    /// engine-reported error.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing why the request failed.
    fn request(&self, document: Value) -> Result<Value, EngineError>;
}

/// Builds engine instances from construction settings.
pub trait EngineFactory {
    /// Constructs an engine for the project described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the engine cannot be constructed.
    fn build(&self, settings: EngineSettings) -> Result<Arc<dyn AnalysisEngine>, EngineError>;
}
