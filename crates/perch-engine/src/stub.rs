//! Stub engine wired into the daemon until a full analysis engine lands.
//!
//! The stub honours the whole construction contract: it keeps the file-read
//! callback, the definition list, and the plugin options, and it exercises
//! the loader on every [`AnalysisEngine::add_file`] call so eager-load and
//! file-registration paths behave like they will against a real engine.
//! Requests it does not understand fail with a typed error, which the HTTP
//! layer surfaces to clients as a 400.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::engine::{AnalysisEngine, EngineError, EngineFactory, EngineSettings};

/// Minimal engine standing in for the real analysis implementation.
#[derive(Debug)]
pub struct StubEngine {
    settings: EngineSettings,
    files: Mutex<BTreeSet<String>>,
}

impl StubEngine {
    /// Creates a stub engine over the supplied settings.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            files: Mutex::new(BTreeSet::new()),
        }
    }

    fn files_snapshot(&self) -> Result<Vec<String>, EngineError> {
        let files = self
            .files
            .lock()
            .map_err(|_| EngineError::internal("file table lock poisoned"))?;
        Ok(files.iter().cloned().collect())
    }
}

impl AnalysisEngine for StubEngine {
    fn add_file(&self, name: &str) -> Result<(), EngineError> {
        // Pull the contents through the loader so registration fails the
        // same way it would on a real engine when the file is unreadable.
        let _contents = self.settings.loader.load(name)?;
        let mut files = self
            .files
            .lock()
            .map_err(|_| EngineError::internal("file table lock poisoned"))?;
        files.insert(name.to_owned());
        Ok(())
    }

    fn request(&self, document: Value) -> Result<Value, EngineError> {
        let kind = document
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::malformed_document("request document has no 'type' property")
            })?;

        match kind {
            "files" => Ok(json!({ "files": self.files_snapshot()? })),
            "definitions" => {
                let names: Vec<&str> = self
                    .settings
                    .definitions
                    .iter()
                    .map(|definition| definition.name())
                    .collect();
                Ok(json!({ "definitions": names }))
            }
            "plugins" => {
                let names: Vec<&String> = self.settings.plugins.keys().collect();
                Ok(json!({ "plugins": names }))
            }
            other => Err(EngineError::unsupported_request(other)),
        }
    }
}

/// Factory producing [`StubEngine`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubEngineFactory;

impl EngineFactory for StubEngineFactory {
    fn build(&self, settings: EngineSettings) -> Result<Arc<dyn AnalysisEngine>, EngineError> {
        Ok(Arc::new(StubEngine::new(settings)))
    }
}
