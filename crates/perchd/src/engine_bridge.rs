//! Ownership of the analysis engine instance.
//!
//! The bridge is the only component that talks to the engine. It constructs
//! the instance through an injected factory, registers eager-load files once
//! at startup, and forwards opaque request documents. The engine is shared
//! across connection threads behind an `Arc`; its contract requires it to
//! serialise or safely interleave concurrent requests, so the bridge adds no
//! locking of its own.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use perch_engine::{AnalysisEngine, EngineError, EngineFactory, EngineSettings, FileLoader};

pub(crate) const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// File-read callback resolving relative names against the project root.
#[derive(Debug, Clone)]
pub struct ProjectFileLoader {
    root: PathBuf,
}

impl ProjectFileLoader {
    /// Creates a loader rooted at the project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileLoader for ProjectFileLoader {
    fn load(&self, name: &str) -> Result<String, EngineError> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|source| EngineError::file_load(name, source))
    }
}

/// Bridge owning the single engine instance for this project.
#[derive(Clone)]
pub struct EngineBridge {
    engine: Arc<dyn AnalysisEngine>,
}

impl EngineBridge {
    /// Constructs the engine through `factory`.
    ///
    /// # Errors
    ///
    /// Propagates the factory's [`EngineError`] when construction fails.
    pub fn new(factory: &dyn EngineFactory, settings: EngineSettings) -> Result<Self, EngineError> {
        let engine = factory.build(settings)?;
        Ok(Self { engine })
    }

    /// Registers eager-load files with the engine.
    ///
    /// A file that fails to register is reported and skipped; eager loading
    /// is an optimisation, not a startup requirement.
    pub fn register_eager_files(&self, files: &[String]) {
        for name in files {
            match self.engine.add_file(name) {
                Ok(()) => {
                    debug!(target: ENGINE_TARGET, file = %name, "eager file registered");
                }
                Err(error) => {
                    warn!(
                        target: ENGINE_TARGET,
                        file = %name,
                        error = %error,
                        "eager file failed to register; skipping"
                    );
                }
            }
        }
    }

    /// Forwards one request document to the engine.
    ///
    /// # Errors
    ///
    /// Returns the engine-reported [`EngineError`] for a failed request.
    pub fn request(&self, document: Value) -> Result<Value, EngineError> {
        self.engine.request(document)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use perch_engine::StubEngineFactory;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn settings_for(root: &TempDir) -> EngineSettings {
        EngineSettings {
            loader: Arc::new(ProjectFileLoader::new(root.path())),
            definitions: Vec::new(),
            plugins: BTreeMap::new(),
            debug: false,
            project_root: root.path().to_path_buf(),
        }
    }

    #[test]
    fn loader_resolves_names_against_the_root() {
        let root = TempDir::new().expect("temp dir");
        fs::create_dir(root.path().join("src")).expect("create src");
        fs::write(root.path().join("src").join("main.js"), "let x = 1;").expect("write file");

        let loader = ProjectFileLoader::new(root.path());
        let contents = loader.load("src/main.js").expect("file loads");
        assert_eq!(contents, "let x = 1;");
    }

    #[test]
    fn loader_reports_missing_files() {
        let root = TempDir::new().expect("temp dir");
        let loader = ProjectFileLoader::new(root.path());
        let error = loader.load("absent.js").expect_err("load must fail");
        assert!(matches!(error, EngineError::FileLoad { .. }));
    }

    #[test]
    fn eager_load_failures_do_not_abort_startup() {
        let root = TempDir::new().expect("temp dir");
        fs::write(root.path().join("present.js"), "var a;").expect("write file");

        let bridge =
            EngineBridge::new(&StubEngineFactory, settings_for(&root)).expect("bridge builds");
        bridge.register_eager_files(&["present.js".to_owned(), "absent.js".to_owned()]);

        let result = bridge
            .request(json!({"type": "files"}))
            .expect("files request succeeds");
        assert_eq!(result, json!({"files": ["present.js"]}));
    }
}
