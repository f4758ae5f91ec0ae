//! Library and plugin resolution for the engine.
//!
//! Resolution is deliberately forgiving: the daemon should come up even when
//! a configured library or plugin is absent, so every unresolvable candidate
//! is reported on the operator stream and skipped. Only the marker file
//! itself gets the fatal treatment, and that happens before this module
//! runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use perch_config::{BASELINE_LIBRARY, DEFINITION_SUFFIX, ProjectConfig};
use perch_engine::{LibraryDefinition, PluginRegistry};

pub(crate) const RESOLVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::resolver");

/// Resolves the ordered library definition list for a project.
///
/// The candidate list is `config.libs` with the baseline identifier
/// prepended when `ecmaScript` is enabled and not already listed. Each
/// candidate, normalised to the `.json` suffix, is searched first under the
/// project root and then under the shared definitions directory; the first
/// hit wins, so a project-local copy shadows the installed one. Candidates
/// found nowhere, or whose documents fail to parse, are skipped with a
/// warning. Order is preserved: later definitions may shadow earlier
/// declarations inside the engine.
pub fn resolve_libraries(
    root: &Path,
    shared_dir: &Path,
    config: &ProjectConfig,
) -> Vec<LibraryDefinition> {
    let mut definitions = Vec::new();
    for name in candidate_names(config) {
        let file = normalise_name(&name);
        let Some(path) = locate_definition(root, shared_dir, &file) else {
            warn!(
                target: RESOLVER_TARGET,
                library = %name,
                "library definition not found; skipping"
            );
            continue;
        };
        match load_definition(&name, &path) {
            Ok(definition) => {
                debug!(
                    target: RESOLVER_TARGET,
                    library = %name,
                    path = %path.display(),
                    "library definition loaded"
                );
                definitions.push(definition);
            }
            Err(error) => {
                warn!(
                    target: RESOLVER_TARGET,
                    library = %name,
                    path = %path.display(),
                    error = %error,
                    "library definition unusable; skipping"
                );
            }
        }
    }
    definitions
}

/// Resolves configured plugins against the registry.
///
/// Each configured key either matches a registered plugin, contributing
/// `canonical name -> options` to the mapping handed to the engine, or is
/// reported and skipped, matching the library-resolution policy.
pub fn resolve_plugins(
    registry: &PluginRegistry,
    config: &ProjectConfig,
) -> BTreeMap<String, Value> {
    let mut plugins = BTreeMap::new();
    for (name, options) in &config.plugins {
        match registry.get(name) {
            Some(spec) => {
                debug!(
                    target: RESOLVER_TARGET,
                    plugin = %spec.name(),
                    "plugin resolved"
                );
                plugins.insert(spec.name().to_owned(), options.clone());
            }
            None => {
                warn!(
                    target: RESOLVER_TARGET,
                    plugin = %name,
                    "plugin is not registered; skipping"
                );
            }
        }
    }
    plugins
}

fn candidate_names(config: &ProjectConfig) -> Vec<String> {
    let mut names = config.libs.clone();
    if config.ecma_script && !names.iter().any(|name| name == BASELINE_LIBRARY) {
        names.insert(0, BASELINE_LIBRARY.to_owned());
    }
    names
}

fn normalise_name(name: &str) -> String {
    if name.ends_with(DEFINITION_SUFFIX) {
        name.to_owned()
    } else {
        format!("{name}{DEFINITION_SUFFIX}")
    }
}

fn locate_definition(root: &Path, shared_dir: &Path, file: &str) -> Option<PathBuf> {
    [root.join(file), shared_dir.join(file)]
        .into_iter()
        .find(|path| path.is_file())
}

fn load_definition(name: &str, path: &Path) -> Result<LibraryDefinition, String> {
    let text = fs::read_to_string(path).map_err(|error| error.to_string())?;
    LibraryDefinition::parse(name, &text).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use perch_engine::builtin_registry;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    struct ResolverDirs {
        project: TempDir,
        shared: TempDir,
    }

    impl ResolverDirs {
        fn new() -> Self {
            Self {
                project: TempDir::new().expect("project dir"),
                shared: TempDir::new().expect("shared dir"),
            }
        }

        fn write_project_def(&self, file: &str, contents: &str) {
            fs::write(self.project.path().join(file), contents).expect("write project def");
        }

        fn write_shared_def(&self, file: &str, contents: &str) {
            fs::write(self.shared.path().join(file), contents).expect("write shared def");
        }

        fn resolve(&self, config: &ProjectConfig) -> Vec<LibraryDefinition> {
            resolve_libraries(self.project.path(), self.shared.path(), config)
        }
    }

    fn config_with_libs(libs: &[&str], ecma_script: bool) -> ProjectConfig {
        ProjectConfig {
            libs: libs.iter().map(|lib| (*lib).to_owned()).collect(),
            ecma_script,
            ..ProjectConfig::default()
        }
    }

    #[test]
    fn baseline_is_prepended_when_ecmascript_is_enabled() {
        let dirs = ResolverDirs::new();
        dirs.write_shared_def("ecmascript.json", r#"{"!name": "ecmascript"}"#);
        dirs.write_shared_def("browser.json", r#"{"!name": "browser"}"#);

        let definitions = dirs.resolve(&config_with_libs(&["browser"], true));
        let names: Vec<&str> = definitions.iter().map(LibraryDefinition::name).collect();
        assert_eq!(names, ["ecmascript", "browser"]);
    }

    #[test]
    fn baseline_is_not_duplicated_when_listed_explicitly() {
        let dirs = ResolverDirs::new();
        dirs.write_shared_def("ecmascript.json", "{}");

        let definitions = dirs.resolve(&config_with_libs(&["ecmascript"], true));
        assert_eq!(definitions.len(), 1);
    }

    #[test]
    fn baseline_is_omitted_when_ecmascript_is_disabled() {
        let dirs = ResolverDirs::new();
        dirs.write_shared_def("ecmascript.json", "{}");

        let definitions = dirs.resolve(&config_with_libs(&[], false));
        assert!(definitions.is_empty());
    }

    #[test]
    fn project_copy_shadows_shared_copy() {
        let dirs = ResolverDirs::new();
        dirs.write_project_def("browser.json", r#"{"origin": "project"}"#);
        dirs.write_shared_def("browser.json", r#"{"origin": "shared"}"#);

        let definitions = dirs.resolve(&config_with_libs(&["browser"], false));
        assert_eq!(definitions.len(), 1);
        assert_eq!(
            definitions[0].document(),
            &json!({"origin": "project"})
        );
    }

    #[test]
    fn explicit_suffix_is_not_doubled() {
        let dirs = ResolverDirs::new();
        dirs.write_shared_def("browser.json", "{}");

        let definitions = dirs.resolve(&config_with_libs(&["browser.json"], false));
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name(), "browser.json");
    }

    #[test]
    fn missing_candidates_are_skipped_not_fatal() {
        let dirs = ResolverDirs::new();
        dirs.write_shared_def("browser.json", "{}");

        let definitions = dirs.resolve(&config_with_libs(&["nonexistent", "browser"], false));
        let names: Vec<&str> = definitions.iter().map(LibraryDefinition::name).collect();
        assert_eq!(names, ["browser"]);
    }

    #[test]
    fn unparsable_definitions_are_skipped() {
        let dirs = ResolverDirs::new();
        dirs.write_shared_def("broken.json", "{not json");

        let definitions = dirs.resolve(&config_with_libs(&["broken"], false));
        assert!(definitions.is_empty());
    }

    #[test]
    fn known_plugins_resolve_and_unknown_are_skipped() {
        let registry = builtin_registry();
        let config = ProjectConfig {
            plugins: [
                ("modules".to_owned(), json!({"load": "eager"})),
                ("left-pad".to_owned(), json!({})),
            ]
            .into_iter()
            .collect(),
            ..ProjectConfig::default()
        };

        let plugins = resolve_plugins(&registry, &config);
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins.get("modules"), Some(&json!({"load": "eager"})));
    }

    #[test]
    fn empty_plugin_config_resolves_to_nothing() {
        let registry = builtin_registry();
        let plugins = resolve_plugins(&registry, &ProjectConfig::default());
        assert!(plugins.is_empty());
    }
}
