//! Explicit registry of supported engine plugins.
//!
//! Plugins are selected by configuration key and registered at startup;
//! there is no runtime code loading from arbitrary paths. A configured name
//! either matches a registered spec or is skipped with a warning by the
//! resolver.

use std::collections::BTreeMap;

use thiserror::Error;

/// Descriptor for a supported engine plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    name: String,
    summary: String,
}

impl PluginSpec {
    /// Creates a plugin descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
        }
    }

    /// Canonical plugin name, used as the configuration key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description of what the plugin contributes.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// Errors raised while registering plugins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A plugin with the same name is already registered.
    #[error("plugin '{name}' is already registered")]
    Duplicate {
        /// Name of the conflicting plugin.
        name: String,
    },
}

/// Registry of available engine plugins, keyed by canonical name.
///
/// # Example
///
/// ```
/// use perch_engine::{PluginRegistry, PluginSpec};
///
/// let mut registry = PluginRegistry::new();
/// registry
///     .register(PluginSpec::new("modules", "module graph resolution"))
///     .expect("registration succeeds");
/// assert!(registry.get("modules").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    specs: BTreeMap<String, PluginSpec>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when a plugin with the same name
    /// is already registered.
    pub fn register(&mut self, spec: PluginSpec) -> Result<(), RegistryError> {
        let name = spec.name().to_owned();
        if self.specs.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        self.specs.insert(name, spec);
        Ok(())
    }

    /// Looks up a plugin by its canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.specs.get(name)
    }

    /// Iterates registered plugin names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Builds the registry of plugins every perch build ships with.
///
/// A linked-in engine may register further specs on top of this set.
#[must_use]
pub fn builtin_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    let builtins = [
        PluginSpec::new("doc-comments", "attach documentation comments to completions"),
        PluginSpec::new("modules", "module graph resolution for imports and requires"),
        PluginSpec::new("strings", "completion inside string literals"),
    ];
    for spec in builtins {
        // Names are distinct by construction; a clash here is a programming
        // error surfaced in tests, not a runtime condition.
        let _ = registry.register(spec);
    }
    registry
}
