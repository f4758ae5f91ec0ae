//! Library definition documents handed to the engine at construction.

use serde_json::Value;

/// A parsed library definition: the static description of an API surface
/// (runtime built-ins, browser globals, and the like) that the engine
/// consults during analysis.
///
/// Definitions are resolved once at startup and never mutated; their order
/// matters, because later documents may shadow earlier declarations inside
/// the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryDefinition {
    name: String,
    document: Value,
}

impl LibraryDefinition {
    /// Wraps an already-parsed definition document.
    #[must_use]
    pub fn new(name: impl Into<String>, document: Value) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }

    /// Parses a definition document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the parser diagnostic when `text` is not valid JSON.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, serde_json::Error> {
        let document = serde_json::from_str(text)?;
        Ok(Self::new(name, document))
    }

    /// The identifier this definition was resolved under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed definition document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_definition_documents() {
        let definition = LibraryDefinition::parse("browser", r#"{"!name": "browser"}"#)
            .expect("definition parses");
        assert_eq!(definition.name(), "browser");
        assert_eq!(
            definition.document().get("!name").and_then(Value::as_str),
            Some("browser")
        );
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(LibraryDefinition::parse("broken", "{oops").is_err());
    }
}
