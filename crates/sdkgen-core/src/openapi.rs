//! OpenAPI document loading and raw access.
//!
//! This module wraps a parsed OpenAPI 3.x (or legacy Swagger 2.0) document as
//! untyped JSON. Everything above it, the type graph and the method table,
//! is built by walking this value, so the accessors here stay deliberately thin.
//!
//! # Examples
//!
//! ```no_run
//! use sdkgen_core::openapi::SpecDocument;
//! use sdkgen_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let spec = SpecDocument::from_file("openapi.yaml").await?;
//!
//! if let Some(title) = spec.title() {
//!     println!("API Title: {}", title);
//! }
//! let user = spec.resolve_pointer("#/components/schemas/User");
//! println!("User schema present: {}", user.is_some());
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::Path;

// External imports (alphabetized)
use serde_json::{Map, Value as JsonValue};
use tokio::fs;

/// A parsed API document (OpenAPI 3.x or Swagger 2.0)
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct SpecDocument {
    /// The raw JSON value of the document
    pub json: JsonValue,
}

impl SpecDocument {
    /// Wrap an already parsed document
    pub fn new(json: JsonValue) -> Self {
        Self { json }
    }

    /// Load a document from a file (supports both YAML and JSON)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        Self::parse_content(&content).map_err(|e| {
            crate::Error::openapi(format!(
                "Failed to parse API document at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse content as either JSON or YAML
    pub fn parse_content(content: &str) -> Result<Self, String> {
        if let Ok(json) = serde_json::from_str(content) {
            return Ok(Self { json });
        }

        if let Ok(json) = serde_yaml::from_str(content) {
            return Ok(Self { json });
        }

        Err("content is neither valid JSON nor YAML".to_string())
    }

    /// Get a reference to the raw JSON value
    pub fn as_json(&self) -> &JsonValue {
        &self.json
    }

    /// Get the title of the API
    pub fn title(&self) -> Option<&str> {
        self.json.get("info")?.get("title")?.as_str()
    }

    /// Get the version of the API
    pub fn version(&self) -> Option<&str> {
        self.json.get("info")?.get("version")?.as_str()
    }

    /// Get the description of the API
    pub fn description(&self) -> Option<&str> {
        self.json.get("info")?.get("description")?.as_str()
    }

    /// True for a legacy Swagger 2.0 document
    pub fn is_swagger(&self) -> bool {
        self.json.get("swagger").is_some()
    }

    /// `components.schemas`, or `definitions` for Swagger 2.0
    pub fn schemas(&self) -> Option<&Map<String, JsonValue>> {
        self.json
            .get("components")
            .and_then(|c| c.get("schemas"))
            .or_else(|| self.json.get("definitions"))
            .and_then(JsonValue::as_object)
    }

    /// The `paths` object
    pub fn paths(&self) -> Option<&Map<String, JsonValue>> {
        self.json.get("paths").and_then(JsonValue::as_object)
    }

    /// Look up a local JSON reference such as `#/components/schemas/User`
    pub fn resolve_pointer(&self, reference: &str) -> Option<&JsonValue> {
        let pointer = reference.strip_prefix('#').unwrap_or(reference);
        if pointer.is_empty() {
            return Some(&self.json);
        }
        self.json.pointer(pointer)
    }

    /// Follow `$ref` chains until a concrete object is reached.
    ///
    /// Returns the input unchanged when it has no `$ref`. A dangling reference
    /// yields `None`.
    pub fn deref<'a>(&'a self, value: &'a JsonValue) -> Option<&'a JsonValue> {
        let mut current = value;
        // bounded so a reference cycle cannot spin forever
        for _ in 0..32 {
            match current.get("$ref").and_then(JsonValue::as_str) {
                Some(reference) => current = self.resolve_pointer(reference)?,
                None => return Some(current),
            }
        }
        None
    }
}

/// Last segment of a JSON reference, e.g. `User` for `#/components/schemas/User`
pub fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_from_file_yaml() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("openapi.yaml");
        let yaml_content = r#"
openapi: 3.0.0
info:
  title: Test API
  version: 4.0.0
paths: {}
"#;
        tokio::fs::write(&file_path, yaml_content).await?;

        let spec = SpecDocument::from_file(&file_path).await?;
        assert_eq!(spec.title(), Some("Test API"));
        assert_eq!(spec.version(), Some("4.0.0"));
        assert!(!spec.is_swagger());
        Ok(())
    }

    #[tokio::test]
    async fn test_from_file_rejects_garbage() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("broken.json");
        tokio::fs::write(&file_path, "{ not: [valid").await?;

        let err = SpecDocument::from_file(&file_path).await.unwrap_err();
        assert!(err.to_string().contains("neither valid JSON nor YAML"));
        Ok(())
    }

    #[test]
    fn test_resolve_pointer_and_deref() {
        let spec = SpecDocument::new(json!({
            "components": {
                "schemas": { "User": { "type": "object" } },
                "requestBodies": { "UserBody": { "$ref": "#/components/schemas/User" } }
            }
        }));
        assert_eq!(
            spec.resolve_pointer("#/components/schemas/User"),
            Some(&json!({"type": "object"}))
        );
        let body = json!({"$ref": "#/components/requestBodies/UserBody"});
        assert_eq!(spec.deref(&body), Some(&json!({"type": "object"})));
        assert_eq!(spec.deref(&json!({"$ref": "#/nowhere"})), None);
    }

    #[test]
    fn test_deref_cycle_terminates() {
        let spec = SpecDocument::new(json!({
            "a": { "$ref": "#/b" },
            "b": { "$ref": "#/a" }
        }));
        assert_eq!(spec.deref(&json!({"$ref": "#/a"})), None);
    }

    #[test]
    fn test_schemas_falls_back_to_definitions() {
        let spec = SpecDocument::new(json!({
            "swagger": "2.0",
            "definitions": { "Thing": {} }
        }));
        assert!(spec.is_swagger());
        assert!(spec.schemas().is_some_and(|s| s.contains_key("Thing")));
    }

    #[test]
    fn test_ref_name() {
        assert_eq!(ref_name("#/components/schemas/User"), "User");
        assert_eq!(ref_name("User"), "User");
    }
}
