//! Error handling for the sdkgen code generation library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. Problems with the API document
//! itself are described by [`SpecError`], problems a language backend has with
//! a type it cannot express by [`BackendError`]. While loading a model, spec
//! errors do not abort the load: they are collected as [`Diagnostic`]s keyed by
//! the operationId or type name they belong to.
//!
//! # Examples
//!
//! ```
//! use sdkgen_core::error::{Error, Result};
//!
//! fn pick_language(name: &str) -> Result<()> {
//!     if name != "python" {
//!         return Err(Error::config(format!("unsupported language {name}")));
//!     }
//!     Ok(())
//! }
//!
//! assert!(pick_language("cobol").is_err());
//! ```

// Internal imports (std, crate)
use std::fmt;

// External imports (alphabetized)
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result type for sdkgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sdkgen operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Malformed or unsupported API document content
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    /// A language backend could not represent a type
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error reading an API document
    #[error("OpenAPI error: {0}")]
    OpenApi(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI document error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }
}

/// Problems with the content of the API document.
///
/// Each variant carries the offending schema fragment (serialized JSON) so a
/// report can point at what needs fixing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("schema must have a ref or a type: {fragment}")]
    Unresolvable { fragment: String },

    #[error("unknown parameter location '{location}': {fragment}")]
    UnknownLocation { location: String, fragment: String },

    #[error("unknown reference {reference}")]
    UnknownReference { reference: String },

    #[error("missing operationId for {http_method} {endpoint}")]
    MissingOperationId {
        http_method: String,
        endpoint: String,
    },

    #[error("missing 2xx + application/json response in {endpoint}")]
    MissingPrimaryResponse { endpoint: String, fragment: String },

    #[error("is {operation_id} binary or string? no response mode for {fragment}")]
    UnknownResponseMode {
        operation_id: String,
        fragment: String,
    },

    #[error("cannot output a nameless type: {fragment}")]
    NamelessType { fragment: String },
}

impl SpecError {
    /// Build an `Unresolvable` error for a schema fragment
    pub fn unresolvable(schema: &JsonValue) -> Self {
        Self::Unresolvable {
            fragment: schema.to_string(),
        }
    }
}

/// Problems a language backend has with an otherwise valid model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{language} has no mapping for intrinsic type '{type_name}'")]
    UnknownIntrinsic { language: String, type_name: String },

    #[error("{language} cannot represent type '{type_name}'")]
    Unsupported { language: String, type_name: String },
}

/// A spec error tied to the operation or type it was found in.
///
/// Loading collects these instead of failing so one bad operation does not
/// block generation of the rest of the API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// operationId or type name the error belongs to
    pub subject: String,
    pub error: SpecError,
}

impl Diagnostic {
    pub fn new(subject: impl Into<String>, error: SpecError) -> Self {
        Self {
            subject: subject.into(),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.error)
    }
}
