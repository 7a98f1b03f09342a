//! Configuration management for SDK generation.
//!
//! This module defines the `Config` struct describing one generation run:
//! which document to read, which languages and API versions to render and
//! where to write them. A config can be created programmatically or loaded
//! from a YAML, JSON or TOML file, chosen by the file's extension.
//!
//! # Examples
//!
//! ```no_run
//! use sdkgen_core::config::Config;
//!
//! # async fn run() -> sdkgen_core::Result<()> {
//! // Create a new config programmatically
//! let mut config = Config::new("openapi.json", "sdk");
//! config.languages = vec!["python".to_string()];
//!
//! // Or load from a config file
//! let config = Config::from_file("sdkgen.yaml").await?;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::Path;

use crate::codegen::language::{parse_languages, Language};
use crate::error::{Error, Result};

// External imports (alphabetized)
use serde::{Deserialize, Deserializer, Serialize};
use serde_value::Value as SerdeValue;
use tokio::fs;

/// Configuration for SDK generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the OpenAPI 3 document
    pub spec_path: String,

    /// Optional path to the Swagger 2 document of the same API, used to
    /// recover parameter styles lost in conversion
    #[serde(default)]
    pub swagger_path: Option<String>,

    /// Output directory for generated code
    pub output_dir: String,

    /// Target languages, a single name or a list
    #[serde(default = "default_languages", deserialize_with = "string_or_list")]
    pub languages: Vec<String>,

    /// API versions to generate. Empty means the document's `info.version`
    #[serde(default, deserialize_with = "string_or_list")]
    pub api_versions: Vec<String>,

    /// Package or module name of the generated SDK
    #[serde(default = "default_package_name")]
    pub package_name: String,

    /// Operations to generate. Empty means all
    #[serde(default)]
    pub include_operations: Vec<String>,

    /// Operations to leave out
    #[serde(default)]
    pub exclude_operations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

impl Config {
    /// Create a new Config with default values
    pub fn new(spec_path: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self {
            spec_path: spec_path.into(),
            swagger_path: None,
            output_dir: output_dir.into(),
            languages: default_languages(),
            api_versions: Vec::new(),
            package_name: default_package_name(),
            include_operations: Vec::new(),
            exclude_operations: Vec::new(),
        }
    }

    /// Load configuration from a file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let config = match Format::of(path) {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
            Format::Yaml => serde_yaml::from_str(&content)?,
        };
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match Format::of(path) {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Yaml => serde_yaml::to_string(self)?,
        };
        fs::write(path, content).await?;
        Ok(())
    }

    /// The configured languages, failing on the first unknown name
    pub fn languages(&self) -> Result<Vec<Language>> {
        if self.languages.is_empty() {
            return Err(Error::config("no target language configured"));
        }
        parse_languages(&self.languages)
    }
}

fn default_languages() -> Vec<String> {
    Language::all().map(|l| l.as_str().to_string()).collect()
}

fn default_package_name() -> String {
    "sdk".to_string()
}

/// Accept either a single string or a list of strings
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = SerdeValue::deserialize(deserializer)?;

    match value {
        SerdeValue::String(s) => Ok(vec![s]),
        SerdeValue::Seq(seq) => {
            let mut result = Vec::new();
            for item in seq {
                if let SerdeValue::String(s) = item {
                    result.push(s);
                } else {
                    return Err(serde::de::Error::custom(
                        "Expected string or array of strings",
                    ));
                }
            }
            Ok(result)
        }
        _ => Err(serde::de::Error::custom(
            "Expected string or array of strings",
        )),
    }
}
