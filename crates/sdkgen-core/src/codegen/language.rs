//! Target language selection.

// Internal imports (std, crate)
use std::fmt;
use std::str::FromStr;

use super::python::PythonGen;
use super::typescript::TypeScriptGen;
use super::CodeGen;
use crate::error::{Error, Result};

/// Languages with a built-in backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    TypeScript,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "typescript" | "ts" => Ok(Self::TypeScript),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::TypeScript => "typescript",
        }
    }

    /// Returns an iterator over all supported languages
    pub fn all() -> impl Iterator<Item = Self> {
        use Language::*;
        [Python, TypeScript].iter().copied()
    }

    pub fn backend(&self) -> Box<dyn CodeGen> {
        match self {
            Self::Python => Box::new(PythonGen),
            Self::TypeScript => Box::new(TypeScriptGen),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse every requested language up front, failing on the first unknown one
pub fn parse_languages<S: AsRef<str>>(names: &[S]) -> Result<Vec<Language>> {
    names
        .iter()
        .map(|name| name.as_ref().parse::<Language>().map_err(Error::config))
        .collect()
}
