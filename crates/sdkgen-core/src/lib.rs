//! sdkgen Core Library
//!
//! This library turns an OpenAPI document into typed client SDK source. It
//! loads the document once into an [`ApiModel`] (a type graph plus a method
//! table), synthesizes request and write types on demand, and drives language
//! backends through the [`CodeGen`] contract to produce methods, streams and
//! models files.

pub mod codegen;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod openapi;
pub mod search;
pub mod utils;

pub use crate::{
    codegen::{generate, CodeGen, GenerateOptions, GeneratedSdk, Language},
    config::Config,
    error::{BackendError, Diagnostic, Error, Result, SpecError},
    model::ApiModel,
    openapi::SpecDocument,
    search::{SearchCriterion, SearchResult},
};
