//! Backend-neutral code generation.
//!
//! A language backend implements [`CodeGen`]: a handful of capability flags,
//! a type mapper and one `declare_*` primitive per kind of entity. The
//! walkers in [`walkers`] own traversal order and file framing and call only
//! those primitives, so every backend is independent of every other one.
//!
//! # Examples
//!
//! ```
//! use sdkgen_core::codegen::{generate, GenerateOptions, Language};
//! use sdkgen_core::model::ApiModel;
//! use serde_json::json;
//!
//! let mut model = ApiModel::from_json(json!({
//!     "openapi": "3.0.0",
//!     "info": {"title": "Demo", "version": "1.0"},
//!     "paths": {"/ping": {"get": {
//!         "operationId": "ping",
//!         "responses": {"200": {"description": "ok", "content": {
//!             "application/json": {"schema": {"type": "string"}}
//!         }}}
//!     }}}
//! }));
//!
//! let backend = Language::Python.backend();
//! let sdk = generate(&mut model, backend.as_ref(), &GenerateOptions::new("1.0", "demo")).unwrap();
//! assert!(sdk.methods.contains("def ping("));
//! assert!(sdk.streams.is_none());
//! ```

pub mod context;
pub mod language;
pub mod python;
pub mod typescript;
pub mod walkers;

pub use context::{FileKind, GenContext, RefCounts};
pub use language::Language;
pub use walkers::{
    generate, GenerateOptions, GeneratedSdk, MethodGenerator, StreamGenerator, TypeGenerator,
};

// Internal imports (std, crate)
use crate::error::{Result, SpecError};
use crate::model::{Method, Parameter, Property, Type, TypeId};
use crate::utils::to_upper_camel_case;

/// A type as spelled in the target language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    pub name: String,
    /// Literal for an empty value of this type, when the language has one
    pub default_literal: Option<String>,
}

impl MappedType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_literal: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default_literal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_literal: Some(default_literal.into()),
        }
    }
}

/// The contract every language backend implements.
///
/// Rendering primitives receive the pass context and the one entity they
/// render. They return source text at the requested indentation level and
/// report uses of types through `ctx` (usually by way of `type_map`) so the
/// prologues can build their import lists.
pub trait CodeGen: Send + Sync {
    /// Target language name, e.g. `python`
    fn language(&self) -> &'static str;

    /// Extension of generated files, without the dot
    fn file_extension(&self) -> &'static str;

    /// Whether methods with several optional parameters take a request type
    fn needs_request_types(&self) -> bool;

    /// Whether a streams file is generated
    fn supports_streaming(&self) -> bool;

    /// One level of indentation
    fn indent_str(&self) -> &'static str {
        "  "
    }

    /// Line comment marker, including its trailing space
    fn comment_str(&self) -> &'static str {
        "// "
    }

    /// Map a type to target syntax.
    ///
    /// Implementations recurse through containers and fail on intrinsics they
    /// have no spelling for.
    fn type_map(&self, ctx: &mut GenContext<'_>, ty: TypeId) -> Result<MappedType>;

    fn declare_property(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        property: &Property,
    ) -> Result<String>;

    fn declare_parameter(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
        param: &Parameter,
    ) -> Result<String>;

    fn declare_type(&self, ctx: &mut GenContext<'_>, indent: usize, ty: TypeId) -> Result<String>;

    fn declare_method(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
    ) -> Result<String>;

    fn declare_streamer(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
    ) -> Result<String>;

    fn methods_prologue(&self, ctx: &GenContext<'_>) -> Result<String>;

    fn methods_epilogue(&self, ctx: &GenContext<'_>) -> Result<String>;

    fn streams_prologue(&self, ctx: &GenContext<'_>) -> Result<String>;

    fn models_prologue(&self, ctx: &GenContext<'_>) -> Result<String>;

    fn models_epilogue(&self, ctx: &GenContext<'_>) -> Result<String>;

    /// Name of the method's request type.
    ///
    /// Empty unless this backend needs request types and the model
    /// synthesized one for the method, in which case the caller renders the
    /// request type instead of individual parameters.
    fn request_type_name(&self, ctx: &mut GenContext<'_>, method: &Method) -> String {
        if !self.needs_request_types() {
            return String::new();
        }
        ctx.request_type(&method.operation_id)
            .map(|id| ctx.ty(id).name.clone())
            .unwrap_or_default()
    }

    /// The writable shape to send for a type, if it differs from the type
    fn writeable_type(&self, ctx: &mut GenContext<'_>, ty: TypeId) -> Option<TypeId> {
        ctx.writeable_type(ty)
    }

    /// Whitespace for an indentation level
    fn bumper(&self, indent: usize) -> String {
        self.indent_str().repeat(indent)
    }

    /// `text` as line comments at an indentation level
    fn comment_header(&self, indent: usize, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let bump = self.bumper(indent);
        text.lines()
            .map(|line| format!("{bump}{}{line}", self.comment_str()).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fail on a type that cannot be spelled: no element type and no name
pub fn ensure_named(ty: &Type) -> Result<()> {
    if ty.name.is_empty() && ty.element_type().is_none() {
        return Err(SpecError::NamelessType {
            fragment: ty.schema.to_string(),
        }
        .into());
    }
    Ok(())
}

/// API version reduced to identifier characters, `4.0` → `40`
pub fn version_slug(api_version: &str) -> String {
    api_version
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Template variables shared by every prologue
pub(crate) fn template_context(ctx: &GenContext<'_>) -> tera::Context {
    let slug = version_slug(&ctx.api_version);
    let mut context = tera::Context::new();
    context.insert("title", ctx.model().title());
    context.insert("api_version", &ctx.api_version);
    context.insert("version_slug", &slug);
    context.insert("package_name", &ctx.package_name);
    context.insert(
        "class_name",
        &format!("{}{slug}Sdk", to_upper_camel_case(&ctx.package_name)),
    );
    context.insert("types", &ctx.referenced_type_names());
    context
}

/// Render an embedded template with [`template_context`]
pub(crate) fn render_template(template: &str, ctx: &GenContext<'_>) -> Result<String> {
    let rendered = tera::Tera::one_off(template, &template_context(ctx), false)?;
    Ok(rendered.trim_end().to_string())
}
