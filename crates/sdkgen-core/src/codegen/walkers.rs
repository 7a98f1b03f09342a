//! Generic walkers over the model.
//!
//! Each walker produces one file body: the prologue, a header comment with a
//! tally, the rendered items in sorted order and the epilogue. Items are
//! rendered before the prologue so the prologue sees every type the items
//! referenced.

// Internal imports (std, crate)
use std::collections::{BTreeMap, HashSet};

use super::context::{FileKind, GenContext};
use super::{ensure_named, CodeGen};
use crate::error::Result;
use crate::model::{ApiModel, TypeKind};

// External imports (alphabetized)
use log::{debug, info};

/// Join the non-empty parts of a file
fn assemble(prologue: String, header: String, items: &[String], epilogue: String) -> String {
    let body = items.join("\n\n");
    let mut out = [prologue, header, body, epilogue]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

/// Renders every method, sorted by operationId
pub struct MethodGenerator<'b> {
    backend: &'b dyn CodeGen,
}

impl<'b> MethodGenerator<'b> {
    pub fn new(backend: &'b dyn CodeGen) -> Self {
        Self { backend }
    }

    pub fn render(&self, ctx: &mut GenContext<'_>) -> Result<String> {
        ctx.begin_file(FileKind::Methods);
        let methods = ctx.sorted_methods();
        let mut items = Vec::with_capacity(methods.len());
        for method in &methods {
            debug!("{}: method {}", self.backend.language(), method.operation_id);
            items.push(self.backend.declare_method(ctx, 1, method)?);
        }

        let header = self
            .backend
            .comment_header(1, &format!("{} API methods", methods.len()));
        Ok(assemble(
            self.backend.methods_prologue(ctx)?,
            header,
            &items,
            self.backend.methods_epilogue(ctx)?,
        ))
    }
}

/// Renders a streaming variant of every method
pub struct StreamGenerator<'b> {
    backend: &'b dyn CodeGen,
}

impl<'b> StreamGenerator<'b> {
    pub fn new(backend: &'b dyn CodeGen) -> Self {
        Self { backend }
    }

    pub fn render(&self, ctx: &mut GenContext<'_>) -> Result<String> {
        ctx.begin_file(FileKind::Streams);
        let methods = ctx.sorted_methods();
        let mut items = Vec::with_capacity(methods.len());
        for method in &methods {
            items.push(self.backend.declare_streamer(ctx, 1, method)?);
        }

        let header = self
            .backend
            .comment_header(1, &format!("{} API methods", methods.len()));
        // streams share the methods file's closing
        Ok(assemble(
            self.backend.streams_prologue(ctx)?,
            header,
            &items,
            self.backend.methods_epilogue(ctx)?,
        ))
    }
}

#[derive(Debug, Default)]
struct Tally {
    spec: usize,
    request: usize,
    write: usize,
}

/// Renders every declarable type, sorted by name.
///
/// Rendering a type can synthesize new ones (write types of its members), so
/// the walk repeats until no unvisited type is left.
pub struct TypeGenerator<'b> {
    backend: &'b dyn CodeGen,
}

impl<'b> TypeGenerator<'b> {
    pub fn new(backend: &'b dyn CodeGen) -> Self {
        Self { backend }
    }

    pub fn render(&self, ctx: &mut GenContext<'_>) -> Result<String> {
        ctx.begin_file(FileKind::Models);
        let mut visited = HashSet::new();
        let mut rendered = BTreeMap::new();
        let mut tally = Tally::default();

        loop {
            let pending: Vec<_> = ctx
                .model()
                .types()
                .filter(|(_, id)| !visited.contains(id))
                .map(|(name, id)| (name.to_string(), id))
                .collect();
            if pending.is_empty() {
                break;
            }

            for (name, id) in pending {
                visited.insert(id);
                let ty = ctx.ty(id);
                match ty.kind {
                    TypeKind::Intrinsic
                    | TypeKind::Array(_)
                    | TypeKind::DelimArray(_)
                    | TypeKind::Hash(_) => continue,
                    TypeKind::Request { .. } if !self.backend.needs_request_types() => continue,
                    TypeKind::Request { .. } => tally.request += 1,
                    TypeKind::Write { .. } => tally.write += 1,
                    TypeKind::Component => tally.spec += 1,
                }
                ensure_named(&ty)?;
                rendered.insert(name, self.backend.declare_type(ctx, 0, id)?);
            }
        }

        let items: Vec<String> = rendered.into_values().collect();
        let header = self.backend.comment_header(
            0,
            &format!(
                "{} API models: {} Spec, {} Request, {} Write",
                items.len(),
                tally.spec,
                tally.request,
                tally.write
            ),
        );
        Ok(assemble(
            self.backend.models_prologue(ctx)?,
            header,
            &items,
            self.backend.models_epilogue(ctx)?,
        ))
    }
}

/// Settings for one generation pass
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub api_version: String,
    pub package_name: String,
}

impl GenerateOptions {
    pub fn new(api_version: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            package_name: package_name.into(),
        }
    }
}

/// Source text of one (API version, language) pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSdk {
    pub methods: String,
    /// Present only for backends that support streaming
    pub streams: Option<String>,
    pub models: String,
}

/// Run the methods, streams and models walkers for one backend.
///
/// Derived types synthesized along the way are added to `model`. Give each
/// backend its own clone of a freshly loaded model so one backend's derived
/// types never leak into another's output.
pub fn generate(
    model: &mut ApiModel,
    backend: &dyn CodeGen,
    options: &GenerateOptions,
) -> Result<GeneratedSdk> {
    let mut ctx = GenContext::new(model, &options.api_version, &options.package_name);

    let methods = MethodGenerator::new(backend).render(&mut ctx)?;
    let streams = if backend.supports_streaming() {
        Some(StreamGenerator::new(backend).render(&mut ctx)?)
    } else {
        None
    };
    let models = TypeGenerator::new(backend).render(&mut ctx)?;

    info!(
        "Generated {} SDK for API {}",
        backend.language(),
        options.api_version
    );
    Ok(GeneratedSdk {
        methods,
        streams,
        models,
    })
}
