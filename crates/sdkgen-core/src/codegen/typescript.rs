//! TypeScript backend.
//!
//! Interfaces for models, an `APIMethods` subclass for methods and a second
//! subclass whose methods hand the response stream to a callback. Methods
//! with several optional parameters take a single request object.

// Internal imports (std, crate)
use super::context::GenContext;
use super::{ensure_named, render_template, CodeGen, MappedType};
use crate::error::{BackendError, Result};
use crate::model::{Method, ParamLocation, Parameter, Property, TypeId, TypeKind};
use crate::utils::{is_identifier, to_lower_camel_case};

const METHODS_TEMPLATE: &str = include_str!("templates/typescript/methods.tera");
const STREAMS_TEMPLATE: &str = include_str!("templates/typescript/streams.tera");
const MODELS_TEMPLATE: &str = include_str!("templates/typescript/models.tera");

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptGen;

fn intrinsic(name: &str) -> Option<MappedType> {
    let mapped = match name {
        "integer" | "int32" | "int64" | "float" | "double" | "number" => {
            MappedType::with_default("number", "0")
        }
        "string" | "password" | "byte" | "binary" | "email" | "uuid" | "uri" | "hostname"
        | "ipv4" | "ipv6" | "date" => MappedType::with_default("string", "''"),
        "datetime" => MappedType::new("Date"),
        "boolean" => MappedType::with_default("boolean", "false"),
        "object" | "any" => MappedType::new("any"),
        "void" => MappedType::new("void"),
        _ => return None,
    };
    Some(mapped)
}

/// Property key, quoted when it is not an identifier
fn key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("'{name}'")
    }
}

fn arg_name(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        to_lower_camel_case(name)
    }
}

/// `/** ... */` block, empty for empty text
fn doc_comment(bump: &str, text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let mut out = format!("{bump}/**\n");
    for line in text.trim_end().lines() {
        if line.trim().is_empty() {
            out.push_str(&format!("{bump} *\n"));
        } else {
            out.push_str(&format!("{bump} * {line}\n"));
        }
    }
    out.push_str(&format!("{bump} */\n"));
    out
}

/// Pieces shared by the plain and the streaming form of a method
struct Call {
    doc: String,
    args: Vec<String>,
    returns: String,
    errors: String,
    path: String,
    query: String,
    body: String,
}

impl TypeScriptGen {
    fn call(&self, ctx: &mut GenContext<'_>, indent: usize, method: &Method) -> Result<Call> {
        let bump = self.bumper(indent);
        let request = self.request_type_name(ctx, method);
        let access = |p: &Parameter| {
            if request.is_empty() {
                arg_name(&p.name)
            } else if is_identifier(&p.name) {
                format!("request.{}", p.name)
            } else {
                format!("request['{}']", p.name)
            }
        };

        let mut args = Vec::new();
        if request.is_empty() {
            for param in method.all_params() {
                args.push(self.declare_parameter(ctx, indent + 1, method, param)?);
            }
        } else {
            args.push(format!("{}request: {request}", self.bumper(indent + 1)));
        }
        args.push(format!(
            "{}options?: Partial<ITransportSettings>",
            self.bumper(indent + 1)
        ));

        let returns = self.type_map(ctx, method.return_type())?.name;
        let mut errors: Vec<String> = Vec::new();
        for response in method.error_responses() {
            let name = self.type_map(ctx, response.ty)?.name;
            if !errors.contains(&name) {
                errors.push(name);
            }
        }
        let errors = if errors.is_empty() {
            "unknown".to_string()
        } else {
            errors.join(" | ")
        };

        let mut path = method.endpoint.clone();
        for param in method.path_args() {
            path = path.replace(
                &format!("{{{}}}", param.name),
                &format!("${{encodeParam({})}}", access(param)),
            );
        }
        let query_args = method.query_args();
        let query = if query_args.is_empty() {
            "null".to_string()
        } else {
            let fields: Vec<String> = query_args
                .iter()
                .map(|p| format!("{}: {}", key(&p.name), access(p)))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        };
        let body = method
            .body_arg()
            .map(|p| access(p))
            .unwrap_or_else(|| "null".to_string());

        let mut doc = format!(
            "{} {} -> {returns}",
            method.http_method, method.endpoint
        );
        for text in [&method.summary, &method.description] {
            if !text.is_empty() {
                doc.push_str("\n\n");
                doc.push_str(text);
            }
        }
        if method.deprecated {
            doc.push_str("\n\n@deprecated");
        }

        Ok(Call {
            doc: doc_comment(&bump, &doc),
            args,
            returns,
            errors,
            path,
            query,
            body,
        })
    }
}

impl CodeGen for TypeScriptGen {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn file_extension(&self) -> &'static str {
        "ts"
    }

    fn needs_request_types(&self) -> bool {
        true
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn type_map(&self, ctx: &mut GenContext<'_>, ty: TypeId) -> Result<MappedType> {
        ctx.reference(ty);
        let node = ctx.ty(ty);
        match node.kind {
            TypeKind::Array(el) => {
                let element = self.type_map(ctx, el)?;
                Ok(MappedType::with_default(format!("{}[]", element.name), "[]"))
            }
            TypeKind::Hash(el) => {
                let element = self.type_map(ctx, el)?;
                Ok(MappedType::with_default(
                    format!("IDictionary<{}>", element.name),
                    "{}",
                ))
            }
            TypeKind::DelimArray(el) => {
                let element = self.type_map(ctx, el)?;
                Ok(MappedType::new(format!("DelimArray<{}>", element.name)))
            }
            TypeKind::Intrinsic => intrinsic(&node.name).ok_or_else(|| {
                BackendError::UnknownIntrinsic {
                    language: self.language().to_string(),
                    type_name: node.name.clone(),
                }
                .into()
            }),
            _ => {
                ensure_named(&node)?;
                Ok(MappedType::new(node.name.clone()))
            }
        }
    }

    fn declare_property(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        property: &Property,
    ) -> Result<String> {
        let bump = self.bumper(indent);
        let mapped = self.type_map(ctx, property.ty)?;
        let mut doc = property.description.clone();
        if property.deprecated {
            doc.push_str("\n\n@deprecated");
        }
        Ok(format!(
            "{}{bump}{}{}{}: {}{}",
            doc_comment(&bump, &doc),
            if property.read_only { "readonly " } else { "" },
            key(&property.name),
            if property.required { "" } else { "?" },
            mapped.name,
            if property.nullable { " | null" } else { "" },
        ))
    }

    fn declare_parameter(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        _method: &Method,
        param: &Parameter,
    ) -> Result<String> {
        let ty = if param.location == ParamLocation::Body {
            self.writeable_type(ctx, param.ty).unwrap_or(param.ty)
        } else {
            param.ty
        };
        let mapped = self.type_map(ctx, ty)?;
        Ok(format!(
            "{}{}{}: {}",
            self.bumper(indent),
            arg_name(&param.name),
            if param.required { "" } else { "?" },
            mapped.name
        ))
    }

    fn declare_type(&self, ctx: &mut GenContext<'_>, indent: usize, ty: TypeId) -> Result<String> {
        let node = ctx.ty(ty);
        ensure_named(&node)?;
        let bump = self.bumper(indent);
        let mut doc = node.description.clone();
        if node.deprecated {
            doc.push_str("\n\n@deprecated");
        }

        let mut props = Vec::with_capacity(node.properties.len());
        for property in &node.properties {
            props.push(self.declare_property(ctx, indent + 1, property)?);
        }
        let body = if props.is_empty() {
            "{}".to_string()
        } else {
            format!("{{\n{}\n{bump}}}", props.join("\n"))
        };
        Ok(format!(
            "{}{bump}export interface {} {body}",
            doc_comment(&bump, &doc),
            node.name
        ))
    }

    fn declare_method(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
    ) -> Result<String> {
        let call = self.call(ctx, indent, method)?;
        let bump = self.bumper(indent);
        let inner = self.bumper(indent + 1);
        let arg = self.bumper(indent + 2);
        let generics = format!("{}, {}", call.returns, call.errors);
        Ok(format!(
            "{doc}{bump}async {name}(\n{args}\n{bump}): Promise<SDKResponse<{generics}>> {{\n\
             {inner}return this.{verb}<{generics}>(\n\
             {arg}`{path}`,\n{arg}{query},\n{arg}{body},\n{arg}options\n\
             {inner})\n{bump}}}",
            doc = call.doc,
            name = to_lower_camel_case(&method.operation_id),
            args = call.args.join(",\n"),
            verb = method.http_method.path_item_key(),
            path = call.path,
            query = call.query,
            body = call.body,
        ))
    }

    fn declare_streamer(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
    ) -> Result<String> {
        let call = self.call(ctx, indent, method)?;
        let bump = self.bumper(indent);
        let inner = self.bumper(indent + 1);
        let arg = self.bumper(indent + 2);
        Ok(format!(
            "{doc}{bump}async {name}(\n\
             {inner}callback: (readable: Readable) => Promise<{returns}>,\n{args}\n{bump}) {{\n\
             {inner}return this.authStream<{returns}>(\n\
             {arg}callback,\n{arg}'{verb}',\n{arg}`{path}`,\n{arg}{query},\n{arg}{body},\n{arg}options\n\
             {inner})\n{bump}}}",
            doc = call.doc,
            name = to_lower_camel_case(&method.operation_id),
            returns = call.returns,
            args = call.args.join(",\n"),
            verb = method.http_method,
            path = call.path,
            query = call.query,
            body = call.body,
        ))
    }

    fn methods_prologue(&self, ctx: &GenContext<'_>) -> Result<String> {
        render_template(METHODS_TEMPLATE, ctx)
    }

    fn methods_epilogue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        Ok("}".to_string())
    }

    fn streams_prologue(&self, ctx: &GenContext<'_>) -> Result<String> {
        render_template(STREAMS_TEMPLATE, ctx)
    }

    fn models_prologue(&self, ctx: &GenContext<'_>) -> Result<String> {
        render_template(MODELS_TEMPLATE, ctx)
    }

    fn models_epilogue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        Ok(String::new())
    }
}
