//! Python backend.
//!
//! Models are `attrs` classes. Methods take keyword arguments, so no request
//! types are needed, and the backend has no streaming form.

// Internal imports (std, crate)
use super::context::{FileKind, GenContext};
use super::{ensure_named, render_template, CodeGen, MappedType};
use crate::error::{BackendError, Result};
use crate::model::{Method, ParamLocation, Parameter, Property, TypeId, TypeKind};
use crate::utils::{is_identifier, to_snake_case};

const METHODS_TEMPLATE: &str = include_str!("templates/python/methods.tera");
const MODELS_TEMPLATE: &str = include_str!("templates/python/models.tera");

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonGen;

fn intrinsic(name: &str) -> Option<MappedType> {
    let mapped = match name {
        "integer" | "int32" | "int64" => MappedType::with_default("int", "0"),
        "float" | "double" | "number" => MappedType::with_default("float", "0.0"),
        "string" | "password" | "byte" | "email" | "uuid" | "uri" | "hostname" | "ipv4"
        | "ipv6" => MappedType::with_default("str", "\"\""),
        "binary" => MappedType::with_default("bytes", "b\"\""),
        "boolean" => MappedType::with_default("bool", "False"),
        "datetime" => MappedType::new("datetime.datetime"),
        "date" => MappedType::new("datetime.date"),
        "object" | "any" => MappedType::new("Any"),
        "void" => MappedType::new("None"),
        _ => return None,
    };
    Some(mapped)
}

/// A usable Python name for an API name
fn py_name(name: &str) -> String {
    let ident = if is_identifier(name) && !name.contains('$') {
        name.to_string()
    } else {
        to_snake_case(name)
    };
    if KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

/// Triple-quoted docstring lines, empty for empty text
fn docstring(bump: &str, text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let mut out = format!("{bump}\"\"\"\n");
    for line in text.trim_end().lines() {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("{bump}{line}\n"));
        }
    }
    out.push_str(&format!("{bump}\"\"\"\n"));
    out
}

impl PythonGen {
    /// Spelling of a declared type in the current file
    fn qualified(&self, ctx: &GenContext<'_>, name: &str) -> String {
        match ctx.file() {
            FileKind::Models => format!("\"{name}\""),
            FileKind::Methods | FileKind::Streams => format!("models.{name}"),
        }
    }

    fn returns(&self, ctx: &mut GenContext<'_>, method: &Method) -> Result<String> {
        if method.response_is_both() {
            let mapped = self.type_map(ctx, method.return_type())?;
            return Ok(format!("Union[{}, bytes]", mapped.name));
        }
        if method.response_is_binary() {
            return Ok("bytes".to_string());
        }
        Ok(self.type_map(ctx, method.return_type())?.name)
    }
}

impl CodeGen for PythonGen {
    fn language(&self) -> &'static str {
        "python"
    }

    fn file_extension(&self) -> &'static str {
        "py"
    }

    fn needs_request_types(&self) -> bool {
        false
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    fn indent_str(&self) -> &'static str {
        "    "
    }

    fn comment_str(&self) -> &'static str {
        "# "
    }

    fn type_map(&self, ctx: &mut GenContext<'_>, ty: TypeId) -> Result<MappedType> {
        ctx.reference(ty);
        let node = ctx.ty(ty);
        match node.kind {
            TypeKind::Array(el) => {
                let element = self.type_map(ctx, el)?;
                Ok(MappedType::with_default(
                    format!("Sequence[{}]", element.name),
                    "[]",
                ))
            }
            TypeKind::Hash(el) => {
                let element = self.type_map(ctx, el)?;
                Ok(MappedType::with_default(
                    format!("MutableMapping[str, {}]", element.name),
                    "{}",
                ))
            }
            TypeKind::DelimArray(el) => {
                let element = self.type_map(ctx, el)?;
                let prefix = if ctx.file() == FileKind::Models {
                    ""
                } else {
                    "models."
                };
                Ok(MappedType::new(format!(
                    "{prefix}DelimSequence[{}]",
                    element.name
                )))
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
                Ok(MappedType::new(self.qualified(ctx, &node.name)))
            }
        }
    }

    fn declare_property(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        property: &Property,
    ) -> Result<String> {
        let mapped = self.type_map(ctx, property.ty)?;
        let bump = self.bumper(indent);
        let name = py_name(&property.name);
        Ok(if property.required && !property.nullable {
            format!("{bump}{name}: {}", mapped.name)
        } else if property.required {
            format!("{bump}{name}: Optional[{}]", mapped.name)
        } else {
            format!("{bump}{name}: Optional[{}] = None", mapped.name)
        })
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
        let bump = self.bumper(indent);
        let name = py_name(&param.name);
        Ok(if param.required {
            format!("{bump}{name}: {}", mapped.name)
        } else {
            format!("{bump}{name}: Optional[{}] = None", mapped.name)
        })
    }

    fn declare_type(&self, ctx: &mut GenContext<'_>, indent: usize, ty: TypeId) -> Result<String> {
        let node = ctx.ty(ty);
        ensure_named(&node)?;
        let bump = self.bumper(indent);
        let inner = self.bumper(indent + 1);

        let mut lines = vec![
            format!("{bump}@attr.s(auto_attribs=True, kw_only=True)"),
            format!("{bump}class {}(model.Model):", node.name),
        ];
        let mut doc = node.description.clone();
        if node.deprecated {
            doc.push_str("\n\nDeprecated.");
        }
        let doc = docstring(&inner, &doc);
        if !doc.is_empty() {
            lines.push(doc.trim_end().to_string());
            lines.push(String::new());
        }

        // keyword-only, but keep required attributes first for readers
        let ordered: Vec<&Property> = node
            .required_properties()
            .chain(node.optional_properties())
            .collect();
        if ordered.is_empty() {
            lines.push(format!("{inner}pass"));
        }
        for property in ordered {
            lines.push(self.declare_property(ctx, indent + 1, property)?);
        }
        Ok(lines.join("\n"))
    }

    fn declare_method(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
    ) -> Result<String> {
        let bump = self.bumper(indent);
        let inner = self.bumper(indent + 1);
        let nested = self.bumper(indent + 2);
        let arg = self.bumper(indent + 3);
        let returns = self.returns(ctx, method)?;

        let mut lines = vec![format!(
            "{bump}# {} {} -> {returns}",
            method.http_method, method.endpoint
        )];
        lines.push(format!("{bump}def {}(", to_snake_case(&method.operation_id)));
        lines.push(format!("{inner}self,"));
        for param in method.all_params() {
            lines.push(format!(
                "{},",
                self.declare_parameter(ctx, indent + 1, method, param)?
            ));
        }
        lines.push(format!(
            "{inner}transport_options: Optional[transport.TransportOptions] = None,"
        ));
        lines.push(format!("{bump}) -> {returns}:"));

        let mut doc = method.summary.clone();
        if !method.description.is_empty() {
            if !doc.is_empty() {
                doc.push_str("\n\n");
            }
            doc.push_str(&method.description);
        }
        if method.deprecated {
            doc.push_str("\n\nDeprecated.");
        }
        let doc = docstring(&inner, &doc);
        if !doc.is_empty() {
            lines.push(doc.trim_end().to_string());
        }

        let mut path = method.endpoint.clone();
        for param in method.path_args() {
            path = path.replace(
                &format!("{{{}}}", param.name),
                &format!("{{self.encode_path_param({})}}", py_name(&param.name)),
            );
        }

        lines.push(format!("{inner}response = cast("));
        lines.push(format!("{nested}{returns},"));
        lines.push(format!("{nested}self.{}(", method.http_method.path_item_key()));
        lines.push(format!("{arg}path=f\"{path}\","));
        lines.push(format!("{arg}structure={returns},"));
        let query_args = method.query_args();
        if !query_args.is_empty() {
            let fields: Vec<String> = query_args
                .iter()
                .map(|p| format!("\"{}\": {}", p.name, py_name(&p.name)))
                .collect();
            lines.push(format!("{arg}query_params={{{}}},", fields.join(", ")));
        }
        if let Some(body) = method.body_arg() {
            lines.push(format!("{arg}body={},", py_name(&body.name)));
        }
        lines.push(format!("{arg}transport_options=transport_options,"));
        lines.push(format!("{nested}),"));
        lines.push(format!("{inner})"));
        lines.push(format!("{inner}return response"));
        Ok(lines.join("\n"))
    }

    fn declare_streamer(
        &self,
        _ctx: &mut GenContext<'_>,
        _indent: usize,
        method: &Method,
    ) -> Result<String> {
        Err(BackendError::Unsupported {
            language: self.language().to_string(),
            type_name: format!("stream of {}", method.operation_id),
        }
        .into())
    }

    fn methods_prologue(&self, ctx: &GenContext<'_>) -> Result<String> {
        render_template(METHODS_TEMPLATE, ctx)
    }

    fn methods_epilogue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        Ok(String::new())
    }

    fn streams_prologue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        Ok(String::new())
    }

    fn models_prologue(&self, ctx: &GenContext<'_>) -> Result<String> {
        render_template(MODELS_TEMPLATE, ctx)
    }

    fn models_epilogue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        Ok(String::new())
    }
}
