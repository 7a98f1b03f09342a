//! Schema → type resolution.

// Internal imports (std, crate)
use std::sync::Arc;

use super::{ApiModel, ParameterStyle, TypeId, TypeKind};
use crate::error::SpecError;
use crate::openapi::ref_name;

// External imports (alphabetized)
use serde_json::Value as JsonValue;

impl ApiModel {
    /// Resolve a schema, or a reference string, to a node of the type graph.
    ///
    /// Rules, first match wins:
    /// 1. a string pointing into `requestBodies` is dereferenced to the body's
    ///    `application/json` schema
    /// 2. any other string is looked up by its last path segment
    /// 3. a `$ref` object is looked up in the reference map
    /// 4. an inline schema maps by `type` and `format` to an intrinsic or a
    ///    container (delimited styles turn arrays into `DelimArray`)
    ///
    /// Resolving the same reference twice yields the same [`TypeId`].
    pub fn resolve_type(
        &mut self,
        schema: &JsonValue,
        style: Option<ParameterStyle>,
    ) -> Result<TypeId, SpecError> {
        if let Some(reference) = schema.as_str() {
            return self.resolve_reference(reference);
        }

        if let Some(reference) = schema.get("$ref").and_then(JsonValue::as_str) {
            return match self.refs.get(reference) {
                Some(id) => Ok(*id),
                None => self.resolve_reference(reference),
            };
        }

        let kind = schema.get("type").and_then(JsonValue::as_str);
        let format = schema.get("format").and_then(JsonValue::as_str);

        match (kind, format) {
            (Some("integer"), Some("int64")) => return Ok(self.intrinsic("int64")),
            (Some("number"), Some(format)) => return Ok(self.intrinsic(format)),
            (Some("array"), _) => {
                if let Some(items) = schema.get("items") {
                    let element = self.resolve_type(items, None)?;
                    let delimited = style.is_some_and(|s| s.is_delimited());
                    return Ok(if delimited {
                        self.container(TypeKind::DelimArray(element))
                    } else {
                        self.container(TypeKind::Array(element))
                    });
                }
            }
            (Some("object"), _) => {
                if let Some(values) = schema
                    .get("additionalProperties")
                    .filter(|v| v.is_object())
                {
                    let element = self.resolve_type(values, None)?;
                    return Ok(self.container(TypeKind::Hash(element)));
                }
            }
            _ => {}
        }

        if format == Some("date-time") {
            return Ok(self.intrinsic("datetime"));
        }
        for name in [format, kind].into_iter().flatten() {
            if let Some(id) = self.known_intrinsic(name) {
                return Ok(id);
            }
        }

        Err(SpecError::unresolvable(schema))
    }

    fn resolve_reference(&mut self, reference: &str) -> Result<TypeId, SpecError> {
        if reference.contains("/requestBodies/") {
            let doc = Arc::clone(&self.document);
            let body = doc
                .resolve_pointer(reference)
                .ok_or_else(|| unknown(reference))?;
            let schema = body
                .pointer("/content/application~1json/schema")
                .ok_or_else(|| unknown(reference))?;
            return match schema.get("$ref").and_then(JsonValue::as_str) {
                Some(inner) => self.resolve_reference(inner),
                None => self.resolve_type(schema, None),
            };
        }

        self.types
            .get(ref_name(reference))
            .copied()
            .ok_or_else(|| unknown(reference))
    }

    fn known_intrinsic(&self, name: &str) -> Option<TypeId> {
        self.types
            .get(name)
            .copied()
            .filter(|id| self.ty(*id).is_intrinsic())
    }

    /// The intrinsic type with this name, registering it on first use
    pub(crate) fn intrinsic(&mut self, name: &str) -> TypeId {
        match self.known_intrinsic(name) {
            Some(id) => id,
            None => self.add_type(name, TypeKind::Intrinsic, JsonValue::Null),
        }
    }

    /// Interned container type: one node per (shape, element)
    pub(crate) fn container(&mut self, kind: TypeKind) -> TypeId {
        let name = {
            let element = |el: TypeId| self.ty(el).name.as_str();
            match kind {
                TypeKind::Array(el) => format!("{}[]", element(el)),
                TypeKind::DelimArray(el) => format!("DelimArray<{}>", element(el)),
                TypeKind::Hash(el) => format!("Hash[{}]", element(el)),
                _ => String::new(),
            }
        };
        if let Some(id) = self.types.get(&name) {
            if self.ty(*id).kind == kind {
                return *id;
            }
        }
        self.add_type(&name, kind, JsonValue::Null)
    }
}

fn unknown(reference: &str) -> SpecError {
    SpecError::UnknownReference {
        reference: reference.to_string(),
    }
}
