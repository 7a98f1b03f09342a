//! The API model: type graph, method table and tag groups.
//!
//! [`ApiModel::load`] walks a parsed OpenAPI document once and builds:
//! * an arena of [`Type`]s reachable by name and by JSON reference (both maps
//!   point at the same [`TypeId`])
//! * one [`Method`] per operation, keyed by operationId
//! * tag groups of methods
//!
//! Problems with single operations or schemas do not stop the load. They are
//! kept as [`Diagnostic`]s so the rest of the surface can still be generated.
//!
//! # Examples
//!
//! ```
//! use sdkgen_core::model::ApiModel;
//! use serde_json::json;
//!
//! let model = ApiModel::from_json(json!({
//!     "openapi": "3.0.0",
//!     "info": {"title": "Demo", "version": "1.0"},
//!     "paths": {"/users/{id}": {"get": {
//!         "operationId": "user",
//!         "tags": ["User"],
//!         "parameters": [{"name": "id", "in": "path", "schema": {"type": "integer"}}],
//!         "responses": {"200": {"description": "ok", "content": {
//!             "application/json": {"schema": {"$ref": "#/components/schemas/User"}}
//!         }}}
//!     }}},
//!     "components": {"schemas": {"User": {
//!         "properties": {"id": {"type": "integer", "readOnly": true}, "name": {"type": "string"}}
//!     }}}
//! }));
//!
//! assert!(model.diagnostics().is_empty());
//! let method = model.method("user").unwrap();
//! assert_eq!(model.ty(method.return_type()).name, "User");
//! assert!(model.tag("User").is_some());
//! ```

mod derived;
mod method;
mod resolve;
mod types;

pub use method::{
    HttpMethod, Method, MethodResponse, ParamLocation, Parameter, ParameterStyle, ResponseMode,
};
pub use types::{Property, Type, TypeId, TypeKind, INTRINSIC_TYPES};

// Internal imports (std, crate)
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::convert::openapi_style;
use crate::error::{Diagnostic, SpecError};
use crate::openapi::SpecDocument;
use types::text;

// External imports (alphabetized)
use log::{debug, info, warn};
use serde_json::Value as JsonValue;

/// Symbol table for one API document
#[derive(Debug, Clone)]
pub struct ApiModel {
    document: Arc<SpecDocument>,
    arena: Vec<Arc<Type>>,
    types: BTreeMap<String, TypeId>,
    refs: HashMap<String, TypeId>,
    methods: BTreeMap<String, Arc<Method>>,
    /// Synthesized types by structural hash
    request_types: HashMap<String, TypeId>,
    tags: BTreeMap<String, BTreeSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl ApiModel {
    /// An empty model holding only the intrinsic types
    pub fn new(document: SpecDocument) -> Self {
        let mut model = Self {
            document: Arc::new(document),
            arena: Vec::new(),
            types: BTreeMap::new(),
            refs: HashMap::new(),
            methods: BTreeMap::new(),
            request_types: HashMap::new(),
            tags: BTreeMap::new(),
            diagnostics: Vec::new(),
        };
        for name in INTRINSIC_TYPES {
            model.add_type(name, TypeKind::Intrinsic, JsonValue::Null);
        }
        model
    }

    /// Build the type graph and method table from a document
    pub fn load(document: SpecDocument) -> Self {
        let mut model = Self::new(document);
        model.load_types();
        model.load_methods();
        info!(
            "Loaded API model: {} types, {} methods, {} diagnostics",
            model.types.len(),
            model.methods.len(),
            model.diagnostics.len()
        );
        model
    }

    /// Shorthand for [`ApiModel::load`] on a raw JSON value
    pub fn from_json(json: JsonValue) -> Self {
        Self::load(SpecDocument::new(json))
    }

    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    pub fn title(&self) -> &str {
        self.document.title().unwrap_or_default()
    }

    pub fn version(&self) -> &str {
        self.document.version().unwrap_or_default()
    }

    /// Problems found while loading
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Look up a type node.
    ///
    /// Ids are only ever handed out by this model, so the index is in range.
    pub fn ty(&self, id: TypeId) -> &Type {
        &self.arena[id.0]
    }

    /// Shared handle on a type node
    pub fn type_arc(&self, id: TypeId) -> Arc<Type> {
        Arc::clone(&self.arena[id.0])
    }

    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.types.get(name).copied()
    }

    /// The type registered for a JSON reference such as `#/components/schemas/User`
    pub fn type_for_ref(&self, reference: &str) -> Option<TypeId> {
        self.refs.get(reference).copied()
    }

    /// All types sorted by name
    pub fn types(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.types.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn method(&self, operation_id: &str) -> Option<&Arc<Method>> {
        self.methods.get(operation_id)
    }

    /// All methods sorted by operationId
    pub fn methods(&self) -> impl Iterator<Item = &Arc<Method>> {
        self.methods.values()
    }

    /// Sorted operationIds of the methods under a tag
    pub fn tag(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.tags.get(name)
    }

    pub fn tags(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.tags
    }

    /// True when the type is read-only as a whole.
    ///
    /// Intrinsics never are. Containers follow their element. Other types are
    /// read-only when they have properties and all of them are read-only.
    pub fn is_read_only(&self, id: TypeId) -> bool {
        let ty = self.ty(id);
        match ty.kind {
            TypeKind::Intrinsic => false,
            TypeKind::Array(el) | TypeKind::DelimArray(el) | TypeKind::Hash(el) => {
                self.is_read_only(el)
            }
            _ => !ty.properties.is_empty() && ty.properties.iter().all(|p| p.read_only),
        }
    }

    /// Properties that can be sent in a request body
    pub fn writeable_properties(&self, id: TypeId) -> Vec<&Property> {
        self.ty(id)
            .properties
            .iter()
            .filter(|p| !(p.read_only || self.is_read_only(p.ty)))
            .collect()
    }

    /// Innermost non-intrinsic type behind any container wrapping
    pub fn custom_type(&self, id: TypeId) -> Option<TypeId> {
        let mut current = id;
        while let Some(el) = self.ty(current).element_type() {
            current = el;
        }
        (!self.ty(current).is_intrinsic()).then_some(current)
    }

    /// Keep only the listed operations (all when `include` is empty) minus the excluded ones
    pub fn retain_methods(&mut self, include: &[String], exclude: &[String]) {
        self.methods.retain(|op, _| {
            (include.is_empty() || include.contains(op)) && !exclude.contains(op)
        });
        let methods = &self.methods;
        for ops in self.tags.values_mut() {
            ops.retain(|op| methods.contains_key(op));
        }
        self.tags.retain(|_, ops| !ops.is_empty());
    }

    pub(crate) fn type_mut(&mut self, id: TypeId) -> &mut Type {
        Arc::make_mut(&mut self.arena[id.0])
    }

    /// Register a new type under a name not yet taken
    pub(crate) fn add_type(&mut self, name: &str, kind: TypeKind, schema: JsonValue) -> TypeId {
        let name = self.unique_name(name);
        let id = TypeId(self.arena.len());
        self.arena.push(Arc::new(Type::new(id, name.clone(), kind, schema)));
        self.types.insert(name, id);
        id
    }

    /// `base`, or `base` with the first numeric suffix that is free
    pub(crate) fn unique_name(&self, base: &str) -> String {
        if !self.types.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.types.contains_key(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn load_types(&mut self) {
        let doc = Arc::clone(&self.document);
        let Some(schemas) = doc.schemas() else {
            return;
        };
        let prefix = if doc.is_swagger() {
            "#/definitions/"
        } else {
            "#/components/schemas/"
        };

        for (name, schema) in schemas {
            if self.types.contains_key(name) {
                warn!("Schema '{name}' shadows a built-in type and will be renamed");
            }
            let id = self.add_type(name, TypeKind::Component, schema.clone());
            self.refs.insert(format!("{prefix}{name}"), id);
        }

        for (name, schema) in schemas {
            let Some(id) = self.refs.get(&format!("{prefix}{name}")).copied() else {
                continue;
            };
            self.load_properties(id, name, schema);
        }
    }

    fn load_properties(&mut self, id: TypeId, name: &str, schema: &JsonValue) {
        let Some(props) = schema.get("properties").and_then(JsonValue::as_object) else {
            return;
        };
        let required: BTreeSet<&str> = schema
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|arr| arr.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default();

        let mut properties = Vec::with_capacity(props.len());
        let mut custom_types = BTreeSet::new();
        for (prop_name, prop_schema) in props {
            match self.resolve_type(prop_schema, None) {
                Ok(ty) => {
                    if let Some(custom) = self.custom_type(ty) {
                        custom_types.insert(self.ty(custom).name.clone());
                    }
                    properties.push(types::Property::from_schema(
                        prop_name,
                        ty,
                        prop_schema,
                        required.contains(prop_name.as_str()),
                    ));
                }
                Err(e) => {
                    warn!("Skipping property {name}.{prop_name}: {e}");
                    self.diagnostics
                        .push(Diagnostic::new(format!("{name}.{prop_name}"), e));
                }
            }
        }

        let ty = self.type_mut(id);
        ty.properties = properties;
        ty.custom_types.extend(custom_types);
    }

    fn load_methods(&mut self) {
        let doc = Arc::clone(&self.document);
        let Some(paths) = doc.paths() else {
            warn!("Document has no 'paths' object");
            return;
        };

        for (endpoint, item) in paths {
            for verb in HttpMethod::ALL {
                let Some(op) = item.get(verb.path_item_key()) else {
                    continue;
                };
                match self.load_method(&doc, endpoint, verb, item, op) {
                    Ok(method) => self.add_method(method),
                    Err(e) => {
                        let subject = op
                            .get("operationId")
                            .and_then(JsonValue::as_str)
                            .map(String::from)
                            .unwrap_or_else(|| format!("{verb} {endpoint}"));
                        warn!("Skipping {subject}: {e}");
                        self.diagnostics.push(Diagnostic::new(subject, e));
                    }
                }
            }
        }
    }

    fn load_method(
        &mut self,
        doc: &SpecDocument,
        endpoint: &str,
        verb: HttpMethod,
        path_item: &JsonValue,
        op: &JsonValue,
    ) -> Result<Method, SpecError> {
        let operation_id = op
            .get("operationId")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| SpecError::MissingOperationId {
                http_method: verb.to_string(),
                endpoint: endpoint.to_string(),
            })?;
        debug!("Loading method {operation_id}: {verb} {endpoint}");

        let mut params = Vec::new();
        for raw in merged_parameters(doc, path_item, op)? {
            params.push(self.load_parameter(raw)?);
        }
        if let Some(body) = op.get("requestBody") {
            params.push(self.load_body(doc, body)?);
        }
        let responses = self.load_responses(doc, op)?;

        Method::new(operation_id, verb, endpoint, op.clone(), params, responses)
    }

    fn load_parameter(&mut self, raw: &JsonValue) -> Result<Parameter, SpecError> {
        let location_name = text(raw, "in");
        let location: ParamLocation =
            location_name
                .parse()
                .map_err(|_| SpecError::UnknownLocation {
                    location: location_name.clone(),
                    fragment: raw.to_string(),
                })?;
        let style = raw
            .get("style")
            .and_then(JsonValue::as_str)
            .and_then(|s| s.parse::<ParameterStyle>().ok())
            .or_else(|| {
                raw.get("collectionFormat")
                    .and_then(JsonValue::as_str)
                    .and_then(openapi_style)
            });
        // Swagger 2.0 parameters carry their type inline
        let schema = raw
            .get("schema")
            .or_else(|| first_content_schema(raw))
            .unwrap_or(raw);
        let ty = self.resolve_type(schema, style)?;
        Ok(Parameter::from_schema(raw, ty, location, style))
    }

    fn load_body(&mut self, doc: &SpecDocument, body: &JsonValue) -> Result<Parameter, SpecError> {
        let (resolved, ty) = match body.get("$ref").and_then(JsonValue::as_str) {
            Some(reference) => {
                let resolved = doc.resolve_pointer(reference).unwrap_or(body);
                let ty = self.resolve_type(&JsonValue::String(reference.to_string()), None)?;
                (resolved, ty)
            }
            None => {
                let ty = match first_content_schema(body) {
                    Some(schema) => self.resolve_type(schema, None)?,
                    None => self.intrinsic("any"),
                };
                (body, ty)
            }
        };

        let mut param = Parameter::new("body", ty, ParamLocation::Body);
        param.required = resolved
            .get("required")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true);
        param.description = text(resolved, "description");
        Ok(param)
    }

    fn load_responses(
        &mut self,
        doc: &SpecDocument,
        op: &JsonValue,
    ) -> Result<Vec<MethodResponse>, SpecError> {
        let mut responses = Vec::new();
        let Some(entries) = op.get("responses").and_then(JsonValue::as_object) else {
            return Ok(responses);
        };

        for (code, entry) in entries {
            let Ok(status_code) = code.parse::<u16>() else {
                debug!("Ignoring '{code}' response");
                continue;
            };
            let entry = doc.deref(entry).ok_or_else(|| SpecError::UnknownReference {
                reference: entry.to_string(),
            })?;
            let description = text(entry, "description");

            match entry.get("content").and_then(JsonValue::as_object) {
                Some(content) if !content.is_empty() => {
                    for (media_type, media) in content {
                        let ty = match media.get("schema") {
                            Some(schema) => self.resolve_type(schema, None)?,
                            None => self.intrinsic("any"),
                        };
                        responses.push(MethodResponse::new(
                            status_code,
                            media_type.as_str(),
                            ty,
                            description.as_str(),
                        ));
                    }
                }
                _ if status_code == 204 => {
                    let description = if description.is_empty() {
                        "No content".to_string()
                    } else {
                        description
                    };
                    let void = self.intrinsic("void");
                    responses.push(MethodResponse::new(204, "", void, description));
                }
                _ => {}
            }
        }
        Ok(responses)
    }

    fn add_method(&mut self, method: Method) {
        let operation_id = method.operation_id.clone();
        let used: Vec<TypeId> = method
            .params
            .iter()
            .map(|p| p.ty)
            .chain(method.responses.iter().map(|r| r.ty))
            .collect();
        for ty in used {
            self.type_mut(ty).method_refs.insert(operation_id.clone());
            if let Some(custom) = self.custom_type(ty) {
                self.type_mut(custom).method_refs.insert(operation_id.clone());
            }
        }

        if method.tags.is_empty() {
            self.tags.entry(String::new()).or_default().insert(operation_id.clone());
        }
        for tag in &method.tags {
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(operation_id.clone());
        }
        if self.methods.insert(operation_id.clone(), Arc::new(method)).is_some() {
            warn!("Duplicate operationId {operation_id}, keeping the last one");
        }
    }
}

/// Path-level parameters overridden by operation-level ones with the same name and location
fn merged_parameters<'a>(
    doc: &'a SpecDocument,
    path_item: &'a JsonValue,
    op: &'a JsonValue,
) -> Result<Vec<&'a JsonValue>, SpecError> {
    let declared = [path_item, op]
        .into_iter()
        .filter_map(|v| v.get("parameters").and_then(JsonValue::as_array))
        .flatten();

    let mut merged: Vec<&JsonValue> = Vec::new();
    for param in declared {
        let param = doc.deref(param).ok_or_else(|| SpecError::UnknownReference {
            reference: param.to_string(),
        })?;
        let key = (param.get("name"), param.get("in"));
        match merged
            .iter()
            .position(|p| (p.get("name"), p.get("in")) == key)
        {
            Some(pos) => merged[pos] = param,
            None => merged.push(param),
        }
    }
    Ok(merged)
}

/// Schema of `application/json` content, else of the first media type
fn first_content_schema(value: &JsonValue) -> Option<&JsonValue> {
    let content = value.get("content")?.as_object()?;
    content
        .get("application/json")
        .or_else(|| content.values().next())?
        .get("schema")
}
