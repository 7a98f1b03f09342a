//! Walker conformance: what the walkers ask of a backend, and in which order.

use std::sync::Mutex;

use sdkgen_core::codegen::{generate, CodeGen, GenContext, GenerateOptions, MappedType};
use sdkgen_core::model::{ApiModel, Method, Parameter, Property, TypeId};
use sdkgen_core::{BackendError, Error, Result};
use serde_json::{json, Value as JsonValue};

/// Records every primitive call as one line
struct Recorder {
    requests: bool,
    streaming: bool,
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn new(requests: bool, streaming: bool) -> Self {
        Self {
            requests,
            streaming,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn position(&self, call: &str) -> usize {
        self.calls()
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{call} was never called"))
    }
}

impl CodeGen for Recorder {
    fn language(&self) -> &'static str {
        "recorder"
    }

    fn file_extension(&self) -> &'static str {
        "rec"
    }

    fn needs_request_types(&self) -> bool {
        self.requests
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    fn type_map(&self, ctx: &mut GenContext<'_>, ty: TypeId) -> Result<MappedType> {
        ctx.reference(ty);
        let name = ctx.ty(ty).name.clone();
        if name == "mystery" {
            return Err(BackendError::UnknownIntrinsic {
                language: self.language().to_string(),
                type_name: name,
            }
            .into());
        }
        Ok(MappedType::new(name))
    }

    fn declare_property(
        &self,
        _ctx: &mut GenContext<'_>,
        indent: usize,
        property: &Property,
    ) -> Result<String> {
        self.record(format!("property {} {indent}", property.name));
        Ok(property.name.clone())
    }

    fn declare_parameter(
        &self,
        _ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
        param: &Parameter,
    ) -> Result<String> {
        self.record(format!("parameter {}.{} {indent}", method.operation_id, param.name));
        Ok(param.name.clone())
    }

    fn declare_type(&self, ctx: &mut GenContext<'_>, indent: usize, ty: TypeId) -> Result<String> {
        let name = ctx.ty(ty).name.clone();
        self.record(format!("type {name} {indent}"));
        for property in ctx.ty(ty).properties.clone() {
            self.type_map(ctx, property.ty)?;
        }
        Ok(name)
    }

    fn declare_method(
        &self,
        ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
    ) -> Result<String> {
        self.record(format!("method {} {indent}", method.operation_id));
        let request = self.request_type_name(ctx, method);
        if !request.is_empty() {
            self.record(format!("request {request}"));
        }
        self.type_map(ctx, method.return_type())?;
        Ok(method.operation_id.clone())
    }

    fn declare_streamer(
        &self,
        _ctx: &mut GenContext<'_>,
        indent: usize,
        method: &Method,
    ) -> Result<String> {
        self.record(format!("streamer {} {indent}", method.operation_id));
        Ok(method.operation_id.clone())
    }

    fn methods_prologue(&self, ctx: &GenContext<'_>) -> Result<String> {
        self.record(format!("methods_prologue {}", ctx.referenced_type_names().join(",")));
        Ok("methods".into())
    }

    fn methods_epilogue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        self.record("methods_epilogue".into());
        Ok(String::new())
    }

    fn streams_prologue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        self.record("streams_prologue".into());
        Ok("streams".into())
    }

    fn models_prologue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        self.record("models_prologue".into());
        Ok("models".into())
    }

    fn models_epilogue(&self, _ctx: &GenContext<'_>) -> Result<String> {
        self.record("models_epilogue".into());
        Ok(String::new())
    }
}

fn spec() -> JsonValue {
    json!({
        "openapi": "3.0.0",
        "info": {"title": "Conformance", "version": "2.1"},
        "paths": {
            "/users": {
                "get": {
                    "operationId": "search_users",
                    "parameters": [
                        {"name": "name", "in": "query", "schema": {"type": "string"}},
                        {"name": "email", "in": "query", "schema": {"type": "string"}}
                    ],
                    "responses": {"200": {"description": "ok", "content": {"application/json": {
                        "schema": {"type": "array", "items": {"$ref": "#/components/schemas/User"}}
                    }}}}
                },
                "post": {
                    "operationId": "create_user",
                    "requestBody": {"content": {"application/json": {
                        "schema": {"$ref": "#/components/schemas/User"}
                    }}},
                    "responses": {"200": {"description": "ok", "content": {"application/json": {
                        "schema": {"$ref": "#/components/schemas/User"}
                    }}}}
                }
            },
            "/groups/{id}": {"get": {
                "operationId": "group",
                "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}],
                "responses": {"200": {"description": "ok", "content": {"application/json": {
                    "schema": {"$ref": "#/components/schemas/Group"}
                }}}}
            }}
        },
        "components": {"schemas": {
            "User": {"properties": {
                "id": {"type": "integer", "readOnly": true},
                "name": {"type": "string"}
            }},
            "Group": {"properties": {"name": {"type": "string"}}}
        }}
    })
}

#[test]
fn test_methods_are_declared_in_sorted_order_before_the_prologue() {
    let backend = Recorder::new(false, false);
    let mut model = ApiModel::from_json(spec());
    generate(&mut model, &backend, &GenerateOptions::new("2.1", "demo")).unwrap();

    let create = backend.position("method create_user 1");
    let group = backend.position("method group 1");
    let search = backend.position("method search_users 1");
    assert!(create < group && group < search);

    // the prologue sees every type the methods referenced
    let prologue = backend.position("methods_prologue Group,User");
    assert!(search < prologue);
    assert!(prologue < backend.position("methods_epilogue"));
}

#[test]
fn test_models_are_declared_at_top_level_before_their_prologue() {
    let backend = Recorder::new(false, false);
    let mut model = ApiModel::from_json(spec());
    let sdk = generate(&mut model, &backend, &GenerateOptions::new("2.1", "demo")).unwrap();

    let types: Vec<String> = backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("type "))
        .collect();
    assert!(types.contains(&"type Group 0".to_string()));
    assert!(types.contains(&"type User 0".to_string()));
    assert!(types.iter().all(|c| c.ends_with(" 0")));
    assert!(backend.position("type User 0") < backend.position("models_prologue"));

    // output is sorted by name no matter the declaration order
    let body: Vec<&str> = sdk.models.lines().skip(2).filter(|l| !l.is_empty()).collect();
    assert_eq!(body, vec!["Group", "User"]);
}

#[test]
fn test_streams_file_follows_the_capability_flag() {
    let silent = Recorder::new(false, false);
    let mut model = ApiModel::from_json(spec());
    let sdk = generate(&mut model, &silent, &GenerateOptions::new("2.1", "demo")).unwrap();
    assert!(sdk.streams.is_none());
    assert!(!silent.calls().iter().any(|c| c.starts_with("streamer")));

    let streaming = Recorder::new(false, true);
    let mut model = ApiModel::from_json(spec());
    let sdk = generate(&mut model, &streaming, &GenerateOptions::new("2.1", "demo")).unwrap();
    let streams = sdk.streams.unwrap();
    assert_eq!(
        streams,
        "streams\n  // 3 API methods\ncreate_user\n\ngroup\n\nsearch_users\n"
    );
    assert!(streaming.position("streamer search_users 1") < streaming.position("streams_prologue"));
}

#[test]
fn test_request_type_name_needs_backend_and_method_support() {
    let backend = Recorder::new(true, false);
    let mut model = ApiModel::from_json(spec());
    let sdk = generate(&mut model, &backend, &GenerateOptions::new("2.1", "demo")).unwrap();
    assert!(backend.calls().contains(&"request RequestSearchUsers".to_string()));
    // only search_users has more than one optional parameter
    assert_eq!(
        backend.calls().iter().filter(|c| c.starts_with("request ")).count(),
        1
    );
    assert!(sdk.models.contains("RequestSearchUsers"));

    let backend = Recorder::new(false, false);
    let mut model = ApiModel::from_json(spec());
    let search = model.method("search_users").unwrap().clone();
    let mut ctx = GenContext::new(&mut model, "2.1", "demo");
    assert_eq!(backend.request_type_name(&mut ctx, &search), "");
}

#[test]
fn test_type_map_failure_aborts_the_pass() {
    let backend = Recorder::new(false, false);
    let mut model = ApiModel::from_json(json!({
        "openapi": "3.0.0",
        "paths": {"/odd": {"get": {
            "operationId": "odd",
            "responses": {"200": {"description": "ok", "content": {"application/json": {
                "schema": {"type": "number", "format": "mystery"}
            }}}}
        }}}
    }));
    let err = generate(&mut model, &backend, &GenerateOptions::new("1", "demo")).unwrap_err();
    assert!(matches!(err, Error::Backend(BackendError::UnknownIntrinsic { .. })));
    assert!(err.to_string().contains("mystery"));
}

#[test]
fn test_comment_header_uses_backend_markers() {
    let backend = Recorder::new(false, false);
    assert_eq!(backend.bumper(2), "    ");
    assert_eq!(
        backend.comment_header(1, "first\n\nsecond"),
        "  // first\n  //\n  // second"
    );
    assert_eq!(backend.comment_header(0, ""), "");
}
