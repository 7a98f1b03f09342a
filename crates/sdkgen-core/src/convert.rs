//! Recovery of parameter styles lost in Swagger 2.0 → OpenAPI 3 conversion.
//!
//! Swagger 2.0 describes how array parameters are serialized with
//! `collectionFormat`; OpenAPI 3 uses `style`. Converters commonly drop this
//! information, so [`fix_conversion`] replays it from the original Swagger
//! document onto the converted one. It also carries over whether the Swagger
//! `body` parameter was required.
//!
//! # Examples
//!
//! ```
//! use sdkgen_core::convert::{fix_conversion, openapi_style};
//! use sdkgen_core::model::ParameterStyle;
//! use serde_json::json;
//!
//! assert_eq!(openapi_style("csv"), Some(ParameterStyle::Simple));
//! assert_eq!(openapi_style("tabs"), None);
//!
//! let swagger = json!({"paths": {"/items": {"get": {
//!     "operationId": "all_items",
//!     "parameters": [{"name": "ids", "in": "query", "collectionFormat": "csv"}]
//! }}}});
//! let mut openapi = json!({"paths": {"/items": {"get": {
//!     "operationId": "all_items",
//!     "parameters": [{"name": "ids", "in": "query"}]
//! }}}});
//! let fixes = fix_conversion(&mut openapi, &swagger);
//! assert_eq!(fixes, vec!["/items::all_items ids 'csv' -> 'simple'".to_string()]);
//! assert_eq!(openapi["paths"]["/items"]["get"]["parameters"][0]["style"], "simple");
//! ```

// Internal imports (std, crate)
use crate::model::ParameterStyle;

// External imports (alphabetized)
use log::{debug, warn};
use serde_json::Value as JsonValue;

/// Map a Swagger 2.0 `collectionFormat` to its OpenAPI 3 `style`.
///
/// `tabs` (and anything unknown) has no OpenAPI 3 equivalent and yields `None`
/// rather than a guess.
pub fn openapi_style(collection_format: &str) -> Option<ParameterStyle> {
    match collection_format {
        "csv" => Some(ParameterStyle::Simple),
        "ssv" => Some(ParameterStyle::SpaceDelimited),
        "pipes" => Some(ParameterStyle::PipeDelimited),
        _ => None,
    }
}

/// Apply the conversions a Swagger → OpenAPI converter missed.
///
/// For every Swagger operation:
/// * a `body` parameter with an explicit `required` sets `requestBody.required`
/// * a parameter with a known `collectionFormat` sets `style` on the matching
///   OpenAPI parameter
///
/// Returns the list of fixes applied, one line each.
pub fn fix_conversion(openapi: &mut JsonValue, swagger: &JsonValue) -> Vec<String> {
    let mut fixes = Vec::new();
    let Some(paths) = swagger.get("paths").and_then(JsonValue::as_object) else {
        return fixes;
    };

    for (endpoint, item) in paths {
        let Some(operations) = item.as_object() else {
            continue;
        };
        for (http_method, operation) in operations {
            let Some(params) = operation.get("parameters").and_then(JsonValue::as_array) else {
                continue;
            };
            let operation_id = operation
                .get("operationId")
                .and_then(JsonValue::as_str)
                .unwrap_or("");
            for param in params {
                let name = param.get("name").and_then(JsonValue::as_str).unwrap_or("");
                let location = param.get("in").and_then(JsonValue::as_str).unwrap_or("");

                if name == "body" && location == "body" {
                    if let Some(required) = param.get("required").and_then(JsonValue::as_bool) {
                        let fix = format!(
                            "{endpoint}::{operation_id} setting requestBody.required to {required}"
                        );
                        match openapi
                            .pointer_mut(&operation_pointer(endpoint, http_method))
                            .and_then(|op| op.get_mut("requestBody"))
                            .and_then(JsonValue::as_object_mut)
                        {
                            Some(body) => {
                                if body.get("required").and_then(JsonValue::as_bool)
                                    != Some(required)
                                {
                                    body.insert("required".to_string(), required.into());
                                    fixes.push(fix);
                                }
                            }
                            None => warn!(
                                "Failed to find \"requestBody\" for swagger body param fix: {fix}"
                            ),
                        }
                    }
                }

                let Some(format) = param.get("collectionFormat").and_then(JsonValue::as_str)
                else {
                    continue;
                };
                let Some(style) = openapi_style(format) else {
                    warn!("OAS style conversion failed: collectionFormat '{format}' is unknown");
                    continue;
                };
                let Some(target) = find_param_mut(openapi, endpoint, http_method, name) else {
                    warn!("Missing parameter: {endpoint} {http_method} parameter {name}");
                    continue;
                };
                if target.get("style").and_then(JsonValue::as_str) != Some(style.as_str()) {
                    target.insert("style".to_string(), style.as_str().into());
                    fixes.push(format!(
                        "{endpoint}::{operation_id} {name} '{format}' -> '{}'",
                        style.as_str()
                    ));
                }
            }
        }
    }

    debug!("Applied {} conversion fixes", fixes.len());
    fixes
}

/// JSON pointer to `paths[endpoint][method]`, escaping `/` and `~` per RFC 6901
fn operation_pointer(endpoint: &str, http_method: &str) -> String {
    let escaped = endpoint.replace('~', "~0").replace('/', "~1");
    format!("/paths/{escaped}/{http_method}")
}

fn find_param_mut<'a>(
    openapi: &'a mut JsonValue,
    endpoint: &str,
    http_method: &str,
    name: &str,
) -> Option<&'a mut serde_json::Map<String, JsonValue>> {
    openapi
        .pointer_mut(&operation_pointer(endpoint, http_method))?
        .get_mut("parameters")?
        .as_array_mut()?
        .iter_mut()
        .filter_map(JsonValue::as_object_mut)
        .find(|p| p.get("name").and_then(JsonValue::as_str) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_openapi_style() {
        assert_eq!(openapi_style("csv"), Some(ParameterStyle::Simple));
        assert_eq!(openapi_style("ssv"), Some(ParameterStyle::SpaceDelimited));
        assert_eq!(openapi_style("pipes"), Some(ParameterStyle::PipeDelimited));
        assert_eq!(openapi_style("tabs"), None);
        assert_eq!(openapi_style("multi"), None);
        assert_eq!(openapi_style(""), None);
    }

    #[test]
    fn test_fix_conversion_sets_style_and_body_required() {
        let swagger = json!({"paths": {"/users/{id}": {"patch": {
            "operationId": "update_user",
            "parameters": [
                {"name": "id", "in": "path", "required": true},
                {"name": "fields", "in": "query", "collectionFormat": "pipes"},
                {"name": "tags", "in": "query", "collectionFormat": "tabs"},
                {"name": "body", "in": "body", "required": false}
            ]
        }}}});
        let mut openapi = json!({"paths": {"/users/{id}": {"patch": {
            "operationId": "update_user",
            "parameters": [
                {"name": "id", "in": "path", "required": true},
                {"name": "fields", "in": "query"},
                {"name": "tags", "in": "query"}
            ],
            "requestBody": {"required": true}
        }}}});

        let fixes = fix_conversion(&mut openapi, &swagger);

        let op = &openapi["paths"]["/users/{id}"]["patch"];
        assert_eq!(op["parameters"][1]["style"], "pipeDelimited");
        assert!(op["parameters"][2].get("style").is_none());
        assert_eq!(op["requestBody"]["required"], false);
        assert_eq!(
            fixes,
            vec![
                "/users/{id}::update_user fields 'pipes' -> 'pipeDelimited'".to_string(),
                "/users/{id}::update_user setting requestBody.required to false".to_string(),
            ]
        );
    }

    #[test]
    fn test_fix_conversion_is_idempotent() {
        let swagger = json!({"paths": {"/a": {"get": {
            "operationId": "a",
            "parameters": [{"name": "ids", "in": "query", "collectionFormat": "csv"}]
        }}}});
        let mut openapi = json!({"paths": {"/a": {"get": {
            "operationId": "a",
            "parameters": [{"name": "ids", "in": "query"}]
        }}}});
        assert_eq!(fix_conversion(&mut openapi, &swagger).len(), 1);
        assert!(fix_conversion(&mut openapi, &swagger).is_empty());
    }
}
