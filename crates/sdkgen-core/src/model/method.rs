//! Methods, parameters and responses.
//!
//! One [`Method`] is built per HTTP operation. Construction enforces that a
//! method has a primary response and at least one recognizable response mode.
//!
//! # Examples
//!
//! ```
//! use sdkgen_core::model::ResponseMode;
//!
//! assert_eq!(ResponseMode::classify("application/json"), Some(ResponseMode::String));
//! assert_eq!(ResponseMode::classify("image/png"), Some(ResponseMode::Binary));
//! assert_eq!(ResponseMode::classify("text/csv"), Some(ResponseMode::String));
//! assert_eq!(ResponseMode::classify(""), None);
//! ```

// Internal imports (std, crate)
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::SpecError;
use crate::model::types::{flag, text, Property, TypeId};

// External imports (alphabetized)
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value as JsonValue;

static STRING_CONTENT: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"(^application/.*(\bjson\b|\bxml\b|\bsql\b|\bgraphql\b|\bjavascript\b|\bx-www-form-urlencoded\b)|^text/|.*\+xml\b|;.*\bcharset\b)",
    )
    .case_insensitive(true)
    .build()
    .expect("string content pattern is valid")
});

static BINARY_CONTENT: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^image/|^audio/|^video/|^font/|^application/|^multipart/")
        .case_insensitive(true)
        .build()
        .expect("binary content pattern is valid")
});

/// HTTP verbs a method can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Verbs in the order they are read from a path item
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Key of this verb inside an OpenAPI path item
    pub fn path_item_key(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter travels in the request.
///
/// The declaration order is the ordering priority used by
/// [`Method::all_params`]. `Body` is not an OpenAPI `in` value; it marks the
/// parameter synthesized from a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamLocation {
    Path,
    Body,
    Query,
    Header,
    Cookie,
}

impl FromStr for ParamLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path" => Ok(Self::Path),
            "body" => Ok(Self::Body),
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            "cookie" => Ok(Self::Cookie),
            _ => Err(format!("Unknown parameter location: {}", s)),
        }
    }
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Body => "body",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAPI 3 parameter serialization style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl FromStr for ParameterStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "matrix" => Ok(Self::Matrix),
            "label" => Ok(Self::Label),
            "form" => Ok(Self::Form),
            "simple" => Ok(Self::Simple),
            "spacedelimited" => Ok(Self::SpaceDelimited),
            "pipedelimited" => Ok(Self::PipeDelimited),
            "deepobject" => Ok(Self::DeepObject),
            _ => Err(format!("Unknown parameter style: {}", s)),
        }
    }
}

impl ParameterStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matrix => "matrix",
            Self::Label => "label",
            Self::Form => "form",
            Self::Simple => "simple",
            Self::SpaceDelimited => "spaceDelimited",
            Self::PipeDelimited => "pipeDelimited",
            Self::DeepObject => "deepObject",
        }
    }

    /// Styles that put an array on the wire as one delimited string
    pub fn is_delimited(&self) -> bool {
        matches!(
            self,
            Self::Simple | Self::SpaceDelimited | Self::PipeDelimited
        )
    }

    /// All styles
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::Matrix,
            Self::Label,
            Self::Form,
            Self::Simple,
            Self::SpaceDelimited,
            Self::PipeDelimited,
            Self::DeepObject,
        ]
        .into_iter()
    }
}

impl fmt::Display for ParameterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResponseMode {
    String,
    Binary,
}

impl ResponseMode {
    /// Classify a media type. String patterns win over binary ones since
    /// `application/*` would otherwise swallow `application/json`.
    pub fn classify(media_type: &str) -> Option<Self> {
        if STRING_CONTENT.is_match(media_type) {
            Some(Self::String)
        } else if BINARY_CONTENT.is_match(media_type) {
            Some(Self::Binary)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Binary => "binary",
        }
    }
}

/// A parameter of a method
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeId,
    pub location: ParamLocation,
    pub required: bool,
    pub description: String,
    pub style: Option<ParameterStyle>,
    pub deprecated: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeId, location: ParamLocation) -> Self {
        Self {
            name: name.into(),
            ty,
            location,
            required: location == ParamLocation::Path,
            description: String::new(),
            style: None,
            deprecated: false,
        }
    }

    /// Build a parameter from an OpenAPI parameter object and its resolved type
    pub(crate) fn from_schema(
        schema: &JsonValue,
        ty: TypeId,
        location: ParamLocation,
        style: Option<ParameterStyle>,
    ) -> Self {
        let name = text(schema, "name");
        Self {
            name,
            ty,
            location,
            // path parameters are always required
            required: location == ParamLocation::Path || flag(schema, "required"),
            description: text(schema, "description"),
            style,
            deprecated: flag(schema, "deprecated"),
        }
    }

    /// This parameter as a property of a request type
    pub fn as_property(&self) -> Property {
        Property {
            name: self.name.clone(),
            ty: self.ty,
            required: self.required,
            nullable: !self.required,
            read_only: false,
            write_only: false,
            deprecated: self.deprecated,
            description: self.description.clone(),
        }
    }
}

/// One (status, media type) response of a method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodResponse {
    pub status_code: u16,
    /// Empty for a response without content
    pub media_type: String,
    pub ty: TypeId,
    pub description: String,
}

impl MethodResponse {
    pub fn new(
        status_code: u16,
        media_type: impl Into<String>,
        ty: TypeId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            status_code,
            media_type: media_type.into(),
            ty,
            description: description.into(),
        }
    }

    pub fn mode(&self) -> Option<ResponseMode> {
        ResponseMode::classify(&self.media_type)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    fn is_json(&self) -> bool {
        self.media_type.to_lowercase().starts_with("application/json")
    }
}

/// One HTTP operation
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub operation_id: String,
    pub http_method: HttpMethod,
    pub endpoint: String,
    pub params: Vec<Parameter>,
    pub responses: Vec<MethodResponse>,
    /// Index into `responses`
    pub primary_response: usize,
    pub response_modes: BTreeSet<ResponseMode>,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
    pub deprecated: bool,
    /// Value of the `x-status` extension
    pub status: String,
    /// Value of the `x-activity-type` extension
    pub activity_type: String,
    pub rate_limited: bool,
    pub schema: JsonValue,
}

impl Method {
    /// Build a method, selecting its primary response and response modes.
    ///
    /// # Errors
    ///
    /// [`SpecError::MissingPrimaryResponse`] when there is no 2xx response,
    /// [`SpecError::UnknownResponseMode`] when content types are present but
    /// none is recognizable as string or binary.
    pub fn new(
        operation_id: impl Into<String>,
        http_method: HttpMethod,
        endpoint: impl Into<String>,
        schema: JsonValue,
        params: Vec<Parameter>,
        responses: Vec<MethodResponse>,
    ) -> Result<Self, SpecError> {
        let operation_id = operation_id.into();
        let endpoint = endpoint.into();

        let primary_response = Self::select_primary(&responses).ok_or_else(|| {
            SpecError::MissingPrimaryResponse {
                endpoint: endpoint.clone(),
                fragment: schema.get("responses").cloned().unwrap_or_default().to_string(),
            }
        })?;

        let response_modes: BTreeSet<ResponseMode> =
            responses.iter().filter_map(MethodResponse::mode).collect();
        // a bare 204 has no media type and so no mode of its own
        if response_modes.is_empty() {
            let media: Vec<&str> = responses.iter().map(|r| r.media_type.as_str()).collect();
            return Err(SpecError::UnknownResponseMode {
                operation_id,
                fragment: format!("{media:?}"),
            });
        }

        let tags = schema
            .get("tags")
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(JsonValue::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            operation_id,
            http_method,
            endpoint,
            params,
            responses,
            primary_response,
            response_modes,
            summary: text(&schema, "summary"),
            description: text(&schema, "description"),
            tags,
            deprecated: flag(&schema, "deprecated") || flag(&schema, "x-deprecated"),
            status: text(&schema, "x-status"),
            activity_type: text(&schema, "x-activity-type"),
            rate_limited: flag(&schema, "x-rate-limited"),
            schema,
        })
    }

    fn select_primary(responses: &[MethodResponse]) -> Option<usize> {
        let ok = |r: &MethodResponse| r.is_success() && r.status_code != 204;
        responses
            .iter()
            .position(|r| ok(r) && r.is_json())
            .or_else(|| responses.iter().position(ok))
            .or_else(|| responses.iter().position(|r| r.status_code == 204))
    }

    pub fn primary_response(&self) -> &MethodResponse {
        &self.responses[self.primary_response]
    }

    /// Type returned by the primary response
    pub fn return_type(&self) -> TypeId {
        self.primary_response().ty
    }

    pub fn required_params(&self) -> Vec<&Parameter> {
        self.sorted(self.params.iter().filter(|p| p.required))
    }

    pub fn optional_params(&self) -> Vec<&Parameter> {
        self.sorted(self.params.iter().filter(|p| !p.required))
    }

    /// Required parameters first, then optional ones, each group ordered by
    /// location `[path, body, query, header, cookie]`.
    pub fn all_params(&self) -> Vec<&Parameter> {
        let mut all = self.required_params();
        all.extend(self.optional_params());
        all
    }

    fn sorted<'a>(&self, params: impl Iterator<Item = &'a Parameter>) -> Vec<&'a Parameter> {
        let mut list: Vec<&Parameter> = params.collect();
        // stable, so declaration order survives within a location
        list.sort_by_key(|p| p.location);
        list
    }

    pub fn params_in(&self, location: ParamLocation) -> Vec<&Parameter> {
        self.all_params()
            .into_iter()
            .filter(|p| p.location == location)
            .collect()
    }

    pub fn path_args(&self) -> Vec<&Parameter> {
        self.params_in(ParamLocation::Path)
    }

    pub fn body_arg(&self) -> Option<&Parameter> {
        self.params.iter().find(|p| p.location == ParamLocation::Body)
    }

    pub fn query_args(&self) -> Vec<&Parameter> {
        self.params_in(ParamLocation::Query)
    }

    pub fn header_args(&self) -> Vec<&Parameter> {
        self.params_in(ParamLocation::Header)
    }

    pub fn cookie_args(&self) -> Vec<&Parameter> {
        self.params_in(ParamLocation::Cookie)
    }

    pub fn has_optional_params(&self) -> bool {
        self.params.iter().any(|p| !p.required)
    }

    /// More than one optional parameter, so a request type may stand in for them
    pub fn may_use_request_type(&self) -> bool {
        self.params.iter().filter(|p| !p.required).count() > 1
    }

    /// Responses with status >= 400, one per response type
    pub fn error_responses(&self) -> Vec<&MethodResponse> {
        let mut seen = BTreeSet::new();
        self.responses
            .iter()
            .filter(|r| r.status_code >= 400 && seen.insert(r.ty))
            .collect()
    }

    pub fn response_is_binary(&self) -> bool {
        self.response_modes.contains(&ResponseMode::Binary)
    }

    pub fn response_is_string(&self) -> bool {
        self.response_modes.contains(&ResponseMode::String)
    }

    pub fn response_is_both(&self) -> bool {
        self.response_is_binary() && self.response_is_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USER: TypeId = TypeId(20);
    const ERROR: TypeId = TypeId(21);
    const STRING: TypeId = TypeId(0);

    fn method(params: Vec<Parameter>, responses: Vec<MethodResponse>) -> Result<Method, SpecError> {
        Method::new(
            "user",
            HttpMethod::Get,
            "/users/{user_id}",
            json!({"tags": ["User"], "summary": "Get user", "x-activity-type": "db_query"}),
            params,
            responses,
        )
    }

    #[test]
    fn test_response_mode_classification() {
        assert_eq!(ResponseMode::classify("application/json"), Some(ResponseMode::String));
        assert_eq!(ResponseMode::classify("application/sql"), Some(ResponseMode::String));
        assert_eq!(ResponseMode::classify("application/vnd+xml"), Some(ResponseMode::String));
        assert_eq!(ResponseMode::classify("TEXT/CSV"), Some(ResponseMode::String));
        assert_eq!(
            ResponseMode::classify("application/octet-stream; charset=utf-8"),
            Some(ResponseMode::String)
        );
        assert_eq!(ResponseMode::classify("image/png"), Some(ResponseMode::Binary));
        assert_eq!(ResponseMode::classify("application/pdf"), Some(ResponseMode::Binary));
        assert_eq!(ResponseMode::classify("multipart/form-data"), Some(ResponseMode::Binary));
        assert_eq!(ResponseMode::classify("bogus/thing"), None);
    }

    #[test]
    fn test_primary_prefers_json_success() {
        let m = method(
            vec![],
            vec![
                MethodResponse::new(400, "application/json", ERROR, "Bad"),
                MethodResponse::new(200, "application/json", USER, "User"),
                MethodResponse::new(200, "text/plain", USER, "User"),
            ],
        )
        .unwrap();
        let primary = m.primary_response();
        assert_eq!(primary.status_code, 200);
        assert_eq!(primary.media_type, "application/json");
        assert_eq!(m.return_type(), USER);
        assert_eq!(m.tags, vec!["User".to_string()]);
        assert_eq!(m.activity_type, "db_query");
    }

    #[test]
    fn test_primary_falls_back_to_any_2xx_then_204() {
        let m = method(
            vec![],
            vec![
                MethodResponse::new(204, "", STRING, "No content"),
                MethodResponse::new(201, "image/png", USER, "Created"),
            ],
        )
        .unwrap();
        assert_eq!(m.primary_response().status_code, 201);

        let m = method(
            vec![],
            vec![
                MethodResponse::new(204, "", STRING, "No content"),
                MethodResponse::new(400, "application/json", ERROR, "Bad"),
            ],
        )
        .unwrap();
        assert_eq!(m.primary_response().status_code, 204);
        assert!(m.response_is_string());
    }

    #[test]
    fn test_content_less_responses_have_no_mode() {
        let err = method(vec![], vec![MethodResponse::new(204, "", STRING, "No content")])
            .unwrap_err();
        assert!(matches!(err, SpecError::UnknownResponseMode { .. }));
        assert!(err.to_string().contains("binary or string"));
    }

    #[test]
    fn test_missing_primary_response() {
        let err = method(
            vec![],
            vec![MethodResponse::new(404, "application/json", ERROR, "Not found")],
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::MissingPrimaryResponse { .. }));
        assert!(err.to_string().contains("/users/{user_id}"));
    }

    #[test]
    fn test_unknown_response_mode() {
        let err = method(vec![], vec![MethodResponse::new(200, "bogus/thing", USER, "")]).unwrap_err();
        assert!(matches!(err, SpecError::UnknownResponseMode { .. }));
    }

    #[test]
    fn test_response_is_both() {
        let m = method(
            vec![],
            vec![
                MethodResponse::new(200, "application/json", USER, ""),
                MethodResponse::new(200, "image/png", STRING, ""),
            ],
        )
        .unwrap();
        assert!(m.response_is_both());
        assert!(m.response_is_binary());
    }

    #[test]
    fn test_all_params_ordering() {
        let mut q1 = Parameter::new("q1", STRING, ParamLocation::Query);
        q1.required = false;
        let mut b1 = Parameter::new("body", USER, ParamLocation::Body);
        b1.required = true;
        let p1 = Parameter::new("user_id", STRING, ParamLocation::Path);
        let mut h1 = Parameter::new("h1", STRING, ParamLocation::Header);
        h1.required = true;

        let m = method(
            vec![q1, h1, b1, p1],
            vec![MethodResponse::new(200, "application/json", USER, "")],
        )
        .unwrap();
        let names: Vec<&str> = m.all_params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["user_id", "body", "h1", "q1"]);
        assert_eq!(m.body_arg().map(|p| p.name.as_str()), Some("body"));
        assert_eq!(m.path_args().len(), 1);
        assert!(m.has_optional_params());
        assert!(!m.may_use_request_type());
    }

    #[test]
    fn test_error_responses_dedup_by_type() {
        let m = method(
            vec![],
            vec![
                MethodResponse::new(200, "application/json", USER, ""),
                MethodResponse::new(400, "application/json", ERROR, ""),
                MethodResponse::new(404, "application/json", ERROR, ""),
                MethodResponse::new(422, "application/json", USER, ""),
            ],
        )
        .unwrap();
        let codes: Vec<u16> = m.error_responses().iter().map(|r| r.status_code).collect();
        assert_eq!(codes, vec![400, 422]);
    }

    #[test]
    fn test_parameter_as_property() {
        let mut p = Parameter::new("limit", STRING, ParamLocation::Query);
        p.description = "max rows".to_string();
        let prop = p.as_property();
        assert!(!prop.required);
        assert!(prop.nullable);
        assert!(!prop.read_only);
        assert_eq!(prop.description, "max rows");
    }

    #[test]
    fn test_param_location_from_str() {
        assert_eq!("PATH".parse::<ParamLocation>(), Ok(ParamLocation::Path));
        assert_eq!("cookie".parse::<ParamLocation>(), Ok(ParamLocation::Cookie));
        assert!("formData".parse::<ParamLocation>().is_err());
    }

    #[test]
    fn test_parameter_style_round_trip_names() {
        for style in ParameterStyle::all() {
            assert_eq!(style.as_str().parse::<ParameterStyle>(), Ok(style));
        }
        assert!(ParameterStyle::Simple.is_delimited());
        assert!(!ParameterStyle::Form.is_delimited());
    }
}
