//! Regex search across methods and types.
//!
//! A search takes a pattern and a set of [`SearchCriterion`]s that choose which
//! text of each entity is examined. Matching methods come back grouped by
//! every tag they declare; matching types come back by name.
//!
//! # Examples
//!
//! ```
//! use sdkgen_core::model::ApiModel;
//! use sdkgen_core::search::criteria_from_names;
//! use serde_json::json;
//!
//! let model = ApiModel::from_json(json!({
//!     "openapi": "3.0.0",
//!     "paths": {},
//!     "components": {"schemas": {
//!         "Dashboard": {"properties": {"id": {"type": "string"}}},
//!         "DashboardElement": {"properties": {"id": {"type": "string"}}}
//!     }}
//! }));
//! let criteria = criteria_from_names(["type", "name"]).unwrap();
//! let found = model.search(r"\bdashboard\b", &criteria);
//! assert_eq!(found.types.keys().collect::<Vec<_>>(), vec!["Dashboard"]);
//! ```

// Internal imports (std, crate)
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::model::{ApiModel, Method, MethodResponse, Parameter, Property, TypeId};

// External imports (alphabetized)
use log::debug;
use regex::{Regex, RegexBuilder};

/// What part of an entity a search examines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SearchCriterion {
    Method,
    Type,
    Name,
    Description,
    Argument,
    Property,
    Title,
    ActivityType,
    Status,
    Response,
}

impl FromStr for SearchCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "method" => Ok(Self::Method),
            "type" => Ok(Self::Type),
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "argument" => Ok(Self::Argument),
            "property" => Ok(Self::Property),
            "title" => Ok(Self::Title),
            "activitytype" | "activity_type" => Ok(Self::ActivityType),
            "status" => Ok(Self::Status),
            "response" => Ok(Self::Response),
            _ => Err(format!("Unknown search criterion: {}", s)),
        }
    }
}

impl SearchCriterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Type => "type",
            Self::Name => "name",
            Self::Description => "description",
            Self::Argument => "argument",
            Self::Property => "property",
            Self::Title => "title",
            Self::ActivityType => "activityType",
            Self::Status => "status",
            Self::Response => "response",
        }
    }

    /// All criteria
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::Method,
            Self::Type,
            Self::Name,
            Self::Description,
            Self::Argument,
            Self::Property,
            Self::Title,
            Self::ActivityType,
            Self::Status,
            Self::Response,
        ]
        .into_iter()
    }
}

impl fmt::Display for SearchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type SearchCriteria = BTreeSet<SearchCriterion>;

/// Every criterion
pub fn search_all() -> SearchCriteria {
    SearchCriterion::all().collect()
}

/// Parse criterion names, failing on the first unknown one
pub fn criteria_from_names<I, S>(names: I) -> Result<SearchCriteria, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names.into_iter().map(|n| n.as_ref().parse()).collect()
}

pub fn criteria_to_names(criteria: &SearchCriteria) -> Vec<&'static str> {
    criteria.iter().map(SearchCriterion::as_str).collect()
}

/// Outcome of [`ApiModel::search`]
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// `Search done`, or the reason the pattern was rejected
    pub message: String,
    /// tag → operationId → method
    pub tags: BTreeMap<String, BTreeMap<String, Arc<Method>>>,
    pub types: BTreeMap<String, TypeId>,
}

impl SearchResult {
    pub fn is_error(&self) -> bool {
        self.message.starts_with("Error:")
    }

    /// Number of distinct matching methods
    pub fn method_count(&self) -> usize {
        self.tags
            .values()
            .flat_map(|methods| methods.keys())
            .collect::<HashSet<_>>()
            .len()
    }
}

fn search_it(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("{value}\t")
    }
}

fn deprecation(deprecated: bool) -> &'static str {
    if deprecated {
        "deprecated"
    } else {
        ""
    }
}

impl ApiModel {
    /// Search methods and types for a regular expression.
    ///
    /// The pattern is case-insensitive and multi-line. An invalid pattern does
    /// not fail: the result carries an `Error: Invalid search expression`
    /// message and no matches.
    pub fn search(&self, pattern: &str, criteria: &SearchCriteria) -> SearchResult {
        let mut result = SearchResult {
            message: "Search done".to_string(),
            ..Default::default()
        };

        let rx = match RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
        {
            Ok(rx) => rx,
            Err(e) => {
                result.message = format!("Error: Invalid search expression {e}");
                return result;
            }
        };
        let searcher = Searcher {
            model: self,
            rx: &rx,
            criteria,
        };

        if is_method_search(criteria) {
            for method in self.methods() {
                if searcher.method(method) {
                    let tags: Vec<&str> = if method.tags.is_empty() {
                        vec![""]
                    } else {
                        method.tags.iter().map(String::as_str).collect()
                    };
                    for tag in tags {
                        result
                            .tags
                            .entry(tag.to_string())
                            .or_default()
                            .insert(method.operation_id.clone(), Arc::clone(method));
                    }
                }
            }
        }

        if is_type_search(criteria) {
            for (name, id) in self.types() {
                if self.ty(id).element_type().is_some() {
                    continue;
                }
                if searcher.ty(id, &mut HashSet::new()) {
                    result.types.insert(name.to_string(), id);
                }
            }
        }

        debug!(
            "Search '{pattern}' matched {} methods and {} types",
            result.method_count(),
            result.types.len()
        );
        result
    }
}

fn is_method_search(criteria: &SearchCriteria) -> bool {
    [
        SearchCriterion::Method,
        SearchCriterion::Argument,
        SearchCriterion::Response,
        SearchCriterion::Status,
        SearchCriterion::ActivityType,
    ]
    .iter()
    .any(|c| criteria.contains(c))
}

fn is_type_search(criteria: &SearchCriteria) -> bool {
    [
        SearchCriterion::Type,
        SearchCriterion::Title,
        SearchCriterion::Status,
    ]
    .iter()
    .any(|c| criteria.contains(c))
}

struct Searcher<'a> {
    model: &'a ApiModel,
    rx: &'a Regex,
    criteria: &'a SearchCriteria,
}

impl Searcher<'_> {
    fn has(&self, criterion: SearchCriterion) -> bool {
        self.criteria.contains(&criterion)
    }

    fn method(&self, method: &Method) -> bool {
        if self.rx.is_match(&self.method_text(method))
            || self.ty(method.return_type(), &mut HashSet::new())
        {
            return true;
        }
        if self.has(SearchCriterion::Argument) && method.params.iter().any(|p| self.parameter(p)) {
            return true;
        }
        self.has(SearchCriterion::Response) && method.responses.iter().any(|r| self.response(r))
    }

    fn method_text(&self, method: &Method) -> String {
        use SearchCriterion::*;
        if ![Method, Status, ActivityType, Name, Argument]
            .iter()
            .any(|c| self.has(*c))
        {
            return String::new();
        }
        let mut text = String::new();
        if self.has(Name) || self.has(Method) {
            text += &search_it(&method.operation_id);
        }
        text += &search_it(&method.summary);
        text += &search_it(&method.endpoint);
        if self.has(Method) && self.has(Description) {
            text += &search_it(&method.description);
        }
        if self.has(ActivityType) {
            if method.rate_limited {
                text += &search_it("rate_limited");
            }
            text += &search_it(&method.activity_type);
        }
        if self.has(Status) {
            text += &search_it(&method.status);
            text += &search_it(deprecation(method.deprecated));
        }
        if self.has(Argument) {
            for param in &method.params {
                text += &self.parameter_text(param);
            }
        }
        text
    }

    fn parameter(&self, param: &Parameter) -> bool {
        self.rx.is_match(&self.parameter_text(param)) || self.ty(param.ty, &mut HashSet::new())
    }

    fn parameter_text(&self, param: &Parameter) -> String {
        let mut text = String::new();
        if self.has(SearchCriterion::Name) {
            text += &search_it(&param.name);
        }
        if self.has(SearchCriterion::Description) {
            text += &search_it(&param.description);
        }
        text
    }

    fn response(&self, response: &MethodResponse) -> bool {
        let mut text = search_it(&response.status_code.to_string());
        if let Some(mode) = response.mode() {
            text += &search_it(mode.as_str());
        }
        if self.has(SearchCriterion::Name) {
            text += &search_it(&response.media_type);
        }
        self.rx.is_match(&text) || self.ty(response.ty, &mut HashSet::new())
    }

    /// `visited` stops the walk through recursive type graphs
    fn ty(&self, id: TypeId, visited: &mut HashSet<TypeId>) -> bool {
        use SearchCriterion::*;
        if !(self.has(Type) || self.has(Status)) || !visited.insert(id) {
            return false;
        }
        let ty = self.model.ty(id);

        let mut text = String::new();
        if self.has(Name) {
            text += &search_it(&ty.name);
        }
        if self.has(Description) {
            text += &search_it(&ty.description);
        }
        if self.has(Title) {
            text += &search_it(&ty.title);
        }
        if self.has(Status) {
            text += &search_it(&ty.status);
            text += &search_it(deprecation(ty.deprecated));
        }
        if self.has(Property) {
            for prop in &ty.properties {
                text += &self.property_text(prop);
            }
        }
        if self.rx.is_match(&text) {
            return true;
        }

        (self.has(Property) || self.has(Status))
            && ty.properties.iter().any(|p| self.property(p, visited))
    }

    fn property(&self, prop: &Property, visited: &mut HashSet<TypeId>) -> bool {
        self.rx.is_match(&self.property_text(prop)) || self.ty(prop.ty, visited)
    }

    fn property_text(&self, prop: &Property) -> String {
        let mut text = String::new();
        if self.has(SearchCriterion::Name) || self.has(SearchCriterion::Method) {
            text += &search_it(&prop.name);
        }
        if self.has(SearchCriterion::Description) {
            text += &search_it(&prop.description);
        }
        if self.has(SearchCriterion::Status) {
            text += &search_it(deprecation(prop.deprecated));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> ApiModel {
        ApiModel::from_json(json!({
            "openapi": "3.0.0",
            "info": {"title": "Test", "version": "1"},
            "paths": {
                "/dashboards/{dashboard_id}": {
                    "get": {
                        "operationId": "dashboard",
                        "tags": ["Dashboard"],
                        "summary": "Get a board",
                        "description": "Renders the board layout",
                        "x-activity-type": "db_query",
                        "parameters": [{"name": "dashboard_id", "in": "path", "schema": {"type": "string"}}],
                        "responses": {
                            "200": {"description": "ok", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Dashboard"}}}},
                            "404": {"description": "missing", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}}
                        }
                    }
                },
                "/dashboard_elements": {
                    "get": {
                        "operationId": "dashboard_element_list",
                        "tags": ["Dashboard", "Element"],
                        "summary": "List elements",
                        "x-status": "beta",
                        "parameters": [{"name": "fields", "in": "query", "description": "Requested fields", "schema": {"type": "string"}}],
                        "responses": {
                            "200": {"description": "ok", "content": {"image/png": {"schema": {"type": "string", "format": "binary"}}}}
                        }
                    }
                }
            },
            "components": {"schemas": {
                "Dashboard": {"title": "Board", "properties": {
                    "id": {"type": "string"},
                    "folder": {"$ref": "#/components/schemas/Folder"}
                }},
                "DashboardElement": {"x-status": "beta", "properties": {"id": {"type": "string"}}},
                "Folder": {"properties": {
                    "parent": {"$ref": "#/components/schemas/Folder"},
                    "owner_email": {"type": "string", "description": "who owns it"}
                }},
                "Error": {"properties": {"message": {"type": "string"}}}
            }}
        }))
    }

    #[test]
    fn test_whole_word_name_match() {
        let model = model();
        let criteria = criteria_from_names(["method", "type", "name"]).unwrap();
        let result = model.search(r"\bdashboard\b", &criteria);
        assert_eq!(result.message, "Search done");
        assert_eq!(result.types.keys().collect::<Vec<_>>(), vec!["Dashboard"]);
        // matches the method named `dashboard`, not `dashboard_element_list`
        let board = result.tags.get("Dashboard").unwrap();
        assert_eq!(board.keys().collect::<Vec<_>>(), vec!["dashboard"]);
        assert_eq!(result.method_count(), 1);
    }

    #[test]
    fn test_invalid_expression_fails_softly() {
        let result = model().search("(unclosed", &search_all());
        assert!(result.is_error());
        assert!(result.message.starts_with("Error: Invalid search expression"));
        assert!(result.tags.is_empty());
        assert!(result.types.is_empty());
    }

    #[test]
    fn test_methods_grouped_under_every_tag() {
        let model = model();
        let criteria = criteria_from_names(["method", "name"]).unwrap();
        let result = model.search("element_list", &criteria);
        assert!(result.tags["Dashboard"].contains_key("dashboard_element_list"));
        assert!(result.tags["Element"].contains_key("dashboard_element_list"));
        assert_eq!(result.method_count(), 1);
        // no type criteria, no type search
        assert!(result.types.is_empty());
    }

    #[test]
    fn test_argument_search() {
        let model = model();
        let criteria = criteria_from_names(["argument", "description"]).unwrap();
        let result = model.search("requested", &criteria);
        assert_eq!(result.method_count(), 1);
        assert!(result.tags["Element"].contains_key("dashboard_element_list"));
    }

    #[test]
    fn test_method_description_needs_method_criterion() {
        let model = model();
        let criteria = criteria_from_names(["name", "description"]).unwrap();
        assert_eq!(model.search("layout", &criteria).method_count(), 0);

        let criteria = criteria_from_names(["method", "description"]).unwrap();
        let result = model.search("layout", &criteria);
        assert_eq!(result.method_count(), 1);
        assert!(result.tags["Dashboard"].contains_key("dashboard"));
    }

    #[test]
    fn test_response_search() {
        let model = model();
        let criteria = criteria_from_names(["response"]).unwrap();
        let result = model.search(r"\bbinary\b", &criteria);
        assert_eq!(result.method_count(), 1);
        assert!(result.tags["Element"].contains_key("dashboard_element_list"));

        let result = model.search("404", &criteria);
        assert!(result.tags["Dashboard"].contains_key("dashboard"));
    }

    #[test]
    fn test_status_search_finds_methods_and_types() {
        let model = model();
        let criteria = criteria_from_names(["status"]).unwrap();
        let result = model.search("beta", &criteria);
        assert!(result.types.contains_key("DashboardElement"));
        assert!(result.tags["Element"].contains_key("dashboard_element_list"));
    }

    #[test]
    fn test_property_search_through_recursive_types() {
        let model = model();
        let criteria = criteria_from_names(["type", "property", "description"]).unwrap();
        let result = model.search("who owns", &criteria);
        let names: Vec<&String> = result.types.keys().collect();
        // Dashboard reaches the description through its folder property
        assert_eq!(names, vec!["Dashboard", "Folder"]);
    }

    #[test]
    fn test_title_search() {
        let model = model();
        let criteria = criteria_from_names(["title"]).unwrap();
        // title alone does not open type search text without type or status
        assert!(model.search("board", &criteria).types.is_empty());
        let criteria = criteria_from_names(["type", "title"]).unwrap();
        let result = model.search("^board", &criteria);
        assert_eq!(result.types.keys().collect::<Vec<_>>(), vec!["Dashboard"]);
    }

    #[test]
    fn test_criteria_names() {
        let criteria = criteria_from_names(["activityType", "METHOD"]).unwrap();
        assert_eq!(criteria_to_names(&criteria), vec!["method", "activityType"]);
        assert!(criteria_from_names(["bogus"]).is_err());
        assert_eq!(search_all().len(), 10);
        for c in SearchCriterion::all() {
            assert_eq!(c.as_str().parse::<SearchCriterion>(), Ok(c));
        }
    }
}
