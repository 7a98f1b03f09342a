//! Type graph nodes.
//!
//! Types live in an arena owned by [`ApiModel`](super::ApiModel) and refer to
//! each other by [`TypeId`], so self-referential and mutually recursive
//! schemas never need owned cycles.

// Internal imports (std, crate)
use std::collections::BTreeSet;
use std::fmt;

// External imports (alphabetized)
use serde_json::Value as JsonValue;

/// Built-in scalar types every model starts with
pub const INTRINSIC_TYPES: &[&str] = &[
    "string", "integer", "int32", "int64", "boolean", "object", "uri", "float", "double",
    "number", "void", "datetime", "date", "email", "uuid", "hostname", "ipv4", "ipv6", "any",
    "password", "byte", "binary",
];

/// Index of a type in its model's arena.
///
/// Two references to the same schema always resolve to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The variant of a type node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Built-in scalar
    Intrinsic,
    /// Declared under `components.schemas`
    Component,
    /// JSON array of the element type
    Array(TypeId),
    /// Sequence sent on the wire as one delimited string (`a,b,c`)
    DelimArray(TypeId),
    /// String-keyed map to the element type
    Hash(TypeId),
    /// Synthesized aggregate of a method's parameters
    Request { operation_id: String },
    /// Synthesized writable subset of another type
    Write { source: TypeId },
}

/// One property of a type.
///
/// The property is owned by its declaring type; `ty` is a shared reference
/// into the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: TypeId,
    pub required: bool,
    pub nullable: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub description: String,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            nullable: false,
            read_only: false,
            write_only: false,
            deprecated: false,
            description: String::new(),
        }
    }

    /// Build a property from its schema fragment and resolved type
    pub(crate) fn from_schema(
        name: &str,
        ty: TypeId,
        schema: &JsonValue,
        required: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required,
            nullable: flag(schema, "nullable") || flag(schema, "x-nullable"),
            read_only: flag(schema, "readOnly"),
            write_only: flag(schema, "writeOnly"),
            deprecated: flag(schema, "deprecated") || flag(schema, "x-deprecated"),
            description: text(schema, "description"),
        }
    }
}

/// A node of the type graph
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub id: TypeId,
    pub name: String,
    pub kind: TypeKind,
    /// Properties in declaration order
    pub properties: Vec<Property>,
    /// Source fragment, metadata only
    pub schema: JsonValue,
    pub description: String,
    pub title: String,
    pub default: Option<JsonValue>,
    /// Value of the `x-status` extension, e.g. `beta`
    pub status: String,
    pub deprecated: bool,
    /// operationIds of the methods that use this type
    pub method_refs: BTreeSet<String>,
    /// Names of the non-intrinsic types this type refers to
    pub custom_types: BTreeSet<String>,
}

impl Type {
    pub(crate) fn new(id: TypeId, name: impl Into<String>, kind: TypeKind, schema: JsonValue) -> Self {
        let description = text(&schema, "description");
        let title = text(&schema, "title");
        let status = text(&schema, "x-status");
        let deprecated = flag(&schema, "deprecated") || flag(&schema, "x-deprecated");
        let default = schema.get("default").cloned();
        Self {
            id,
            name: name.into(),
            kind,
            properties: Vec::new(),
            schema,
            description,
            title,
            default,
            status,
            deprecated,
            method_refs: BTreeSet::new(),
            custom_types: BTreeSet::new(),
        }
    }

    pub fn is_intrinsic(&self) -> bool {
        self.kind == TypeKind::Intrinsic
    }

    /// Element type of an Array, DelimArray or Hash
    pub fn element_type(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Array(el) | TypeKind::DelimArray(el) | TypeKind::Hash(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self.kind, TypeKind::Request { .. })
    }

    pub fn is_write(&self) -> bool {
        matches!(self.kind, TypeKind::Write { .. })
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn required_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.required)
    }

    pub fn optional_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| !p.required)
    }

    /// True when a property refers directly back to this type
    pub fn is_recursive(&self) -> bool {
        self.properties.iter().any(|p| p.ty == self.id)
    }
}

pub(crate) fn flag(schema: &JsonValue, key: &str) -> bool {
    schema.get(key).and_then(JsonValue::as_bool).unwrap_or(false)
}

pub(crate) fn text(schema: &JsonValue, key: &str) -> String {
    schema
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}
