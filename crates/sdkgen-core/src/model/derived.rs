//! Request and Write type synthesis.
//!
//! Both kinds of derived type share one cache keyed by a structural hash of
//! their properties, so two synthesized shapes that agree on every property
//! name, type and flag are the same node.

// Internal imports (std, crate)
use super::{ApiModel, Property, TypeId, TypeKind};
use crate::utils::to_upper_camel_case;

// External imports (alphabetized)
use log::debug;
use serde_json::json;
use sha2::{Digest, Sha256};

impl ApiModel {
    /// Structural hash of a property list, in declaration order.
    ///
    /// Each property contributes `name:type:nullable:readOnly:required:writeOnly`.
    pub fn hash_properties(&self, properties: &[Property]) -> String {
        let canonical = properties
            .iter()
            .map(|p| {
                format!(
                    "{}:{}:{}:{}:{}:{}",
                    p.name,
                    self.ty(p.ty).name,
                    p.nullable,
                    p.read_only,
                    p.required,
                    p.write_only
                )
            })
            .collect::<Vec<_>>()
            .join(";");
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// The request type aggregating a method's parameters.
    ///
    /// `None` for unknown methods and for methods with fewer than two optional
    /// parameters. Parameter types with read-only members are replaced by their
    /// write type.
    pub fn request_type(&mut self, operation_id: &str) -> Option<TypeId> {
        let method = self.methods.get(operation_id).cloned()?;
        if !method.may_use_request_type() {
            return None;
        }

        let properties: Vec<Property> = method
            .all_params()
            .into_iter()
            .map(|p| p.as_property())
            .collect();
        let hash = self.hash_properties(&properties);
        if let Some(existing) = self.request_types.get(&hash) {
            return Some(*existing);
        }

        let base = format!("Request{}", to_upper_camel_case(operation_id));
        let schema = json!({
            "description": format!("Dynamically generated request type for {operation_id}")
        });
        let id = self.add_type(
            &base,
            TypeKind::Request {
                operation_id: operation_id.to_string(),
            },
            schema,
        );
        self.request_types.insert(hash, id);
        debug!("Synthesized {} for {operation_id}", self.ty(id).name);

        let properties = self.point_at_write_types(properties);
        let custom_types = self.custom_type_names(&properties);
        let ty = self.type_mut(id);
        ty.properties = properties;
        ty.custom_types = custom_types;
        ty.method_refs.insert(operation_id.to_string());
        Some(id)
    }

    /// The writable view of a type.
    ///
    /// `None` unless the type has both read-only and writable properties.
    /// Containers get a container of the element's write type.
    pub fn write_type(&mut self, id: TypeId) -> Option<TypeId> {
        let source = self.type_arc(id);
        match source.kind {
            TypeKind::Array(el) => {
                let element = self.write_type(el)?;
                return Some(self.container(TypeKind::Array(element)));
            }
            TypeKind::DelimArray(el) => {
                let element = self.write_type(el)?;
                return Some(self.container(TypeKind::DelimArray(element)));
            }
            TypeKind::Hash(el) => {
                let element = self.write_type(el)?;
                return Some(self.container(TypeKind::Hash(element)));
            }
            _ => {}
        }

        let writable: Vec<Property> = self
            .writeable_properties(id)
            .into_iter()
            .map(|p| {
                let mut w = p.clone();
                w.nullable = p.nullable || !self.ty(p.ty).is_intrinsic();
                w
            })
            .collect();
        if writable.is_empty() || writable.len() == source.properties.len() {
            return None;
        }

        let hash = self.hash_properties(&writable);
        if let Some(existing) = self.request_types.get(&hash) {
            return Some(*existing);
        }

        let removed: Vec<&str> = source
            .properties
            .iter()
            .filter(|p| !writable.iter().any(|w| w.name == p.name))
            .map(|p| p.name.as_str())
            .collect();
        let schema = json!({
            "description": format!(
                "Dynamically generated writeable type for {} removes properties:\n{}",
                source.name,
                removed.join(", ")
            )
        });
        let write_id = self.add_type(
            &format!("Write{}", source.name),
            TypeKind::Write { source: id },
            schema,
        );
        // cache before recursing so self-referencing types find this node
        self.request_types.insert(hash, write_id);
        debug!("Synthesized {} for {}", self.ty(write_id).name, source.name);

        let properties = self.point_at_write_types(writable);
        let mut custom_types = self.custom_type_names(&properties);
        custom_types.insert(source.name.clone());
        let write_name = self.ty(write_id).name.clone();
        let ty = self.type_mut(write_id);
        ty.properties = properties;
        ty.custom_types = custom_types;
        ty.method_refs = source.method_refs.clone();
        self.type_mut(id).custom_types.insert(write_name);
        Some(write_id)
    }

    /// Eagerly synthesize the derived types of every method.
    ///
    /// Generation passes create them lazily; this is for consumers that want
    /// the complete type list up front, such as search.
    pub fn load_dynamic_types(&mut self) {
        let methods: Vec<_> = self.methods.values().cloned().collect();
        for method in methods {
            self.request_type(&method.operation_id);
            for param in &method.params {
                self.write_type(param.ty);
            }
        }
    }

    fn point_at_write_types(&mut self, mut properties: Vec<Property>) -> Vec<Property> {
        for prop in properties.iter_mut() {
            if let Some(write) = self.write_type(prop.ty) {
                prop.ty = write;
            }
        }
        properties
    }

    fn custom_type_names(&self, properties: &[Property]) -> std::collections::BTreeSet<String> {
        properties
            .iter()
            .filter_map(|p| self.custom_type(p.ty))
            .map(|id| self.ty(id).name.clone())
            .collect()
    }
}
