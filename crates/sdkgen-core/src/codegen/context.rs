//! Per-pass generation state.

// Internal imports (std, crate)
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::model::{ApiModel, Method, Type, TypeId};

// External imports (alphabetized)
use log::trace;

/// Which output file a walker is producing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Methods,
    Streams,
    Models,
}

/// How often each type was referenced during one pass.
///
/// Lives beside the model rather than on the types themselves, so separate
/// passes never see each other's counts.
#[derive(Debug, Clone, Default)]
pub struct RefCounts(HashMap<TypeId, usize>);

impl RefCounts {
    pub fn bump(&mut self, id: TypeId) {
        *self.0.entry(id).or_insert(0) += 1;
    }

    pub fn get(&self, id: TypeId) -> usize {
        self.0.get(&id).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Types referenced at least once
    pub fn referenced(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.0.iter().filter(|(_, n)| **n > 0).map(|(id, _)| *id)
    }
}

/// State for one generation pass: one API version rendered by one backend.
///
/// Backends see the model only through this context and the entity they are
/// asked to render.
#[derive(Debug)]
pub struct GenContext<'a> {
    model: &'a mut ApiModel,
    counts: RefCounts,
    file: FileKind,
    pub api_version: String,
    pub package_name: String,
}

impl<'a> GenContext<'a> {
    pub fn new(
        model: &'a mut ApiModel,
        api_version: impl Into<String>,
        package_name: impl Into<String>,
    ) -> Self {
        Self {
            model,
            counts: RefCounts::default(),
            file: FileKind::Methods,
            api_version: api_version.into(),
            package_name: package_name.into(),
        }
    }

    pub fn model(&self) -> &ApiModel {
        &*self.model
    }

    pub fn ty(&self, id: TypeId) -> Arc<Type> {
        self.model.type_arc(id)
    }

    pub fn method(&self, operation_id: &str) -> Option<Arc<Method>> {
        self.model.method(operation_id).cloned()
    }

    /// Methods sorted by operationId
    pub fn sorted_methods(&self) -> Vec<Arc<Method>> {
        self.model.methods().cloned().collect()
    }

    pub fn file(&self) -> FileKind {
        self.file
    }

    pub(crate) fn begin_file(&mut self, file: FileKind) {
        self.file = file;
        self.counts.clear();
    }

    /// Count one use of a type
    pub fn reference(&mut self, id: TypeId) {
        trace!("reference {}", self.model.ty(id).name);
        self.counts.bump(id);
    }

    pub fn ref_count(&self, id: TypeId) -> usize {
        self.counts.get(id)
    }

    pub fn counts(&self) -> &RefCounts {
        &self.counts
    }

    /// The method's request type, counting the use when there is one
    pub fn request_type(&mut self, operation_id: &str) -> Option<TypeId> {
        let id = self.model.request_type(operation_id)?;
        self.counts.bump(id);
        Some(id)
    }

    /// The type's write type, counting the use when there is one
    pub fn writeable_type(&mut self, id: TypeId) -> Option<TypeId> {
        let write = self.model.write_type(id)?;
        self.counts.bump(write);
        Some(write)
    }

    /// Sorted names of the non-intrinsic types used so far in this file.
    ///
    /// Containers contribute their innermost element, so this is the list a
    /// backend needs for its import statements.
    pub fn referenced_type_names(&self) -> Vec<String> {
        self.counts
            .referenced()
            .filter_map(|id| self.model.custom_type(id))
            .map(|id| self.model.ty(id).name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
