use crate::schema::{FieldDescriptor, LookupDefinition, TypeDescriptor};
use dynent_types::EntityId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Source of entity metadata. Implemented by the schema editor's store;
/// [`SchemaCatalog`] is the in-memory implementation.
pub trait SchemaProvider: Send + Sync {
    fn get_entity(&self, id: EntityId) -> Option<Arc<TypeDescriptor>>;

    fn get_entity_by_type_name(&self, type_name: &str) -> Option<Arc<TypeDescriptor>>;

    fn get_entity_fields(&self, id: EntityId) -> Vec<FieldDescriptor> {
        self.get_entity(id)
            .map(|entity| entity.fields.clone())
            .unwrap_or_default()
    }

    fn get_lookup_by_name(&self, id: EntityId, name: &str) -> Option<LookupDefinition> {
        self.get_entity(id)?.lookup(name).cloned()
    }

    /// Parameter fields of the named lookup, in declared order. Unknown
    /// parameter names are dropped.
    fn get_lookup_fields_mapping(&self, id: EntityId, name: &str) -> Vec<FieldDescriptor> {
        let Some(entity) = self.get_entity(id) else {
            return Vec::new();
        };
        let Some(lookup) = entity.lookup(name) else {
            return Vec::new();
        };
        lookup
            .field_names
            .iter()
            .filter_map(|param| entity.field(param).cloned())
            .collect()
    }
}

/// In-memory schema store keyed by entity id.
#[derive(Default)]
pub struct SchemaCatalog {
    entities: RwLock<HashMap<EntityId, Arc<TypeDescriptor>>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) an entity descriptor.
    pub fn register(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        let mut entities = self
            .entities
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entities.insert(descriptor.id, Arc::clone(&descriptor));
        descriptor
    }

    pub fn len(&self) -> usize {
        self.entities
            .read()
            .map(|entities| entities.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemaProvider for SchemaCatalog {
    fn get_entity(&self, id: EntityId) -> Option<Arc<TypeDescriptor>> {
        self.entities.read().ok()?.get(&id).cloned()
    }

    fn get_entity_by_type_name(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.entities
            .read()
            .ok()?
            .values()
            .find(|entity| entity.type_name == type_name)
            .cloned()
    }
}
