//! Relationship resolution: generic id references → related instances.
//!
//! Resolution is exactly one hop. A fetched instance is used as stored;
//! its own relationships are never followed.

use crate::error::{InstanceError, InstanceResult};
use dynent_model::{CoercionError, ScalarKind, TypeDescriptor, TypedInstance, Value};
use dynent_storage::{ServiceLocator, StorageService};
use dynent_types::InstanceId;
use std::sync::Arc;
use tracing::debug;

pub struct RelationshipResolver<'a> {
    locator: &'a dyn ServiceLocator,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(locator: &'a dyn ServiceLocator) -> Self {
        Self { locator }
    }

    /// Resolves a one-to-one value. `Null` clears the relationship.
    pub fn resolve_one(
        &self,
        entity: &TypeDescriptor,
        field: &str,
        target: &str,
        value: &Value,
    ) -> InstanceResult<Option<Arc<TypedInstance>>> {
        if value.is_null() {
            return Ok(None);
        }
        let service = self.service(target)?;
        self.resolve_with(service.as_ref(), entity, field, target, value)
            .map(Some)
    }

    /// Resolves a one-to-many value element by element, keeping order and
    /// duplicates. A single non-list value is treated as a one-element list.
    pub fn resolve_many(
        &self,
        entity: &TypeDescriptor,
        field: &str,
        target: &str,
        value: &Value,
    ) -> InstanceResult<Vec<Arc<TypedInstance>>> {
        let items = match value {
            Value::Null => return Ok(Vec::new()),
            Value::List(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let service = self.service(target)?;
        items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| self.resolve_with(service.as_ref(), entity, field, target, item))
            .collect()
    }

    fn service(&self, target: &str) -> InstanceResult<Arc<dyn StorageService>> {
        self.locator
            .service(target)
            .map_err(|e| InstanceError::from_service_lookup(target, e))
    }

    fn resolve_with(
        &self,
        service: &dyn StorageService,
        entity: &TypeDescriptor,
        field: &str,
        target: &str,
        value: &Value,
    ) -> InstanceResult<Arc<TypedInstance>> {
        let id = match value {
            Value::Instance(instance) if instance.type_name() == target => {
                return Ok(Arc::clone(instance));
            }
            // A historical snapshot stands in for its current version.
            Value::Instance(instance) if instance.history_of() == Some(target) => {
                instance.current_version_id()
            }
            other => other.as_instance_id(),
        };
        let id = id.ok_or_else(|| InstanceError::ValueCoercion {
            entity: entity.name.clone(),
            field: field.to_string(),
            source: CoercionError::new(ScalarKind::Long, value.kind_name(), "relationship id"),
        })?;
        self.fetch(service, entity, field, target, id)
    }

    fn fetch(
        &self,
        service: &dyn StorageService,
        entity: &TypeDescriptor,
        field: &str,
        target: &str,
        id: InstanceId,
    ) -> InstanceResult<Arc<TypedInstance>> {
        debug!(entity = %entity.name, field, target, instance_id = %id, "Resolving related instance");
        service
            .find_by_id(id)?
            .map(Arc::new)
            .ok_or_else(|| InstanceError::RelatedInstanceNotFound {
                entity: entity.name.clone(),
                field: field.to_string(),
                type_name: target.to_string(),
                id: id.to_string(),
            })
    }
}
