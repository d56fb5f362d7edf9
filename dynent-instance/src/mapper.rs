//! Conversion between generic records and typed instances.

use crate::error::{InstanceError, InstanceResult};
use crate::resolver::RelationshipResolver;
use dynent_model::{
    EntityRecord, FieldDescriptor, FieldKind, FieldRecord, InstanceLayout, Slot, TypeDescriptor, TypedInstance, Value,
};
use dynent_storage::ServiceLocator;
use std::sync::Arc;
use tracing::debug;

/// Record field name that carries the instance id rather than a member.
const ID_FIELD: &str = "id";

pub struct RecordMapper<'a> {
    locator: &'a dyn ServiceLocator,
    resolver: RelationshipResolver<'a>,
}

impl<'a> RecordMapper<'a> {
    pub fn new(locator: &'a dyn ServiceLocator) -> Self {
        Self {
            locator,
            resolver: RelationshipResolver::new(locator),
        }
    }

    /// The instance layout for `entity`, looked up in the bundle its
    /// provenance names.
    pub fn layout(&self, entity: &TypeDescriptor) -> InstanceResult<Arc<InstanceLayout>> {
        self.locator
            .layout(&entity.type_name, &entity.provenance)
            .map_err(|source| InstanceError::TypeResolution {
                entity: entity.name.clone(),
                type_name: entity.type_name.clone(),
                source,
            })
    }

    /// A fresh instance with declared defaults applied. Nothing is persisted.
    pub fn template(&self, entity: &TypeDescriptor) -> InstanceResult<TypedInstance> {
        let mut instance = self.layout(entity)?.instantiate();
        for field in &entity.fields {
            if let Some(default) = &field.default {
                self.assign(entity, field, &mut instance, default)?;
            }
        }
        Ok(instance)
    }

    /// Populates `existing` (update) or a fresh instance (create) from
    /// `record`. Nothing is persisted.
    pub fn to_instance(
        &self,
        entity: &TypeDescriptor,
        record: &EntityRecord,
        existing: Option<TypedInstance>,
    ) -> InstanceResult<TypedInstance> {
        let updating = existing.is_some();
        self.check_field_names(entity, &record.fields, updating)?;

        let mut instance = match existing {
            Some(instance) => instance,
            None => self.template(entity)?,
        };

        for field in &entity.fields {
            let Some(value) = record.field(&field.name) else {
                continue;
            };
            if updating && (!field.editable || value.non_editable) {
                debug!(entity = %entity.name, field = %field.name, "Skipping non-editable field");
                continue;
            }
            self.assign(entity, field, &mut instance, &value.value)?;
        }
        Ok(instance)
    }

    /// Renders `instance` as a record, one field per descriptor in declared
    /// order. Relationships become `{id}` references.
    pub fn to_record(&self, entity: &TypeDescriptor, instance: &TypedInstance) -> EntityRecord {
        let fields = entity
            .fields
            .iter()
            .map(|field| FieldRecord::from_descriptor(field, read_member(entity, field, instance)))
            .collect();
        EntityRecord {
            id: instance.id(),
            entity_id: entity.id,
            fields,
        }
    }

    fn check_field_names(&self, entity: &TypeDescriptor, fields: &[FieldRecord], updating: bool) -> InstanceResult<()> {
        for record in fields {
            if entity.field(&record.name).is_some() || record.name.eq_ignore_ascii_case(ID_FIELD) {
                continue;
            }
            if updating && record.non_editable {
                continue;
            }
            return Err(InstanceError::FieldNotFound {
                entity: entity.name.clone(),
                field: record.name.clone(),
            });
        }
        Ok(())
    }

    fn assign(
        &self,
        entity: &TypeDescriptor,
        field: &FieldDescriptor,
        instance: &mut TypedInstance,
        value: &Value,
    ) -> InstanceResult<()> {
        let slot = match &field.kind {
            FieldKind::Scalar(kind) => {
                Slot::Scalar(value.coerce(*kind).map_err(|source| InstanceError::ValueCoercion {
                    entity: entity.name.clone(),
                    field: field.name.clone(),
                    source,
                })?)
            }
            FieldKind::OneToOne { target } => {
                Slot::One(self.resolver.resolve_one(entity, &field.name, target, value)?)
            }
            FieldKind::OneToMany { target } => {
                Slot::Many(self.resolver.resolve_many(entity, &field.name, target, value)?)
            }
        };
        if instance.set(&field.name, slot) {
            Ok(())
        } else {
            Err(InstanceError::FieldNotFound {
                entity: entity.name.clone(),
                field: field.name.clone(),
            })
        }
    }
}

fn read_member(entity: &TypeDescriptor, field: &FieldDescriptor, instance: &TypedInstance) -> Value {
    match instance.slot(&field.name) {
        Some(Slot::Scalar(value)) => value.clone(),
        Some(Slot::One(related)) => related
            .as_ref()
            .and_then(|r| r.id())
            .map(Value::reference)
            .unwrap_or_default(),
        Some(Slot::Many(related)) => Value::List(
            related
                .iter()
                .filter_map(|r| r.id())
                .map(Value::reference)
                .collect(),
        ),
        None => {
            debug!(entity = %entity.name, field = %field.name, "Instance has no member for field");
            Value::Null
        }
    }
}
