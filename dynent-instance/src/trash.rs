//! Soft delete, revert and purge.
//!
//! Revert is a two-step saga: the snapshot is written back to live storage
//! first and the trash entry removed second. A failure between the steps
//! leaves the entry in place, so a retried revert may create a duplicate.

use crate::config::DeletionMode;
use crate::error::{InstanceError, InstanceResult};
use crate::mapper::RecordMapper;
use chrono::{DateTime, Utc};
use dynent_model::{EntityRecord, FieldRecord, Slot, TrashEntry, TypeDescriptor, TypedInstance, Value};
use dynent_storage::{ServiceLocator, StorageService, TrashService};
use dynent_types::{QueryParams, Records, TrashId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A trash entry rendered for callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashRecord {
    pub trash_id: TrashId,
    pub deleted_at: DateTime<Utc>,
    /// The snapshot as a record; `record.id` is the original instance id.
    pub record: EntityRecord,
}

pub struct TrashManager<'a> {
    locator: &'a dyn ServiceLocator,
    trash: &'a dyn TrashService,
    mapper: &'a RecordMapper<'a>,
}

impl<'a> TrashManager<'a> {
    pub fn new(locator: &'a dyn ServiceLocator, trash: &'a dyn TrashService, mapper: &'a RecordMapper<'a>) -> Self {
        Self {
            locator,
            trash,
            mapper,
        }
    }

    /// Removes `instance` from live storage, snapshotting it into the trash
    /// first when `mode` is [`DeletionMode::Trash`].
    pub fn delete(&self, entity: &TypeDescriptor, instance: TypedInstance, mode: DeletionMode) -> InstanceResult<()> {
        let id = instance
            .id()
            .ok_or_else(|| InstanceError::ObjectNotFound {
                entity: entity.name.clone(),
                id: "<unsaved>".into(),
            })?;
        let service = self.service(&entity.type_name)?;

        let trash_id = match mode {
            DeletionMode::Trash => {
                let trash_id = self.trash.move_to_trash(TrashEntry::new(entity.id, instance))?;
                info!(entity = %entity.name, instance_id = %id, trash_id = %trash_id, "Moved instance to trash");
                Some(trash_id)
            }
            DeletionMode::Delete => None,
        };
        if let Err(err) = service.delete(id) {
            // The instance is still live, so its trash entry must go.
            if let Some(trash_id) = trash_id
                && let Err(rollback) = self.trash.remove_from_trash(trash_id)
            {
                warn!(
                    entity = %entity.name,
                    trash_id = %trash_id,
                    error = %rollback,
                    "Failed to roll back trash entry"
                );
            }
            return Err(err.into());
        }
        info!(entity = %entity.name, instance_id = %id, mode = ?mode, "Deleted instance");
        Ok(())
    }

    /// Restores a trashed snapshot under its original id and drops the
    /// trash entry.
    pub fn revert(&self, entity: &TypeDescriptor, trash_id: TrashId) -> InstanceResult<EntityRecord> {
        let entry = self.find_entry(entity, trash_id)?;
        let record = snapshot_record(entity, &entry.snapshot);

        let mut instance = self.mapper.to_instance(entity, &record, None)?;
        instance.set_id(entry.instance_id);

        let service = self.service(&entity.type_name)?;
        let restored = service.create(instance)?;
        self.trash.remove_from_trash(trash_id)?;

        info!(
            entity = %entity.name,
            trash_id = %trash_id,
            instance_id = ?restored.id(),
            "Reverted instance from trash"
        );
        Ok(self.mapper.to_record(entity, &restored))
    }

    /// One page of the entity's trash, newest first unless ordered.
    pub fn list(&self, entity: &TypeDescriptor, params: &QueryParams) -> InstanceResult<Records<TrashRecord>> {
        let total = self.trash.count_instances_in_trash(entity.id)?;
        let rows = self.trash.get_instances_from_trash(entity.id, params)?;
        Ok(Records {
            page: params.page_number(),
            total: params.page_count(total as usize),
            records: total,
            rows: rows.iter().map(|entry| self.render(entity, entry)).collect(),
        })
    }

    pub fn count(&self, entity: &TypeDescriptor) -> InstanceResult<u64> {
        Ok(self.trash.count_instances_in_trash(entity.id)?)
    }

    pub fn find(&self, entity: &TypeDescriptor, trash_id: TrashId) -> InstanceResult<TrashRecord> {
        let entry = self.find_entry(entity, trash_id)?;
        Ok(self.render(entity, &entry))
    }

    /// Permanently removes one trash entry.
    pub fn purge(&self, entity: &TypeDescriptor, trash_id: TrashId) -> InstanceResult<()> {
        self.find_entry(entity, trash_id)?;
        self.trash.remove_from_trash(trash_id)?;
        info!(entity = %entity.name, trash_id = %trash_id, "Purged trash entry");
        Ok(())
    }

    fn find_entry(&self, entity: &TypeDescriptor, trash_id: TrashId) -> InstanceResult<TrashEntry> {
        self.trash
            .find_trash_instance_by_id(trash_id, entity.id)?
            .ok_or_else(|| InstanceError::trash_not_found(&entity.name, trash_id))
    }

    fn render(&self, entity: &TypeDescriptor, entry: &TrashEntry) -> TrashRecord {
        TrashRecord {
            trash_id: entry.id,
            deleted_at: entry.deleted_at,
            record: self.mapper.to_record(entity, &entry.snapshot),
        }
    }

    fn service(&self, type_name: &str) -> InstanceResult<Arc<dyn StorageService>> {
        self.locator
            .service(type_name)
            .map_err(|e| InstanceError::from_service_lookup(type_name, e))
    }
}

/// A record whose relationship values are the snapshot's related objects
/// themselves, so revert does not depend on them still being stored.
fn snapshot_record(entity: &TypeDescriptor, snapshot: &TypedInstance) -> EntityRecord {
    let fields = entity
        .fields
        .iter()
        .filter_map(|field| {
            let value = match snapshot.slot(&field.name)? {
                Slot::Scalar(value) => value.clone(),
                Slot::One(related) => related.clone().map(Value::Instance).unwrap_or_default(),
                Slot::Many(related) => Value::List(related.iter().cloned().map(Value::Instance).collect()),
            };
            Some(FieldRecord::from_descriptor(field, value))
        })
        .collect();
    EntityRecord {
        id: snapshot.id(),
        entity_id: entity.id,
        fields,
    }
}
