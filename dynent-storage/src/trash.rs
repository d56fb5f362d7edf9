use crate::error::{StorageError, StorageResult};
use crate::memory::member_value;
use dynent_model::TrashEntry;
use dynent_types::{Direction, EntityId, QueryParams, TrashId};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

/// Store of soft-deleted snapshots, independent of live storage.
pub trait TrashService: Send + Sync {
    fn move_to_trash(&self, entry: TrashEntry) -> StorageResult<TrashId>;

    /// Entries of one entity, newest first unless `params` orders them.
    fn get_instances_from_trash(&self, entity_id: EntityId, params: &QueryParams) -> StorageResult<Vec<TrashEntry>>;

    fn count_instances_in_trash(&self, entity_id: EntityId) -> StorageResult<u64>;

    fn find_trash_instance_by_id(&self, id: TrashId, entity_id: EntityId) -> StorageResult<Option<TrashEntry>>;

    /// Fails with [`StorageError::TrashEntryNotFound`] when absent.
    fn remove_from_trash(&self, id: TrashId) -> StorageResult<()>;
}

/// Trash store backed by a map keyed by (time-ordered) trash id.
#[derive(Default)]
pub struct MemoryTrashStore {
    entries: RwLock<BTreeMap<TrashId, TrashEntry>>,
}

impl MemoryTrashStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> StorageError {
        StorageError::Poisoned("trash store".into())
    }
}

impl TrashService for MemoryTrashStore {
    fn move_to_trash(&self, entry: TrashEntry) -> StorageResult<TrashId> {
        let mut entries = self.entries.write().map_err(Self::poisoned)?;
        let id = entry.id;
        debug!(
            trash_id = %id,
            type_name = %entry.type_name,
            "Moved instance to trash"
        );
        entries.insert(id, entry);
        Ok(id)
    }

    fn get_instances_from_trash(&self, entity_id: EntityId, params: &QueryParams) -> StorageResult<Vec<TrashEntry>> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        let mut found: Vec<TrashEntry> = entries
            .values()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect();
        drop(entries);

        match &params.order {
            Some(order) => {
                let by_time = ["deletedat", "deleted_at"].contains(&order.field.to_ascii_lowercase().as_str());
                found.sort_by(|a, b| {
                    let ord = if by_time {
                        a.deleted_at.cmp(&b.deleted_at)
                    } else {
                        member_value(&a.snapshot, &order.field).sort_cmp(&member_value(&b.snapshot, &order.field))
                    };
                    match order.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                });
            }
            None => found.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(b.id.cmp(&a.id))),
        }
        Ok(params.apply_page(found))
    }

    fn count_instances_in_trash(&self, entity_id: EntityId) -> StorageResult<u64> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        Ok(entries.values().filter(|e| e.entity_id == entity_id).count() as u64)
    }

    fn find_trash_instance_by_id(&self, id: TrashId, entity_id: EntityId) -> StorageResult<Option<TrashEntry>> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        Ok(entries.get(&id).filter(|e| e.entity_id == entity_id).cloned())
    }

    fn remove_from_trash(&self, id: TrashId) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(Self::poisoned)?;
        if entries.remove(&id).is_none() {
            return Err(StorageError::TrashEntryNotFound(id));
        }
        debug!(trash_id = %id, "Removed trash entry");
        Ok(())
    }
}
