use crate::instance::TypedInstance;
use chrono::{DateTime, Utc};
use dynent_types::{EntityId, InstanceId, TrashId};

/// A soft-deleted instance awaiting revert or purge.
///
/// Relationship slots of `snapshot` hold the related objects as they were
/// at deletion time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrashEntry {
    pub id: TrashId,
    pub entity_id: EntityId,
    pub type_name: String,
    pub instance_id: Option<InstanceId>,
    pub deleted_at: DateTime<Utc>,
    pub snapshot: TypedInstance,
}

impl TrashEntry {
    /// Wraps `snapshot` in a fresh entry stamped with the current time.
    pub fn new(entity_id: EntityId, snapshot: TypedInstance) -> Self {
        Self {
            id: TrashId::new(),
            entity_id,
            type_name: snapshot.type_name().to_string(),
            instance_id: snapshot.id(),
            deleted_at: Utc::now(),
            snapshot,
        }
    }
}
