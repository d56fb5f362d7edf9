//! Error types for the instance service.

use crate::security::Operation;
use dynent_model::CoercionError;
use dynent_storage::StorageError;
use dynent_types::{InstanceId, TrashId};
use thiserror::Error;

/// Result type for instance service operations.
pub type InstanceResult<T> = Result<T, InstanceError>;

#[derive(Debug, Error)]
pub enum InstanceError {
    /// Unknown entity id, or no entity registered for a related type name.
    #[error("entity {0} not found")]
    EntityNotFound(String),

    #[error("cannot resolve type {type_name} for entity {entity}: {source}")]
    TypeResolution {
        entity: String,
        type_name: String,
        #[source]
        source: StorageError,
    },

    #[error("no storage service for {type_name}")]
    StorageServiceUnavailable { type_name: String },

    #[error("invalid value for {entity}.{field}: {source}")]
    ValueCoercion {
        entity: String,
        field: String,
        #[source]
        source: CoercionError,
    },

    #[error("entity {entity} has no field {field}")]
    FieldNotFound { entity: String, field: String },

    #[error("{type_name} instance {id} referenced by {entity}.{field} not found")]
    RelatedInstanceNotFound {
        entity: String,
        field: String,
        type_name: String,
        id: String,
    },

    #[error("entity {0} is not editable")]
    NonEditableEntity(String),

    #[error("{operation} access to {entity} denied")]
    Security { entity: String, operation: Operation },

    #[error("{entity} instance {id} not found")]
    ObjectNotFound { entity: String, id: String },

    #[error("entity {entity} has no lookup {lookup}")]
    LookupNotFound { entity: String, lookup: String },

    #[error("lookup {lookup} on {entity} is missing parameter {field}")]
    LookupParameterMissing {
        entity: String,
        lookup: String,
        field: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl InstanceError {
    pub(crate) fn object_not_found(entity: &str, id: InstanceId) -> Self {
        Self::ObjectNotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn trash_not_found(entity: &str, id: TrashId) -> Self {
        Self::ObjectNotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Maps a locator failure for `type_name` to its instance-level error.
    pub(crate) fn from_service_lookup(type_name: &str, err: StorageError) -> Self {
        match err {
            StorageError::ServiceUnavailable(_) => Self::StorageServiceUnavailable {
                type_name: type_name.to_string(),
            },
            other => Self::Storage(other),
        }
    }
}
