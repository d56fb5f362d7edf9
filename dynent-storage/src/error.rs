//! Error types for the storage layer.

use dynent_types::{InstanceId, TrashId};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No storage service is registered for the type.
    #[error("no storage service registered for {0}")]
    ServiceUnavailable(String),

    /// The type is not present in the bundle its provenance points to.
    #[error("type {type_name} not found in bundle {bundle}")]
    TypeNotFound { type_name: String, bundle: String },

    /// Instance not found.
    #[error("{type_name} instance {id} not found")]
    NotFound { type_name: String, id: InstanceId },

    /// Trash entry not found.
    #[error("trash entry {0} not found")]
    TrashEntryNotFound(TrashId),

    /// The service exposes no query method with this name.
    #[error("{type_name} has no lookup method {method}")]
    LookupNotFound { type_name: String, method: String },

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A backend lock was poisoned by a panicking writer.
    #[error("lock poisoned in {0}")]
    Poisoned(String),
}
