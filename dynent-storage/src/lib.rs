//! Storage seam for the dynent engine.
//!
//! Persistence itself lives behind traits:
//! - [`StorageService`]: create/read/update/delete and named queries for one type
//! - [`ServiceLocator`]: type name → service, and type name → instance layout
//! - [`TrashService`]: soft-deleted snapshots
//!
//! [`StorageRegistry`], [`MemoryStorageService`] and [`MemoryTrashStore`]
//! are in-process implementations used by embedders and tests.

mod error;
mod locator;
mod memory;
mod service;
mod trash;

pub use error::{StorageError, StorageResult};
pub use locator::{DYNAMIC_BUNDLE, ServiceLocator, StorageRegistry};
pub use memory::{MemoryStorageService, sort_instances};
pub use service::{LookupResult, StorageService};
pub use trash::{MemoryTrashStore, TrashService};
