//! Core type definitions for dynent.
//!
//! This crate defines the small, schema-agnostic vocabulary shared by every
//! other crate in the workspace:
//! - Entity, instance and trash identifiers
//! - Pagination and ordering parameters for listings and lookups
//! - The paged `Records` envelope returned by related-field listings
//!
//! Anything that depends on an entity's schema (field descriptors, generic
//! values, typed instances) belongs in `dynent-model`, not here.

mod ids;
mod query;

pub use ids::{EntityId, InstanceId, TrashId};
pub use query::{Direction, Order, QueryParams, Records};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid numeric id: {0}")]
    InvalidId(#[from] std::num::ParseIntError),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid order: {0}")]
    InvalidOrder(String),
}
