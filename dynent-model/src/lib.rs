//! Schema and instance model for the dynent engine.
//!
//! Defines the vocabulary every other dynent crate speaks:
//! - [`TypeDescriptor`] and [`FieldDescriptor`]: runtime entity metadata
//! - [`Value`]: generic field values and their coercion to declared kinds
//! - [`EntityRecord`]: the flat, type-erased form of an instance
//! - [`InstanceLayout`] / [`TypedInstance`]: schema-driven typed objects
//! - [`TrashEntry`]: soft-deleted snapshots
//! - [`SchemaProvider`]: where metadata comes from

mod error;
mod instance;
mod provider;
mod record;
mod schema;
mod trash;
mod value;

pub use error::CoercionError;
pub use instance::{InstanceLayout, LayoutBuilder, Member, MemberKind, Slot, TypedInstance, VersionLink};
pub use provider::{SchemaCatalog, SchemaProvider};
pub use record::{EntityRecord, FieldRecord};
pub use schema::{
    FieldDescriptor, FieldKind, LookupDefinition, Provenance, ScalarKind, SecurityMode, TypeDescriptor,
};
pub use trash::TrashEntry;
pub use value::{ID_KEY, Value};
