//! Generic instance service for runtime-defined entities.
//!
//! Turns flat field name/value records into typed instances (and back),
//! resolves one-to-one and one-to-many relationships by id against other
//! types' storage services, runs named lookups, and manages the trash
//! lifecycle, all behind a per-entity read/write security gate.
//!
//! [`InstanceService`] is the entry point; the components it composes are
//! public for embedders that need them individually.

mod config;
mod error;
mod lookup;
mod mapper;
mod resolver;
mod security;
mod service;
mod trash;

pub use config::{CONFIG_FILE, DeletionMode, ServiceConfig};
pub use error::{InstanceError, InstanceResult};
pub use lookup::{LookupExecutor, LookupParams};
pub use mapper::RecordMapper;
pub use resolver::RelationshipResolver;
pub use security::{Caller, Operation, SecurityGate};
pub use service::InstanceService;
pub use trash::{TrashManager, TrashRecord};
