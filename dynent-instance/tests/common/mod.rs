//! Shared fixture: a sample entity with scalar fields, relationships to a
//! declared entity, a history type and three lookups, all in memory.

#![allow(dead_code)]

use dynent_instance::{Caller, InstanceService, ServiceConfig};
use dynent_model::{
    EntityRecord, FieldDescriptor, FieldRecord, InstanceLayout, LookupDefinition, Provenance, ScalarKind,
    SchemaCatalog, SecurityMode, TypeDescriptor, TypedInstance, Value,
};
use dynent_storage::{MemoryStorageService, MemoryTrashStore, StorageRegistry, StorageService};
use dynent_types::{EntityId, InstanceId};
use std::sync::Arc;

pub const SAMPLE_ID: EntityId = EntityId::new(11);
pub const RELATED_ID: EntityId = EntityId::new(12);
pub const SAMPLE: &str = "org.dynent.Sample";
pub const RELATED: &str = "org.dynent.Related";
pub const RELATED_HISTORY: &str = "org.dynent.RelatedHistory";
pub const MDS_BUNDLE: &str = "mds-entities";

pub struct Fixture {
    pub service: InstanceService,
    pub catalog: Arc<SchemaCatalog>,
    pub registry: Arc<StorageRegistry>,
    pub samples: Arc<MemoryStorageService>,
    pub related: Arc<MemoryStorageService>,
    pub history: Arc<MemoryStorageService>,
    pub trash: Arc<MemoryTrashStore>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn sample_descriptor() -> TypeDescriptor {
    TypeDescriptor::new(SAMPLE_ID, "Sample", SAMPLE)
        .with_field(FieldDescriptor::string("strField").with_default("Default"))
        .with_field(FieldDescriptor::integer("intField").with_default(7))
        .with_field(FieldDescriptor::long("LongField"))
        .with_field(FieldDescriptor::datetime("dtField"))
        .with_field(FieldDescriptor::one_to_one("owner", RELATED))
        .with_field(FieldDescriptor::one_to_many("relatedFields", RELATED))
        .with_lookup(LookupDefinition::new("Single Object", "singleObject", &["strField"]).single())
        .with_lookup(LookupDefinition::new("MultiObject", "multiObject", &["intField"]))
        .with_lookup(LookupDefinition::new("nullParamExpected", "nullParamExpected", &["dtField"]).null_expected())
}

pub fn related_descriptor() -> TypeDescriptor {
    TypeDescriptor::new(RELATED_ID, "Related", RELATED)
        .with_field(FieldDescriptor::string("name"))
        .declared_in(MDS_BUNDLE)
}

/// Instance layout of the sample type. Its long member is spelled
/// `longField` while the schema says `LongField`.
pub fn sample_layout() -> Arc<InstanceLayout> {
    InstanceLayout::builder(SAMPLE)
        .scalar("strField", ScalarKind::String)
        .scalar("intField", ScalarKind::Integer)
        .scalar("longField", ScalarKind::Long)
        .scalar("dtField", ScalarKind::DateTime)
        .one("owner", RELATED)
        .many("relatedFields", RELATED)
        .build()
}

pub fn related_layout() -> Arc<InstanceLayout> {
    InstanceLayout::builder(RELATED).scalar("name", ScalarKind::String).build()
}

pub fn related_history_layout() -> Arc<InstanceLayout> {
    InstanceLayout::builder(RELATED_HISTORY)
        .scalar("name", ScalarKind::String)
        .history_of(RELATED, "currentVersion")
        .build()
}

pub fn fixture() -> Fixture {
    fixture_with(ServiceConfig::default())
}

pub fn fixture_with(config: ServiceConfig) -> Fixture {
    fixture_with_descriptor(sample_descriptor(), config)
}

pub fn fixture_with_descriptor(sample: TypeDescriptor, config: ServiceConfig) -> Fixture {
    init_tracing();

    let catalog = Arc::new(SchemaCatalog::new());
    catalog.register(sample);
    catalog.register(related_descriptor());

    let registry = Arc::new(StorageRegistry::new());
    let mds = Provenance::Declared {
        bundle: MDS_BUNDLE.into(),
    };
    let samples = registry.register_memory(&Provenance::Dynamic, sample_layout()).unwrap();
    let related = registry.register_memory(&mds, related_layout()).unwrap();
    let history = registry.register_memory(&mds, related_history_layout()).unwrap();

    samples.register_lookup("singleObject", &["strField"], true).unwrap();
    samples.register_lookup("multiObject", &["intField"], false).unwrap();
    samples.register_lookup("nullParamExpected", &["dtField"], false).unwrap();

    let trash = Arc::new(MemoryTrashStore::new());
    let service = InstanceService::new(catalog.clone(), registry.clone(), trash.clone(), config);

    Fixture {
        service,
        catalog,
        registry,
        samples,
        related,
        history,
        trash,
    }
}

pub fn caller() -> Caller {
    Caller::user("alice")
}

/// A sample record without id.
pub fn record(fields: &[(&str, Value)]) -> EntityRecord {
    EntityRecord::new(
        SAMPLE_ID,
        fields
            .iter()
            .map(|(name, value)| FieldRecord::new(name, value.clone()))
            .collect(),
    )
}

/// Stores one related instance per name and returns their ids.
pub fn seed_related(fixture: &Fixture, names: &[&str]) -> Vec<InstanceId> {
    names
        .iter()
        .map(|name| {
            let mut instance = related_layout().instantiate();
            instance.set_scalar("name", *name);
            fixture.related.create(instance).unwrap().id().unwrap()
        })
        .collect()
}

/// Stores a history snapshot pointing at `current`.
pub fn seed_history(fixture: &Fixture, current: InstanceId, name: &str) -> TypedInstance {
    let mut snapshot = related_history_layout().instantiate();
    snapshot.set_scalar("name", name);
    snapshot.set_scalar("currentVersion", current.get() as i64);
    fixture.history.create(snapshot).unwrap()
}

pub fn ref_ids(value: &Value) -> Vec<u64> {
    match value {
        Value::List(items) => items
            .iter()
            .filter_map(Value::as_instance_id)
            .map(|id| id.get())
            .collect(),
        other => other.as_instance_id().map(|id| vec![id.get()]).unwrap_or_default(),
    }
}

pub fn restricted(read_only: Option<SecurityMode>, write: Option<SecurityMode>) -> TypeDescriptor {
    let mut descriptor = sample_descriptor();
    descriptor.read_only_security_mode = read_only;
    descriptor.security_mode = write;
    descriptor
}
