use dynent_model::{InstanceLayout, Provenance, ScalarKind, Slot, TrashEntry, TypedInstance, Value};
use dynent_storage::{
    LookupResult, MemoryStorageService, MemoryTrashStore, ServiceLocator, StorageError, StorageRegistry,
    StorageService, TrashService,
};
use dynent_types::{EntityId, InstanceId, Order, QueryParams};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const SAMPLE: &str = "org.dynent.Sample";

fn make_layout() -> Arc<InstanceLayout> {
    InstanceLayout::builder(SAMPLE)
        .scalar("strField", ScalarKind::String)
        .scalar("intField", ScalarKind::Integer)
        .one("owner", "org.dynent.Person")
        .build()
}

fn make_sample(layout: &Arc<InstanceLayout>, s: &str, n: i64) -> TypedInstance {
    let mut instance = layout.instantiate();
    instance.set_scalar("strField", s);
    instance.set_scalar("intField", n);
    instance
}

fn make_service() -> (Arc<InstanceLayout>, MemoryStorageService) {
    let layout = make_layout();
    let service = MemoryStorageService::new(SAMPLE);
    for (s, n) in [("b", 2), ("a", 1), ("c", 3)] {
        service.create(make_sample(&layout, s, n)).unwrap();
    }
    (layout, service)
}

fn ids(rows: &[TypedInstance]) -> Vec<u64> {
    rows.iter().filter_map(|r| r.id()).map(|id| id.get()).collect()
}

// ── Create / update / delete ─────────────────────────────────────

#[test]
fn create_assigns_sequential_ids() {
    let (_, service) = make_service();
    assert_eq!(service.count().unwrap(), 3);
    assert_eq!(ids(&service.retrieve_all(None).unwrap()), vec![1, 2, 3]);
}

#[test]
fn create_keeps_supplied_id() {
    let (layout, service) = make_service();
    let created = service
        .create(make_sample(&layout, "z", 9).with_id(InstanceId::new(40)))
        .unwrap();
    assert_eq!(created.id(), Some(InstanceId::new(40)));

    let next = service.create(make_sample(&layout, "y", 8)).unwrap();
    assert_eq!(next.id(), Some(InstanceId::new(41)));
}

#[test]
fn create_rejects_taken_id() {
    let (layout, service) = make_service();
    let err = service
        .create(make_sample(&layout, "dup", 0).with_id(InstanceId::new(1)))
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidData(_)));
}

#[test]
fn update_replaces_existing() {
    let (_, service) = make_service();
    let mut first = service.find_by_id(InstanceId::new(1)).unwrap().unwrap();
    first.set_scalar("strField", "changed");
    service.update(first).unwrap();

    let reloaded = service.find_by_id(InstanceId::new(1)).unwrap().unwrap();
    assert_eq!(reloaded.scalar("strField"), Some(&Value::string("changed")));
}

#[test]
fn update_missing_is_not_found() {
    let (layout, service) = make_service();
    let err = service
        .update(make_sample(&layout, "x", 0).with_id(InstanceId::new(99)))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));

    let err = service.update(make_sample(&layout, "x", 0)).unwrap_err();
    assert!(matches!(err, StorageError::InvalidData(_)));
}

#[test]
fn delete_removes_and_reports_missing() {
    let (_, service) = make_service();
    service.delete(InstanceId::new(2)).unwrap();
    assert!(service.find_by_id(InstanceId::new(2)).unwrap().is_none());
    assert_eq!(service.count().unwrap(), 2);
    assert!(matches!(
        service.delete(InstanceId::new(2)),
        Err(StorageError::NotFound { .. })
    ));
}

// ── Retrieval ────────────────────────────────────────────────────

#[test]
fn retrieve_all_orders_and_pages() {
    let (_, service) = make_service();
    let params = QueryParams::new(1, 2, Some(Order::desc("strField")));
    let page = service.retrieve_all(Some(&params)).unwrap();
    let names: Vec<_> = page.iter().filter_map(|r| r.scalar("strField").cloned()).collect();
    assert_eq!(names, vec![Value::string("c"), Value::string("b")]);
}

#[test]
fn retrieve_matches_member_value() {
    let (_, service) = make_service();
    let found = service.retrieve("intField", &Value::Integer(3)).unwrap();
    assert_eq!(ids(&found), vec![3]);
    assert!(service.retrieve("intField", &Value::Integer(7)).unwrap().is_empty());
}

#[test]
fn retrieve_matches_related_id() {
    let (layout, service) = make_service();
    let person = Arc::new(
        InstanceLayout::builder("org.dynent.Person")
            .build()
            .instantiate()
            .with_id(InstanceId::new(5)),
    );
    let mut owned = make_sample(&layout, "owned", 4);
    owned.set("owner", Slot::One(Some(person)));
    service.create(owned).unwrap();

    let found = service.retrieve("owner", &Value::Integer(5)).unwrap();
    assert_eq!(ids(&found), vec![4]);
}

// ── Lookups ──────────────────────────────────────────────────────

#[test]
fn single_lookup_returns_first_match() {
    let (_, service) = make_service();
    service.register_lookup("byName", &["strField"], true).unwrap();

    let result = service
        .lookup("byName", &[Value::string("a")], &QueryParams::unpaged())
        .unwrap();
    let LookupResult::Single(Some(found)) = result else {
        panic!("expected a single match");
    };
    assert_eq!(found.id(), Some(InstanceId::new(2)));

    let none = service
        .lookup("byName", &[Value::string("zzz")], &QueryParams::unpaged())
        .unwrap();
    assert_eq!(none, LookupResult::Single(None));
}

#[test]
fn multi_lookup_pages_and_counts() {
    let (layout, service) = make_service();
    service.create(make_sample(&layout, "d", 3)).unwrap();
    service.register_lookup("byNumber", &["intField"], false).unwrap();

    let params = QueryParams::new(1, 1, Some(Order::asc("strField")));
    let rows = service
        .lookup("byNumber", &[Value::Integer(3)], &params)
        .unwrap()
        .into_vec();
    assert_eq!(ids(&rows), vec![3]);

    assert_eq!(service.count_lookup("countByNumber", &[Value::Integer(3)]).unwrap(), 2);
}

#[test]
fn lookup_matches_null_parameters() {
    let (layout, service) = make_service();
    let mut blank = layout.instantiate();
    blank.set_scalar("intField", 0i64);
    service.create(blank).unwrap();
    service.register_lookup("unnamed", &["strField"], false).unwrap();

    let rows = service
        .lookup("unnamed", &[Value::Null], &QueryParams::unpaged())
        .unwrap()
        .into_vec();
    assert_eq!(ids(&rows), vec![4]);
}

#[test]
fn unknown_lookup_methods_fail() {
    let (_, service) = make_service();
    assert!(matches!(
        service.lookup("nope", &[], &QueryParams::unpaged()),
        Err(StorageError::LookupNotFound { .. })
    ));
    assert!(matches!(
        service.count_lookup("nope", &[]),
        Err(StorageError::LookupNotFound { .. })
    ));
}

#[test]
fn lookup_arity_is_checked() {
    let (_, service) = make_service();
    service.register_lookup("byName", &["strField"], false).unwrap();
    assert!(matches!(
        service.lookup("byName", &[], &QueryParams::unpaged()),
        Err(StorageError::InvalidData(_))
    ));
}

// ── Registry ─────────────────────────────────────────────────────

#[test]
fn registry_routes_layouts_by_provenance() {
    let registry = StorageRegistry::new();
    let declared = Provenance::Declared {
        bundle: "mds-entities".into(),
    };
    registry.register_memory(&declared, make_layout()).unwrap();

    assert!(registry.layout(SAMPLE, &declared).is_ok());
    let err = registry.layout(SAMPLE, &Provenance::Dynamic).unwrap_err();
    assert_eq!(err.to_string(), "type org.dynent.Sample not found in bundle dynamic-entities");
}

#[test]
fn registry_resolves_services() {
    let registry = StorageRegistry::new();
    let memory = registry.register_memory(&Provenance::Dynamic, make_layout()).unwrap();
    memory.create(make_layout().instantiate()).unwrap();

    let service = registry.service(SAMPLE).unwrap();
    assert_eq!(service.type_name(), SAMPLE);
    assert_eq!(service.count().unwrap(), 1);
    assert!(matches!(
        registry.service("org.dynent.Missing"),
        Err(StorageError::ServiceUnavailable(name)) if name == "org.dynent.Missing"
    ));
}

// ── Trash store ──────────────────────────────────────────────────

#[test]
fn trash_store_lists_per_entity_newest_first() {
    let layout = make_layout();
    let trash = MemoryTrashStore::new();
    let first = trash
        .move_to_trash(TrashEntry::new(EntityId::new(1), make_sample(&layout, "a", 1).with_id(InstanceId::new(1))))
        .unwrap();
    let second = trash
        .move_to_trash(TrashEntry::new(EntityId::new(1), make_sample(&layout, "b", 2).with_id(InstanceId::new(2))))
        .unwrap();
    trash
        .move_to_trash(TrashEntry::new(EntityId::new(2), make_sample(&layout, "c", 3)))
        .unwrap();

    let listed = trash
        .get_instances_from_trash(EntityId::new(1), &QueryParams::unpaged())
        .unwrap();
    let listed_ids: Vec<_> = listed.iter().map(|e| e.id).collect();
    assert_eq!(listed_ids, vec![second, first]);
    assert_eq!(trash.count_instances_in_trash(EntityId::new(1)).unwrap(), 2);
    assert_eq!(trash.count_instances_in_trash(EntityId::new(3)).unwrap(), 0);
}

#[test]
fn trash_store_orders_by_snapshot_member() {
    let layout = make_layout();
    let trash = MemoryTrashStore::new();
    for (s, n) in [("b", 2), ("a", 1), ("c", 3)] {
        trash
            .move_to_trash(TrashEntry::new(EntityId::new(1), make_sample(&layout, s, n)))
            .unwrap();
    }

    let params = QueryParams::new(1, 2, Some(Order::asc("strField")));
    let page = trash.get_instances_from_trash(EntityId::new(1), &params).unwrap();
    let names: Vec<_> = page.iter().filter_map(|e| e.snapshot.scalar("strField").cloned()).collect();
    assert_eq!(names, vec![Value::string("a"), Value::string("b")]);
}

#[test]
fn trash_store_find_is_scoped_to_entity() {
    let trash = MemoryTrashStore::new();
    let id = trash
        .move_to_trash(TrashEntry::new(EntityId::new(1), make_layout().instantiate()))
        .unwrap();

    assert!(trash.find_trash_instance_by_id(id, EntityId::new(1)).unwrap().is_some());
    assert!(trash.find_trash_instance_by_id(id, EntityId::new(2)).unwrap().is_none());
}

#[test]
fn trash_store_remove() {
    let trash = MemoryTrashStore::new();
    let id = trash
        .move_to_trash(TrashEntry::new(EntityId::new(1), make_layout().instantiate()))
        .unwrap();

    trash.remove_from_trash(id).unwrap();
    assert!(trash.find_trash_instance_by_id(id, EntityId::new(1)).unwrap().is_none());
    assert!(matches!(
        trash.remove_from_trash(id),
        Err(StorageError::TrashEntryNotFound(missing)) if missing == id
    ));
}
