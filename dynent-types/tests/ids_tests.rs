use dynent_types::{EntityId, InstanceId, TrashId};
use std::collections::HashSet;
use std::str::FromStr;

// ── EntityId ──────────────────────────────────────────────────────

#[test]
fn entity_id_wraps_number() {
    let id = EntityId::new(11);
    assert_eq!(id.get(), 11);
    assert_eq!(EntityId::from(11), id);
}

#[test]
fn entity_id_display_and_parse() {
    let id = EntityId::new(42);
    assert_eq!(id.to_string(), "42");
    assert_eq!(EntityId::from_str("42").unwrap(), id);
    assert_eq!(EntityId::from_str(" 42 ").unwrap(), id);
}

#[test]
fn entity_id_parse_invalid() {
    assert!(EntityId::from_str("eleven").is_err());
    assert!(EntityId::from_str("-1").is_err());
}

// ── InstanceId ────────────────────────────────────────────────────

#[test]
fn instance_id_next_is_sequential() {
    let id = InstanceId::new(4);
    assert_eq!(id.next(), InstanceId::new(5));
}

#[test]
fn instance_id_next_saturates() {
    let id = InstanceId::new(u64::MAX);
    assert_eq!(id.next(), id);
}

#[test]
fn instance_id_ordering() {
    let mut ids = vec![InstanceId::new(3), InstanceId::new(1), InstanceId::new(2)];
    ids.sort();
    assert_eq!(ids, vec![InstanceId::new(1), InstanceId::new(2), InstanceId::new(3)]);
}

#[test]
fn instance_id_hash_and_eq() {
    let mut set = HashSet::new();
    set.insert(InstanceId::new(9));
    set.insert(InstanceId::new(9)); // duplicate
    assert_eq!(set.len(), 1);
}

// ── TrashId ───────────────────────────────────────────────────────

#[test]
fn trash_id_new_is_unique() {
    let a = TrashId::new();
    let b = TrashId::new();
    assert_ne!(a, b);
}

#[test]
fn trash_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = TrashId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn trash_id_display_and_parse() {
    let id = TrashId::new();
    let parsed = TrashId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn trash_id_parse_invalid() {
    assert!(TrashId::parse("not-a-uuid").is_err());
    assert!(TrashId::from_str("garbage").is_err());
}
