//! In-memory reference backends.

use crate::error::{StorageError, StorageResult};
use crate::service::{LookupResult, StorageService};
use dynent_model::{Slot, TypedInstance, Value};
use dynent_types::{Direction, InstanceId, Order, QueryParams};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{self, AtomicU64};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// A query method answered by matching member values.
#[derive(Debug, Clone)]
struct MemoryLookup {
    fields: Vec<String>,
    single: bool,
}

/// Storage service backed by a map, keyed by sequentially assigned ids.
///
/// Ids are never reused: the counter only moves forward, also past any
/// explicit id a caller creates with.
pub struct MemoryStorageService {
    type_name: String,
    rows: RwLock<BTreeMap<InstanceId, TypedInstance>>,
    next_id: AtomicU64,
    lookups: RwLock<HashMap<String, MemoryLookup>>,
}

impl MemoryStorageService {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.into(),
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            lookups: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a query method that matches `fields` against its
    /// parameters, in order. Also answers `count` + capitalized `method`.
    pub fn register_lookup(&self, method: &str, fields: &[&str], single: bool) -> StorageResult<()> {
        let mut lookups = self
            .lookups
            .write()
            .map_err(|_| StorageError::Poisoned(self.type_name.clone()))?;
        lookups.insert(
            method.to_string(),
            MemoryLookup {
                fields: fields.iter().map(|f| f.to_string()).collect(),
                single,
            },
        );
        Ok(())
    }

    fn rows(&self) -> StorageResult<RwLockReadGuard<'_, BTreeMap<InstanceId, TypedInstance>>> {
        self.rows
            .read()
            .map_err(|_| StorageError::Poisoned(self.type_name.clone()))
    }

    fn rows_mut(&self) -> StorageResult<RwLockWriteGuard<'_, BTreeMap<InstanceId, TypedInstance>>> {
        self.rows
            .write()
            .map_err(|_| StorageError::Poisoned(self.type_name.clone()))
    }

    fn find_lookup(&self, method: &str) -> StorageResult<MemoryLookup> {
        let lookups = self
            .lookups
            .read()
            .map_err(|_| StorageError::Poisoned(self.type_name.clone()))?;
        lookups
            .get(method)
            .cloned()
            .ok_or_else(|| StorageError::LookupNotFound {
                type_name: self.type_name.clone(),
                method: method.to_string(),
            })
    }

    fn matching(&self, lookup: &MemoryLookup, params: &[Value]) -> StorageResult<Vec<TypedInstance>> {
        if params.len() != lookup.fields.len() {
            return Err(StorageError::InvalidData(format!(
                "lookup on {} expects {} parameters, got {}",
                self.type_name,
                lookup.fields.len(),
                params.len()
            )));
        }
        let rows = self.rows()?;
        Ok(rows
            .values()
            .filter(|row| {
                lookup
                    .fields
                    .iter()
                    .zip(params)
                    .all(|(field, param)| values_match(&member_value(row, field), param))
            })
            .cloned()
            .collect())
    }
}

impl StorageService for MemoryStorageService {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn create(&self, mut instance: TypedInstance) -> StorageResult<TypedInstance> {
        let mut rows = self.rows_mut()?;
        let id = match instance.id() {
            Some(id) if rows.contains_key(&id) => {
                return Err(StorageError::InvalidData(format!(
                    "{} instance {id} already exists",
                    self.type_name
                )));
            }
            Some(id) => {
                self.next_id
                    .fetch_max(id.get().saturating_add(1), atomic::Ordering::Relaxed);
                id
            }
            None => InstanceId::new(self.next_id.fetch_add(1, atomic::Ordering::Relaxed)),
        };
        instance.set_id(Some(id));
        rows.insert(id, instance.clone());
        debug!(type_name = %self.type_name, instance_id = %id, "Created instance");
        Ok(instance)
    }

    fn update(&self, instance: TypedInstance) -> StorageResult<TypedInstance> {
        let id = instance.id().ok_or_else(|| {
            StorageError::InvalidData(format!("cannot update unsaved {} instance", self.type_name))
        })?;
        let mut rows = self.rows_mut()?;
        let slot = rows.get_mut(&id).ok_or_else(|| StorageError::NotFound {
            type_name: self.type_name.clone(),
            id,
        })?;
        *slot = instance.clone();
        debug!(type_name = %self.type_name, instance_id = %id, "Updated instance");
        Ok(instance)
    }

    fn find_by_id(&self, id: InstanceId) -> StorageResult<Option<TypedInstance>> {
        Ok(self.rows()?.get(&id).cloned())
    }

    fn retrieve(&self, key: &str, value: &Value) -> StorageResult<Vec<TypedInstance>> {
        let rows = self.rows()?;
        Ok(rows
            .values()
            .filter(|row| values_match(&member_value(row, key), value))
            .cloned()
            .collect())
    }

    fn retrieve_all(&self, params: Option<&QueryParams>) -> StorageResult<Vec<TypedInstance>> {
        let all: Vec<TypedInstance> = self.rows()?.values().cloned().collect();
        Ok(match params {
            Some(params) => {
                let mut all = all;
                sort_instances(&mut all, params.order.as_ref());
                params.apply_page(all)
            }
            None => all,
        })
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(self.rows()?.len() as u64)
    }

    fn delete(&self, id: InstanceId) -> StorageResult<()> {
        let mut rows = self.rows_mut()?;
        rows.remove(&id).ok_or_else(|| StorageError::NotFound {
            type_name: self.type_name.clone(),
            id,
        })?;
        debug!(type_name = %self.type_name, instance_id = %id, "Deleted instance");
        Ok(())
    }

    fn lookup(&self, method: &str, params: &[Value], query: &QueryParams) -> StorageResult<LookupResult> {
        let lookup = self.find_lookup(method)?;
        let mut found = self.matching(&lookup, params)?;
        sort_instances(&mut found, query.order.as_ref());
        if lookup.single {
            return Ok(LookupResult::Single(found.into_iter().next()));
        }
        Ok(LookupResult::Many(query.apply_page(found)))
    }

    fn count_lookup(&self, method: &str, params: &[Value]) -> StorageResult<u64> {
        let lookup = match lookup_for_count(method) {
            Some(base) => self.find_lookup(&base)?,
            None => {
                return Err(StorageError::LookupNotFound {
                    type_name: self.type_name.clone(),
                    method: method.to_string(),
                });
            }
        };
        Ok(self.matching(&lookup, params)?.len() as u64)
    }
}

/// `countSingleObject` → `singleObject`.
fn lookup_for_count(method: &str) -> Option<String> {
    let rest = method.strip_prefix("count")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(format!("{}{}", first.to_lowercase(), chars.as_str()))
}

/// Comparable value of a member: scalars as stored, related objects by
/// id, `id` as the instance id.
pub(crate) fn member_value(instance: &TypedInstance, member: &str) -> Value {
    if member.eq_ignore_ascii_case("id") {
        return id_value(instance);
    }
    match instance.slot(member) {
        Some(Slot::Scalar(value)) => value.clone(),
        Some(Slot::One(Some(related))) => id_value(related),
        _ => Value::Null,
    }
}

fn id_value(instance: &TypedInstance) -> Value {
    instance.id().map(Value::id).unwrap_or_default()
}

fn values_match(stored: &Value, wanted: &Value) -> bool {
    stored.sort_cmp(wanted) == Ordering::Equal
}

/// Sorts by `order`, or by id when no order is given. Related members
/// compare by id.
pub fn sort_instances<T: Borrow<TypedInstance>>(rows: &mut [T], order: Option<&Order>) {
    match order {
        Some(order) => rows.sort_by(|a, b| {
            let ord = member_value(a.borrow(), &order.field).sort_cmp(&member_value(b.borrow(), &order.field));
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        }),
        None => rows.sort_by_key(|row| row.borrow().id()),
    }
}
