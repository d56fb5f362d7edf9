use crate::error::StorageResult;
use dynent_model::{TypedInstance, Value};
use dynent_types::{InstanceId, QueryParams};

/// Outcome of a lookup method.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    /// A single-result method: zero or one instance.
    Single(Option<TypedInstance>),
    Many(Vec<TypedInstance>),
}

impl LookupResult {
    pub fn into_vec(self) -> Vec<TypedInstance> {
        match self {
            Self::Single(found) => found.into_iter().collect(),
            Self::Many(all) => all,
        }
    }
}

/// Persistence for the instances of one type.
///
/// Implementations own atomicity and concurrency control; the instance
/// engine issues at most one write per call.
pub trait StorageService: Send + Sync {
    /// Fully-qualified name of the type this service stores.
    fn type_name(&self) -> &str;

    /// Persists a new instance and returns it with its id assigned. An id
    /// already present on the instance is kept.
    fn create(&self, instance: TypedInstance) -> StorageResult<TypedInstance>;

    /// Replaces a persisted instance.
    fn update(&self, instance: TypedInstance) -> StorageResult<TypedInstance>;

    fn find_by_id(&self, id: InstanceId) -> StorageResult<Option<TypedInstance>>;

    /// All instances whose `key` member equals `value`.
    fn retrieve(&self, key: &str, value: &Value) -> StorageResult<Vec<TypedInstance>>;

    /// All instances, ordered and paged when `params` is given.
    fn retrieve_all(&self, params: Option<&QueryParams>) -> StorageResult<Vec<TypedInstance>>;

    fn count(&self) -> StorageResult<u64>;

    fn delete(&self, id: InstanceId) -> StorageResult<()>;

    /// Invokes a named query method with already-coerced parameters.
    fn lookup(&self, method: &str, params: &[Value], query: &QueryParams) -> StorageResult<LookupResult>;

    /// Invokes a named count method (`count` + capitalized lookup method).
    fn count_lookup(&self, method: &str, params: &[Value]) -> StorageResult<u64>;
}
