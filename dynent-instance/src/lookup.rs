//! Named lookups: parameter coercion and dispatch to storage query methods.

use crate::error::{InstanceError, InstanceResult};
use crate::mapper::RecordMapper;
use dynent_model::{
    CoercionError, EntityRecord, FieldDescriptor, FieldKind, LookupDefinition, ScalarKind, SchemaProvider,
    TypeDescriptor, Value,
};
use dynent_storage::{ServiceLocator, StorageError, StorageService};
use dynent_types::QueryParams;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Lookup parameters keyed by field name.
pub type LookupParams = BTreeMap<String, Value>;

pub struct LookupExecutor<'a> {
    schema: &'a dyn SchemaProvider,
    locator: &'a dyn ServiceLocator,
    mapper: &'a RecordMapper<'a>,
}

impl<'a> LookupExecutor<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, locator: &'a dyn ServiceLocator, mapper: &'a RecordMapper<'a>) -> Self {
        Self {
            schema,
            locator,
            mapper,
        }
    }

    /// Runs the named lookup. Single-result lookups yield zero or one record.
    pub fn execute(
        &self,
        entity: &TypeDescriptor,
        lookup_name: &str,
        params: &LookupParams,
        query: &QueryParams,
    ) -> InstanceResult<Vec<EntityRecord>> {
        let (lookup, args) = self.prepare(entity, lookup_name, params)?;
        let service = self.service(entity)?;
        debug!(
            entity = %entity.name,
            lookup = %lookup.name,
            method = %lookup.method_name,
            "Executing lookup"
        );

        let found = service
            .lookup(&lookup.method_name, &args, query)
            .map_err(|e| storage_lookup_error(entity, &lookup, e))?;
        Ok(found
            .into_vec()
            .iter()
            .map(|instance| self.mapper.to_record(entity, instance))
            .collect())
    }

    /// Counts the rows the named lookup matches, ignoring pagination.
    pub fn count(&self, entity: &TypeDescriptor, lookup_name: &str, params: &LookupParams) -> InstanceResult<u64> {
        let (lookup, args) = self.prepare(entity, lookup_name, params)?;
        let service = self.service(entity)?;
        service
            .count_lookup(&lookup.count_method_name(), &args)
            .map_err(|e| storage_lookup_error(entity, &lookup, e))
    }

    fn service(&self, entity: &TypeDescriptor) -> InstanceResult<Arc<dyn StorageService>> {
        self.locator
            .service(&entity.type_name)
            .map_err(|e| InstanceError::from_service_lookup(&entity.type_name, e))
    }

    /// Resolves the lookup and coerces its parameters in declared order.
    fn prepare(
        &self,
        entity: &TypeDescriptor,
        lookup_name: &str,
        params: &LookupParams,
    ) -> InstanceResult<(LookupDefinition, Vec<Value>)> {
        let lookup = self
            .schema
            .get_lookup_by_name(entity.id, lookup_name)
            .ok_or_else(|| InstanceError::LookupNotFound {
                entity: entity.name.clone(),
                lookup: lookup_name.to_string(),
            })?;

        let fields = self.schema.get_lookup_fields_mapping(entity.id, lookup_name);
        if let Some(unknown) = lookup
            .field_names
            .iter()
            .find(|name| !fields.iter().any(|f| f.matches(name)))
        {
            return Err(InstanceError::FieldNotFound {
                entity: entity.name.clone(),
                field: unknown.clone(),
            });
        }

        let args = fields
            .iter()
            .map(|field| self.coerce_param(entity, &lookup, field, params))
            .collect::<InstanceResult<Vec<_>>>()?;
        Ok((lookup, args))
    }

    fn coerce_param(
        &self,
        entity: &TypeDescriptor,
        lookup: &LookupDefinition,
        field: &FieldDescriptor,
        params: &LookupParams,
    ) -> InstanceResult<Value> {
        let missing = || InstanceError::LookupParameterMissing {
            entity: entity.name.clone(),
            lookup: lookup.name.clone(),
            field: field.name.clone(),
        };

        let supplied = params
            .get(&field.name)
            .or_else(|| params.iter().find(|(k, _)| field.matches(k)).map(|(_, v)| v))
            .ok_or_else(missing)?;

        if supplied.is_null() {
            return if lookup.null_expected {
                Ok(Value::Null)
            } else {
                Err(missing())
            };
        }

        let coercion_error = |source: CoercionError| InstanceError::ValueCoercion {
            entity: entity.name.clone(),
            field: field.name.clone(),
            source,
        };
        match &field.kind {
            FieldKind::Scalar(kind) => supplied.coerce(*kind).map_err(coercion_error),
            // Relationship parameters match on the related id.
            FieldKind::OneToOne { .. } | FieldKind::OneToMany { .. } => supplied
                .as_instance_id()
                .map(Value::id)
                .ok_or_else(|| {
                    coercion_error(CoercionError::new(
                        ScalarKind::Long,
                        supplied.kind_name(),
                        "relationship id",
                    ))
                }),
        }
    }
}

fn storage_lookup_error(entity: &TypeDescriptor, lookup: &LookupDefinition, err: StorageError) -> InstanceError {
    match err {
        StorageError::LookupNotFound { .. } => InstanceError::LookupNotFound {
            entity: entity.name.clone(),
            lookup: lookup.name.clone(),
        },
        other => InstanceError::Storage(other),
    }
}
