//! The instance service facade.
//!
//! Every operation takes the calling principal and the generic vocabulary
//! (entity ids, records, lookup names, query params) and is authorized
//! before it has any effect.

use crate::config::ServiceConfig;
use crate::error::{InstanceError, InstanceResult};
use crate::lookup::{LookupExecutor, LookupParams};
use crate::mapper::RecordMapper;
use crate::security::{Caller, Operation, SecurityGate};
use crate::trash::{TrashManager, TrashRecord};
use dynent_model::{EntityRecord, FieldKind, SchemaProvider, Slot, TypeDescriptor, TypedInstance};
use dynent_storage::{ServiceLocator, StorageService, TrashService, sort_instances};
use dynent_types::{EntityId, InstanceId, QueryParams, Records, TrashId};
use std::sync::Arc;
use tracing::{debug, info};

pub struct InstanceService {
    schema: Arc<dyn SchemaProvider>,
    locator: Arc<dyn ServiceLocator>,
    trash: Arc<dyn TrashService>,
    gate: SecurityGate,
    config: ServiceConfig,
}

impl InstanceService {
    pub fn new(
        schema: Arc<dyn SchemaProvider>,
        locator: Arc<dyn ServiceLocator>,
        trash: Arc<dyn TrashService>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            schema,
            locator,
            trash,
            gate: SecurityGate::new(),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ── Instances ────────────────────────────────────────────────

    /// A template record for a new instance: declared defaults, no id.
    pub fn new_instance(&self, caller: &Caller, entity_id: EntityId) -> InstanceResult<EntityRecord> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let mapper = self.mapper();
        let template = mapper.template(&entity)?;
        Ok(mapper.to_record(&entity, &template))
    }

    pub fn get_entity_instance(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        instance_id: InstanceId,
    ) -> InstanceResult<EntityRecord> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let instance = self.find(&entity, instance_id)?;
        Ok(self.mapper().to_record(&entity, &instance))
    }

    pub fn get_entity_records(&self, caller: &Caller, entity_id: EntityId) -> InstanceResult<Vec<EntityRecord>> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let mapper = self.mapper();
        let all = self.service(&entity.type_name)?.retrieve_all(None)?;
        Ok(all.iter().map(|instance| mapper.to_record(&entity, instance)).collect())
    }

    /// One ordered page of instances, with the page size clamped by config.
    pub fn get_entity_records_paged(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        params: &QueryParams,
    ) -> InstanceResult<Records<EntityRecord>> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let params = self.config.normalize(params);
        let service = self.service(&entity.type_name)?;
        let total = service.count()?;
        let rows = service.retrieve_all(Some(&params))?;

        let mapper = self.mapper();
        Ok(Records {
            page: params.page_number(),
            total: params.page_count(total as usize),
            records: total,
            rows: rows.iter().map(|instance| mapper.to_record(&entity, instance)).collect(),
        })
    }

    pub fn count_records(&self, caller: &Caller, entity_id: EntityId) -> InstanceResult<u64> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;
        Ok(self.service(&entity.type_name)?.count()?)
    }

    /// Creates the instance when `record.id` is absent, updates it otherwise.
    pub fn save_instance(&self, caller: &Caller, record: &EntityRecord) -> InstanceResult<EntityRecord> {
        let entity = self.entity(record.entity_id)?;
        self.check_editable(&entity)?;
        self.gate.authorize(&entity, caller, Operation::Write)?;

        let mapper = self.mapper();
        let service = self.service(&entity.type_name)?;
        let saved = match record.id {
            Some(id) => {
                let existing = self.find(&entity, id)?;
                let updated = mapper.to_instance(&entity, record, Some(existing))?;
                let saved = service.update(updated)?;
                info!(entity = %entity.name, instance_id = %id, "Updated instance");
                saved
            }
            None => {
                let created = mapper.to_instance(&entity, record, None)?;
                let saved = service.create(created)?;
                info!(entity = %entity.name, instance_id = ?saved.id(), "Created instance");
                saved
            }
        };
        Ok(mapper.to_record(&entity, &saved))
    }

    /// Deletes an instance, into the trash or permanently per config.
    pub fn delete_instance(&self, caller: &Caller, entity_id: EntityId, instance_id: InstanceId) -> InstanceResult<()> {
        let entity = self.entity(entity_id)?;
        self.check_editable(&entity)?;
        self.gate.authorize(&entity, caller, Operation::Write)?;

        let instance = self.find(&entity, instance_id)?;
        let mapper = self.mapper();
        self.trash_manager(&mapper)
            .delete(&entity, instance, self.config.deletion_mode)
    }

    // ── Lookups ──────────────────────────────────────────────────

    pub fn get_entity_records_from_lookup(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        lookup_name: &str,
        params: &LookupParams,
        query: &QueryParams,
    ) -> InstanceResult<Vec<EntityRecord>> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let query = self.config.normalize(query);
        let mapper = self.mapper();
        LookupExecutor::new(self.schema.as_ref(), self.locator.as_ref(), &mapper)
            .execute(&entity, lookup_name, params, &query)
    }

    pub fn count_records_by_lookup(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        lookup_name: &str,
        params: &LookupParams,
    ) -> InstanceResult<u64> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let mapper = self.mapper();
        LookupExecutor::new(self.schema.as_ref(), self.locator.as_ref(), &mapper).count(&entity, lookup_name, params)
    }

    // ── Relationships ────────────────────────────────────────────

    /// One ordered page of the instances a relationship field of
    /// `instance_id` points at, rendered with the target entity's schema.
    pub fn get_related_field_value(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        instance_id: InstanceId,
        field_name: &str,
        params: &QueryParams,
    ) -> InstanceResult<Records<EntityRecord>> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let not_a_relationship = || InstanceError::FieldNotFound {
            entity: entity.name.clone(),
            field: field_name.to_string(),
        };
        let field = entity.field(field_name).ok_or_else(not_a_relationship)?;
        let target = match &field.kind {
            FieldKind::OneToOne { target } | FieldKind::OneToMany { target } => target.as_str(),
            FieldKind::Scalar(_) => return Err(not_a_relationship()),
        };
        let target_entity = self
            .schema
            .get_entity_by_type_name(target)
            .ok_or_else(|| InstanceError::EntityNotFound(target.to_string()))?;
        self.gate.authorize(&target_entity, caller, Operation::Read)?;

        let instance = self.find(&entity, instance_id)?;
        let ids: Vec<InstanceId> = match instance.slot(&field.name) {
            Some(Slot::One(one)) => one.iter().filter_map(|r| r.id()).collect(),
            Some(Slot::Many(many)) => many.iter().filter_map(|r| r.id()).collect(),
            _ => Vec::new(),
        };

        // Targets are read live; ids whose instance is gone are dropped.
        let service = self.service(target)?;
        let mut related = Vec::with_capacity(ids.len());
        for id in ids {
            match service.find_by_id(id)? {
                Some(found) => related.push(found),
                None => debug!(
                    entity = %entity.name,
                    field = %field.name,
                    instance_id = %id,
                    "Related instance no longer exists"
                ),
            }
        }
        debug!(
            entity = %entity.name,
            field = %field.name,
            related = related.len(),
            "Loaded related instances"
        );

        let params = self.config.normalize(params);
        sort_instances(&mut related, params.order.as_ref());
        let mapper = self.mapper();
        Ok(Records::paginate(related, &params).map(|r| mapper.to_record(&target_entity, &r)))
    }

    // ── Trash ────────────────────────────────────────────────────

    pub fn revert_instance_from_trash(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        trash_id: TrashId,
    ) -> InstanceResult<EntityRecord> {
        let entity = self.entity(entity_id)?;
        self.check_editable(&entity)?;
        self.gate.authorize(&entity, caller, Operation::Write)?;

        let mapper = self.mapper();
        self.trash_manager(&mapper).revert(&entity, trash_id)
    }

    pub fn get_trash_records(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        params: &QueryParams,
    ) -> InstanceResult<Records<TrashRecord>> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let params = self.config.normalize(params);
        let mapper = self.mapper();
        self.trash_manager(&mapper).list(&entity, &params)
    }

    pub fn count_trash_records(&self, caller: &Caller, entity_id: EntityId) -> InstanceResult<u64> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let mapper = self.mapper();
        self.trash_manager(&mapper).count(&entity)
    }

    pub fn get_single_trash_record(
        &self,
        caller: &Caller,
        entity_id: EntityId,
        trash_id: TrashId,
    ) -> InstanceResult<TrashRecord> {
        let entity = self.entity(entity_id)?;
        self.gate.authorize(&entity, caller, Operation::Read)?;

        let mapper = self.mapper();
        self.trash_manager(&mapper).find(&entity, trash_id)
    }

    /// Permanently removes one trash entry.
    pub fn purge_trash_instance(&self, caller: &Caller, entity_id: EntityId, trash_id: TrashId) -> InstanceResult<()> {
        let entity = self.entity(entity_id)?;
        self.check_editable(&entity)?;
        self.gate.authorize(&entity, caller, Operation::Write)?;

        let mapper = self.mapper();
        self.trash_manager(&mapper).purge(&entity, trash_id)
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn entity(&self, entity_id: EntityId) -> InstanceResult<Arc<TypeDescriptor>> {
        self.schema
            .get_entity(entity_id)
            .ok_or_else(|| InstanceError::EntityNotFound(entity_id.to_string()))
    }

    fn check_editable(&self, entity: &TypeDescriptor) -> InstanceResult<()> {
        if entity.editable {
            Ok(())
        } else {
            Err(InstanceError::NonEditableEntity(entity.name.clone()))
        }
    }

    fn service(&self, type_name: &str) -> InstanceResult<Arc<dyn StorageService>> {
        self.locator
            .service(type_name)
            .map_err(|e| InstanceError::from_service_lookup(type_name, e))
    }

    fn find(&self, entity: &TypeDescriptor, id: InstanceId) -> InstanceResult<TypedInstance> {
        self.service(&entity.type_name)?
            .find_by_id(id)?
            .ok_or_else(|| InstanceError::object_not_found(&entity.name, id))
    }

    fn mapper(&self) -> RecordMapper<'_> {
        RecordMapper::new(self.locator.as_ref())
    }

    fn trash_manager<'a>(&'a self, mapper: &'a RecordMapper<'a>) -> TrashManager<'a> {
        TrashManager::new(self.locator.as_ref(), self.trash.as_ref(), mapper)
    }
}
