use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryStorageService;
use crate::service::StorageService;
use dynent_model::{InstanceLayout, Provenance};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Bundle name reported for types created through the design-time editor.
pub const DYNAMIC_BUNDLE: &str = "dynamic-entities";

/// Resolves per-type storage services and instance layouts.
pub trait ServiceLocator: Send + Sync {
    fn service(&self, type_name: &str) -> StorageResult<Arc<dyn StorageService>>;

    /// Layout of `type_name`, searched in the bundle `provenance` names.
    fn layout(&self, type_name: &str, provenance: &Provenance) -> StorageResult<Arc<InstanceLayout>>;
}

fn bundle_name(provenance: &Provenance) -> &str {
    match provenance {
        Provenance::Dynamic => DYNAMIC_BUNDLE,
        Provenance::Declared { bundle } => bundle,
    }
}

/// In-process registry of layouts (grouped by bundle) and services.
#[derive(Default)]
pub struct StorageRegistry {
    bundles: RwLock<HashMap<Provenance, HashMap<String, Arc<InstanceLayout>>>>,
    services: RwLock<HashMap<String, Arc<dyn StorageService>>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layout to the bundle `provenance` names.
    pub fn register_layout(&self, provenance: &Provenance, layout: Arc<InstanceLayout>) -> StorageResult<()> {
        let mut bundles = self
            .bundles
            .write()
            .map_err(|_| StorageError::Poisoned("storage registry".into()))?;
        debug!(
            type_name = %layout.type_name(),
            bundle = %bundle_name(provenance),
            "Registered instance layout"
        );
        bundles
            .entry(provenance.clone())
            .or_default()
            .insert(layout.type_name().to_string(), layout);
        Ok(())
    }

    /// Registers (or replaces) the service for its type.
    pub fn register_service(&self, service: Arc<dyn StorageService>) -> StorageResult<()> {
        let mut services = self
            .services
            .write()
            .map_err(|_| StorageError::Poisoned("storage registry".into()))?;
        services.insert(service.type_name().to_string(), service);
        Ok(())
    }

    /// Registers `layout` and a fresh in-memory service for it.
    pub fn register_memory(
        &self,
        provenance: &Provenance,
        layout: Arc<InstanceLayout>,
    ) -> StorageResult<Arc<MemoryStorageService>> {
        let service = Arc::new(MemoryStorageService::new(layout.type_name()));
        self.register_layout(provenance, layout)?;
        self.register_service(service.clone())?;
        Ok(service)
    }
}

impl ServiceLocator for StorageRegistry {
    fn service(&self, type_name: &str) -> StorageResult<Arc<dyn StorageService>> {
        let services = self
            .services
            .read()
            .map_err(|_| StorageError::Poisoned("storage registry".into()))?;
        services
            .get(type_name)
            .cloned()
            .ok_or_else(|| StorageError::ServiceUnavailable(type_name.to_string()))
    }

    fn layout(&self, type_name: &str, provenance: &Provenance) -> StorageResult<Arc<InstanceLayout>> {
        let bundles = self
            .bundles
            .read()
            .map_err(|_| StorageError::Poisoned("storage registry".into()))?;
        bundles
            .get(provenance)
            .and_then(|bundle| bundle.get(type_name))
            .cloned()
            .ok_or_else(|| StorageError::TypeNotFound {
                type_name: type_name.to_string(),
                bundle: bundle_name(provenance).to_string(),
            })
    }
}
