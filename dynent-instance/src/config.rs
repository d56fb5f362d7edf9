//! Instance service configuration, read from `instance.toml`.

use dynent_types::QueryParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name the service looks for in its config directory.
pub const CONFIG_FILE: &str = "instance.toml";

/// What deleting an instance does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionMode {
    #[default]
    /// Snapshot into the trash store, then remove from live storage.
    Trash,
    /// Remove from live storage permanently.
    Delete,
}

/// Settings for [`InstanceService`](crate::InstanceService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub deletion_mode: DeletionMode,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    500
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            deletion_mode: DeletionMode::Trash,
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl ServiceConfig {
    /// Loads `instance.toml` from `dir`.
    pub fn load(dir: &Path) -> Self {
        Self::load_from(dir.join(CONFIG_FILE))
    }

    /// Loads config from an explicit path. A missing, unreadable or
    /// malformed file yields the defaults.
    pub fn load_from(config_path: PathBuf) -> Self {
        if !config_path.exists() {
            info!("No instance config found at {:?}, using defaults", config_path);
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(file) => {
                    info!("Loaded instance config from {:?}", config_path);
                    file.into_config()
                }
                Err(e) => {
                    warn!(
                        "Failed to parse instance config {:?}: {}. Falling back to defaults.",
                        config_path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read instance config {:?}: {}", config_path, e);
                Self::default()
            }
        }
    }

    /// Fills in and clamps the page size of `params`. Unpaged queries get
    /// the default page size only when a page number was requested.
    pub fn normalize(&self, params: &QueryParams) -> QueryParams {
        let max = self.max_page_size.max(1);
        let page_size = match (params.page, params.page_size) {
            (_, Some(size)) => Some(size.clamp(1, max)),
            (Some(_), None) => Some(self.default_page_size.clamp(1, max)),
            (None, None) => None,
        };
        QueryParams {
            page: params.page,
            page_size,
            order: params.order.clone(),
        }
    }
}

/// Raw TOML structure matching the instance.toml format.
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    instances: InstancesSection,
}

#[derive(Deserialize, Default)]
struct InstancesSection {
    #[serde(default)]
    deletion_mode: DeletionMode,
    #[serde(default)]
    paging: PagingSection,
}

#[derive(Deserialize)]
struct PagingSection {
    #[serde(default = "default_page_size")]
    default_size: u32,
    #[serde(default = "default_max_page_size")]
    max_size: u32,
}

impl Default for PagingSection {
    fn default() -> Self {
        Self {
            default_size: default_page_size(),
            max_size: default_max_page_size(),
        }
    }
}

impl ConfigFile {
    fn into_config(self) -> ServiceConfig {
        ServiceConfig {
            deletion_mode: self.instances.deletion_mode,
            default_page_size: self.instances.paging.default_size,
            max_page_size: self.instances.paging.max_size,
        }
    }
}
