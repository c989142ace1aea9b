//! Application state shared by every handler.

use solocloud_core::{Config, StorageSettings};
use solocloud_db::{MediaCatalog, ShareLinkStore};
use solocloud_processing::IngestionPipeline;
use solocloud_services::ShareLinkManager;
use solocloud_storage::StorageRegistry;
use std::path::Path;
use std::sync::Arc;

/// Where storage settings come from.
#[derive(Debug, Clone)]
pub enum SettingsSource {
    /// Re-read the environment (and `.env`) for every operation, so provider changes
    /// apply without a restart.
    Env,
    /// A fixed snapshot, for tests and embedded use.
    Fixed(StorageSettings),
}

impl SettingsSource {
    pub fn snapshot(&self) -> StorageSettings {
        match self {
            SettingsSource::Env => StorageSettings::reload(),
            SettingsSource::Fixed(settings) => settings.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: StorageRegistry,
    pub catalog: Arc<dyn MediaCatalog>,
    pub pipeline: IngestionPipeline,
    pub shares: ShareLinkManager,
    pub settings: SettingsSource,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn MediaCatalog>,
        links: Arc<dyn ShareLinkStore>,
        settings: SettingsSource,
    ) -> Self {
        let registry = StorageRegistry::from_config(&config);
        let pipeline = IngestionPipeline::new(&config, registry.clone(), catalog.clone());
        let shares = ShareLinkManager::new(links, catalog.clone(), config.share_default_ttl_hours);

        Self {
            config: Arc::new(config),
            registry,
            catalog,
            pipeline,
            shares,
            settings,
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.config.upload_folder
    }

    /// Absolute share URL when `PUBLIC_BASE_URL` is set, otherwise a root-relative path.
    pub fn share_url(&self, token: &str) -> String {
        format!(
            "{}{}/{}",
            self.config.public_base_url.as_deref().unwrap_or(""),
            crate::constants::SHARED_BASE,
            token
        )
    }
}
