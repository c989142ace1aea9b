//! Provider construction and connection testing.
//!
//! The registry holds no credentials. Every call receives a configuration snapshot and
//! returns a freshly built [`Storage`] instance, so a change to the active provider or
//! its settings takes effect on the next operation.

#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::ObjectStoreStorage;
#[cfg(feature = "storage-webdav")]
use crate::WebDavStorage;
use crate::{ConnectionReport, Storage, StorageError, StorageResult};
use solocloud_core::{Config, ProviderConfig, StorageProvider, StorageSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StorageRegistry {
    upload_root: PathBuf,
    operation_timeout: Duration,
    connection_test_timeout: Duration,
}

impl StorageRegistry {
    pub fn new(
        upload_root: impl Into<PathBuf>,
        operation_timeout: Duration,
        connection_test_timeout: Duration,
    ) -> Self {
        Self {
            upload_root: upload_root.into(),
            operation_timeout,
            connection_test_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.upload_folder.clone(),
            config.storage_timeout,
            config.connection_test_timeout,
        )
    }

    /// Build a provider instance. Unconfigured providers still construct so that
    /// `is_configured` and `test_connection` can report on them.
    pub fn create(
        &self,
        provider: StorageProvider,
        config: ProviderConfig,
    ) -> StorageResult<Arc<dyn Storage>> {
        match provider {
            #[cfg(feature = "storage-local")]
            StorageProvider::Local => {
                let _ = config;
                Ok(Arc::new(LocalStorage::new(self.upload_root.clone())))
            }

            #[cfg(not(feature = "storage-local"))]
            StorageProvider::Local => Err(StorageError::DriverUnavailable(
                "Local storage backend not available (storage-local feature not enabled)"
                    .to_string(),
            )),

            #[cfg(feature = "storage-s3")]
            StorageProvider::AliyunOss | StorageProvider::TencentCos | StorageProvider::Qiniu => {
                Ok(Arc::new(ObjectStoreStorage::new(
                    provider,
                    config,
                    self.operation_timeout,
                )?))
            }

            #[cfg(not(feature = "storage-s3"))]
            StorageProvider::AliyunOss | StorageProvider::TencentCos | StorageProvider::Qiniu => {
                Err(StorageError::DriverUnavailable(format!(
                    "{} backend not available (storage-s3 feature not enabled)",
                    provider.display_name()
                )))
            }

            #[cfg(feature = "storage-webdav")]
            StorageProvider::Jianguoyun => Ok(Arc::new(WebDavStorage::new(
                config,
                self.operation_timeout,
            ))),

            #[cfg(not(feature = "storage-webdav"))]
            StorageProvider::Jianguoyun => Err(StorageError::DriverUnavailable(
                "WebDAV backend not available (storage-webdav feature not enabled)".to_string(),
            )),
        }
    }

    /// Like [`create`](Self::create) but from a raw identifier.
    pub fn create_by_id(
        &self,
        provider_id: &str,
        config: ProviderConfig,
    ) -> StorageResult<Arc<dyn Storage>> {
        let provider = provider_id
            .parse::<StorageProvider>()
            .map_err(|_| StorageError::UnknownProvider(provider_id.to_string()))?;
        self.create(provider, config)
    }

    /// The active provider from `settings`. Fails if it is unknown or not fully configured.
    pub fn active(&self, settings: &StorageSettings) -> StorageResult<Arc<dyn Storage>> {
        let provider = settings
            .active_id()
            .parse::<StorageProvider>()
            .map_err(|_| StorageError::UnknownProvider(settings.active_id().to_string()))?;
        let storage = self.for_provider(provider, settings)?;

        if !storage.is_configured() {
            return Err(StorageError::NotConfigured {
                provider,
                missing: settings.provider_config(provider).missing_fields(provider),
            });
        }

        Ok(storage)
    }

    /// The provider an existing object lives on, with its current credentials.
    pub fn for_provider(
        &self,
        provider: StorageProvider,
        settings: &StorageSettings,
    ) -> StorageResult<Arc<dyn Storage>> {
        self.create(provider, settings.provider_config(provider))
    }

    /// Run one bounded round trip against a candidate configuration.
    pub async fn test_connection(&self, provider_id: &str, config: ProviderConfig) -> ConnectionReport {
        let storage = match self.create_by_id(provider_id, config) {
            Ok(storage) => storage,
            Err(e) => return ConnectionReport::failure(e.to_string()),
        };

        let start = std::time::Instant::now();
        let result = match tokio::time::timeout(self.connection_test_timeout, storage.test_connection()).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.connection_test_timeout)),
        };

        match &result {
            Ok(detail) => tracing::info!(
                provider = %provider_id,
                detail = %detail,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Storage connection test succeeded"
            ),
            Err(e) => tracing::warn!(
                provider = %provider_id,
                error = %e,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Storage connection test failed"
            ),
        }

        ConnectionReport::from(result)
    }

    /// Providers that may be selected as active. Local is always included.
    pub fn list_configured_providers(&self, settings: &StorageSettings) -> Vec<StorageProvider> {
        StorageProvider::ALL
            .into_iter()
            .filter(|provider| {
                *provider == StorageProvider::Local
                    || self
                        .for_provider(*provider, settings)
                        .map(|storage| storage.is_configured())
                        .unwrap_or(false)
            })
            .collect()
    }
}
