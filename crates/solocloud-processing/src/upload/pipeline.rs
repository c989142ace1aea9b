use super::naming::{sanitize_filename, unique_storage_name};
use crate::classifier::{classify, resolve_mime};
use crate::thumbnail::{thumbnail_relative_path, Thumbnailer};
use chrono::Utc;
use solocloud_core::{AppError, Config, FileCategory, StorageProvider, StorageSettings, StoredObject};
use solocloud_db::MediaCatalog;
use solocloud_storage::{object_key, StorageRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt, BufWriter};
use uuid::Uuid;

/// One inbound upload.
pub struct UploadRequest<R> {
    pub filename: String,
    pub declared_mime: Option<String>,
    pub owner_id: Uuid,
    pub body: R,
}

/// Turns an inbound byte stream into a cataloged [`StoredObject`].
///
/// Single attempt, fail fast. Nothing is cataloged until the active provider has
/// confirmed the upload, so a cancelled or failed request never leaves a record behind.
#[derive(Clone)]
pub struct IngestionPipeline {
    upload_root: PathBuf,
    thumbnail_max_size: u32,
    registry: StorageRegistry,
    catalog: Arc<dyn MediaCatalog>,
    thumbnails: Thumbnailer,
}

impl IngestionPipeline {
    pub fn new(config: &Config, registry: StorageRegistry, catalog: Arc<dyn MediaCatalog>) -> Self {
        Self {
            upload_root: config.upload_folder.clone(),
            thumbnail_max_size: config.thumbnail_max_size,
            registry,
            catalog,
            thumbnails: Thumbnailer::from_config(config),
        }
    }

    pub fn with_thumbnailer(mut self, thumbnails: Thumbnailer) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    #[tracing::instrument(
        skip(self, settings, request),
        fields(filename = %request.filename, owner_id = %request.owner_id, provider = %settings.active_id())
    )]
    pub async fn ingest<R>(
        &self,
        settings: &StorageSettings,
        request: UploadRequest<R>,
    ) -> Result<StoredObject, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = std::time::Instant::now();
        let UploadRequest {
            filename,
            declared_mime,
            owner_id,
            mut body,
        } = request;

        let original_name = sanitize_filename(&filename)?;

        // Fail before touching disk if the active backend cannot take the upload.
        let storage = self.registry.active(settings)?;
        let provider = storage.provider();

        let unique_name = unique_storage_name(&original_name);
        let (category, subfolder) = classify(&original_name);
        let key = object_key(subfolder, &unique_name);

        let staged_path = self.upload_root.join(&key);
        let size_bytes = stage(&mut body, &staged_path).await?;

        tracing::info!(
            key = %key,
            category = %category,
            size_bytes,
            "Upload staged"
        );

        let thumbnail_path = self.thumbnail(category, &unique_name, &staged_path).await;

        if provider != StorageProvider::Local {
            let detail = storage.upload(&staged_path, &key).await?;
            tracing::info!(key = %key, provider = %provider, detail = %detail, "Upload sent to backend");
        }

        let object = StoredObject {
            id: Uuid::new_v4(),
            unique_name,
            original_name: original_name.clone(),
            category,
            mime_type: resolve_mime(declared_mime.as_deref(), &original_name),
            size_bytes: i64::try_from(size_bytes).unwrap_or(i64::MAX),
            provider,
            path: key,
            thumbnail_path,
            created_at: Utc::now(),
            owner_id,
        };

        let stored = self.catalog.insert(&object).await?;

        tracing::info!(
            object_id = %stored.id,
            key = %stored.path,
            provider = %stored.provider,
            size_bytes = stored.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload completed"
        );

        Ok(stored)
    }

    /// Returns the thumbnail path relative to the upload root, or `None` when the
    /// category has no thumbnail or generation failed.
    async fn thumbnail(
        &self,
        category: FileCategory,
        unique_name: &str,
        staged_path: &Path,
    ) -> Option<String> {
        let relative = thumbnail_relative_path(category, unique_name)?;
        let generator = self.thumbnails.for_category(category)?;
        let dest = self.upload_root.join(&relative);

        match generator
            .generate(staged_path, &dest, self.thumbnail_max_size)
            .await
        {
            Ok(()) => Some(relative),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    source = %staged_path.display(),
                    "Thumbnail generation failed; continuing without one"
                );
                None
            }
        }
    }

    /// Remove an object: backend copy, local cache, thumbnail, then the catalog record.
    ///
    /// A backend failure leaves the record in place so the delete can be retried.
    #[tracing::instrument(skip(self, settings, object), fields(object_id = %object.id, provider = %object.provider))]
    pub async fn delete(
        &self,
        settings: &StorageSettings,
        object: &StoredObject,
    ) -> Result<(), AppError> {
        let storage = self.registry.for_provider(object.provider, settings)?;
        let detail = storage.delete(&object.path).await?;
        tracing::debug!(key = %object.path, detail = %detail, "Backend object removed");

        if object.provider != StorageProvider::Local {
            remove_if_present(&object.local_path(&self.upload_root)).await?;
        }

        if let Some(thumbnail) = object.thumbnail_local_path(&self.upload_root) {
            remove_if_present(&thumbnail).await?;
        }

        if !self.catalog.delete(object.id).await? {
            tracing::warn!(object_id = %object.id, "Catalog record already gone");
        }

        tracing::info!(object_id = %object.id, key = %object.path, "Object deleted");
        Ok(())
    }
}

/// Write `body` to `dest`, returning the bytes written. A partial file is removed on failure.
async fn stage<R>(body: &mut R, dest: &Path) -> Result<u64, AppError>
where
    R: AsyncRead + Unpin + Send,
{
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let result = async {
        let file = tokio::fs::File::create(dest).await?;
        let mut writer = BufWriter::new(file);
        tokio::io::copy(body, &mut writer).await?;
        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        tokio::fs::metadata(dest).await.map(|m| m.len())
    }
    .await;

    match result {
        Ok(size) => Ok(size),
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(dest).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(error = %cleanup, path = %dest.display(), "Failed to remove partial upload");
                }
            }
            Err(AppError::Internal(format!("Failed to stage upload: {}", e)))
        }
    }
}

async fn remove_if_present(path: &Path) -> Result<(), AppError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
