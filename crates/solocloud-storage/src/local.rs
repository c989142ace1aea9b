use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use solocloud_core::StorageProvider;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage
///
/// Files are staged directly under the upload root, so there is nothing to copy on
/// upload. Share resolution streams these files itself; no URL is exposed.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        Ok(self.root.join(storage_key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> StorageResult<String> {
        let expected = self.key_to_path(remote_key)?;

        if !fs::try_exists(local_path).await.unwrap_or(false) {
            return Err(StorageError::UploadFailed(format!(
                "Staged file {} does not exist",
                local_path.display()
            )));
        }

        if local_path != expected {
            tracing::debug!(
                staged = %local_path.display(),
                expected = %expected.display(),
                "Local upload path differs from key location"
            );
        }

        Ok(format!("Stored locally at {}", local_path.display()))
    }

    async fn delete(&self, remote_key: &str) -> StorageResult<String> {
        let path = self.key_to_path(remote_key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %remote_key, path = %path.display(), "Local file deleted");
                Ok(format!("Deleted {}", remote_key))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %remote_key, "Local file already absent");
                Ok(format!("{} already absent", remote_key))
            }
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn resolve_url(&self, _remote_key: &str) -> Option<String> {
        None
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn test_connection(&self) -> StorageResult<String> {
        fs::create_dir_all(&self.root).await?;
        Ok(format!("Local storage ready at {}", self.root.display()))
    }

    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn upload_is_a_no_op_for_staged_files() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let staged = dir.path().join("files/abc");
        fs::create_dir_all(staged.parent().unwrap()).await.unwrap();
        fs::write(&staged, b"hello").await.unwrap();

        storage.upload(&staged, "files/abc").await.unwrap();
        assert_eq!(fs::read(&staged).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn upload_of_missing_staged_file_fails() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let result = storage.upload(&dir.path().join("files/nope"), "files/nope").await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let staged = dir.path().join("images/a.png");
        fs::create_dir_all(staged.parent().unwrap()).await.unwrap();
        fs::write(&staged, b"png").await.unwrap();

        storage.delete("images/a.png").await.unwrap();
        assert!(!staged.exists());
        storage.delete("images/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn delete_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(matches!(
            storage.delete("../outside").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn local_has_no_public_url() {
        let storage = LocalStorage::new("/tmp/unused");
        assert!(storage.resolve_url("images/a.png").is_none());
        assert!(storage.is_configured());
    }
}
