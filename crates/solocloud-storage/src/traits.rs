//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement,
//! and the single error shape their native SDK failures are normalized into.

use async_trait::async_trait;
use serde::Serialize;
use solocloud_core::{AppError, StorageProvider};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Required credential fields are missing or blank. Raised before any network call.
    #[error("Configuration incomplete for {provider}: missing {}", .missing.join(", "))]
    NotConfigured {
        provider: StorageProvider,
        missing: Vec<&'static str>,
    },

    /// The backend's client library is not compiled in or could not be initialised.
    #[error("Storage driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("Unknown storage provider: {0}")]
    UnknownProvider(String),

    /// The backend answered, but refused the credentials, bucket or request.
    #[error("Remote rejected the request: {0}")]
    ConnectionRejected(String),

    #[error("Storage operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotConfigured { .. } | StorageError::DriverUnavailable(_) => {
                AppError::Configuration(err.to_string())
            }
            StorageError::UnknownProvider(_) | StorageError::InvalidKey(_) => {
                AppError::Validation(err.to_string())
            }
            StorageError::UploadFailed(_)
            | StorageError::DeleteFailed(_)
            | StorageError::ConnectionRejected(_)
            | StorageError::Timeout(_) => AppError::Transport(err.to_string()),
            StorageError::IoError(e) => AppError::Internal(format!("Storage IO error: {}", e)),
        }
    }
}

/// Normalized outcome of a connection test: a flag plus human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub ok: bool,
    pub detail: String,
}

impl ConnectionReport {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }
}

impl From<StorageResult<String>> for ConnectionReport {
    fn from(result: StorageResult<String>) -> Self {
        match result {
            Ok(detail) => ConnectionReport::success(detail),
            Err(e) => ConnectionReport::failure(e.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Every backend exposes the same contract so the ingestion pipeline and share
/// resolution only look at provider identity to pick an instance. Instances are built
/// fresh from a configuration snapshot for each logical operation and hold no mutable
/// state.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Copy the file at `local_path` to the backend under `remote_key`.
    /// Returns a human-readable detail on success.
    async fn upload(&self, local_path: &Path, remote_key: &str) -> StorageResult<String>;

    /// Remove `remote_key`. Deleting an absent key succeeds.
    async fn delete(&self, remote_key: &str) -> StorageResult<String>;

    /// Directly fetchable URL, or `None` when the caller must stream the bytes itself.
    fn resolve_url(&self, remote_key: &str) -> Option<String>;

    /// Pure check of the credential set; no network access.
    fn is_configured(&self) -> bool;

    /// One lightweight authenticated round trip.
    async fn test_connection(&self) -> StorageResult<String>;

    fn provider(&self) -> StorageProvider;
}

/// Bound a backend call, mapping elapsed time to [`StorageError::Timeout`].
pub(crate) async fn with_timeout<T, F>(timeout: Duration, fut: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_maps_to_configuration_error() {
        let err = StorageError::NotConfigured {
            provider: StorageProvider::Qiniu,
            missing: vec!["domain"],
        };
        assert!(err.to_string().contains("Configuration incomplete"));
        assert!(matches!(AppError::from(err), AppError::Configuration(_)));
    }

    #[test]
    fn backend_rejections_map_to_transport_error() {
        let err = StorageError::UploadFailed("HTTP 403: AccessDenied".to_string());
        match AppError::from(err) {
            AppError::Transport(detail) => assert!(detail.contains("AccessDenied")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn with_timeout_reports_elapsed_budget() {
        let result: StorageResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StorageError::Timeout(_))));
    }
}
