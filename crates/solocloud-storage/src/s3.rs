use crate::keys::validate_key;
use crate::traits::{with_timeout, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ClientOptions, ObjectStoreExt, PutPayload, Result as ObjectResult};
use solocloud_core::{ProviderConfig, StorageProvider};
use std::path::Path;
use std::time::Duration;

const DEFAULT_QINIU_REGION: &str = "cn-east-1";
const CONNECTION_PROBE_KEY: &str = ".solocloud-connection-probe";

/// Resolved S3 coordinates for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
struct S3Target {
    bucket: String,
    region: String,
    /// Virtual-hosted endpoint, bucket included.
    endpoint: String,
    access_key_id: String,
    secret_access_key: String,
}

/// Object storage over the S3-compatible APIs of Aliyun OSS, Tencent COS and Qiniu Kodo.
///
/// The `AmazonS3` client is built for each call from the credential snapshot this
/// instance was created with.
#[derive(Debug, Clone)]
pub struct ObjectStoreStorage {
    provider: StorageProvider,
    config: ProviderConfig,
    timeout: Duration,
}

fn strip_scheme(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}

impl ObjectStoreStorage {
    pub fn new(
        provider: StorageProvider,
        config: ProviderConfig,
        timeout: Duration,
    ) -> StorageResult<Self> {
        if !provider.is_object_store() {
            return Err(StorageError::UnknownProvider(format!(
                "{} is not an object-store provider",
                provider
            )));
        }
        Ok(Self {
            provider,
            config,
            timeout,
        })
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        let missing = self.config.missing_fields(self.provider);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::NotConfigured {
                provider: self.provider,
                missing,
            })
        }
    }

    /// Field lookup once `ensure_configured` has passed.
    fn field(&self, name: &str) -> StorageResult<String> {
        self.config
            .get(name)
            .map(str::to_string)
            .ok_or_else(|| StorageError::NotConfigured {
                provider: self.provider,
                missing: self
                    .provider
                    .required_fields()
                    .iter()
                    .copied()
                    .filter(|f| *f == name)
                    .collect(),
            })
    }

    fn target(&self) -> StorageResult<S3Target> {
        self.ensure_configured()?;
        let bucket = self.field("bucket_name")?;

        match self.provider {
            StorageProvider::AliyunOss => {
                // oss-cn-hangzhou.aliyuncs.com -> cn-hangzhou
                let host = strip_scheme(&self.field("endpoint")?).to_string();
                let region = host
                    .split('.')
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("oss-")
                    .to_string();
                Ok(S3Target {
                    endpoint: format!("https://{}.{}", bucket, host),
                    bucket,
                    region,
                    access_key_id: self.field("access_key_id")?,
                    secret_access_key: self.field("access_key_secret")?,
                })
            }
            StorageProvider::TencentCos => {
                let region = self.field("region")?;
                Ok(S3Target {
                    endpoint: format!("https://{}.cos.{}.myqcloud.com", bucket, region),
                    bucket,
                    region,
                    access_key_id: self.field("secret_id")?,
                    secret_access_key: self.field("secret_key")?,
                })
            }
            StorageProvider::Qiniu => {
                let region = self
                    .config
                    .get("region")
                    .unwrap_or(DEFAULT_QINIU_REGION)
                    .to_string();
                Ok(S3Target {
                    endpoint: format!("https://{}.s3.{}.qiniucs.com", bucket, region),
                    bucket,
                    region,
                    access_key_id: self.field("access_key")?,
                    secret_access_key: self.field("secret_key")?,
                })
            }
            other => Err(StorageError::UnknownProvider(other.to_string())),
        }
    }

    fn build_store(&self) -> StorageResult<(AmazonS3, S3Target)> {
        let target = self.target()?;

        let store = AmazonS3Builder::new()
            .with_bucket_name(target.bucket.clone())
            .with_region(target.region.clone())
            .with_endpoint(target.endpoint.clone())
            .with_virtual_hosted_style_request(true)
            .with_allow_http(target.endpoint.starts_with("http://"))
            .with_access_key_id(target.access_key_id.clone())
            .with_secret_access_key(target.secret_access_key.clone())
            .with_client_options(ClientOptions::new().with_timeout(self.timeout))
            .build()
            .map_err(|e| StorageError::DriverUnavailable(e.to_string()))?;

        Ok((store, target))
    }

    /// Public URL for `key` in this provider's addressing scheme.
    fn public_url(&self, key: &str) -> Option<String> {
        let bucket = self.config.get("bucket_name")?;
        match self.provider {
            StorageProvider::AliyunOss => {
                let host = strip_scheme(self.config.get("endpoint")?);
                Some(format!("https://{}.{}/{}", bucket, host, key))
            }
            StorageProvider::TencentCos => {
                let region = self.config.get("region")?;
                Some(format!(
                    "https://{}.cos.{}.myqcloud.com/{}",
                    bucket, region, key
                ))
            }
            StorageProvider::Qiniu => {
                let domain = self.config.get("domain")?;
                if domain.starts_with("http://") || domain.starts_with("https://") {
                    Some(format!("{}/{}", domain.trim_end_matches('/'), key))
                } else {
                    Some(format!("https://{}/{}", domain.trim_end_matches('/'), key))
                }
            }
            _ => None,
        }
    }
}

#[async_trait]
impl Storage for ObjectStoreStorage {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> StorageResult<String> {
        validate_key(remote_key)?;
        let (store, target) = self.build_store()?;

        let data = tokio::fs::read(local_path).await?;
        let size = data.len() as u64;
        let location = ObjectPath::from(remote_key.to_string());

        let start = std::time::Instant::now();

        let result: StorageResult<_> = with_timeout(self.timeout, async {
            let put: ObjectResult<_> = store
                .put(&location, PutPayload::from(Bytes::from(data)))
                .await;
            put.map_err(|e| StorageError::UploadFailed(e.to_string()))
        })
        .await;

        match result {
            Ok(put) => {
                tracing::info!(
                    provider = %self.provider,
                    bucket = %target.bucket,
                    key = %remote_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store upload successful"
                );
                Ok(match put.e_tag {
                    Some(etag) => format!("Uploaded {} (etag {})", remote_key, etag),
                    None => format!("Uploaded {}", remote_key),
                })
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    provider = %self.provider,
                    bucket = %target.bucket,
                    key = %remote_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store upload failed"
                );
                Err(e)
            }
        }
    }

    async fn delete(&self, remote_key: &str) -> StorageResult<String> {
        validate_key(remote_key)?;
        let (store, target) = self.build_store()?;
        let location = ObjectPath::from(remote_key.to_string());

        with_timeout(self.timeout, async {
            let result: ObjectResult<_> = store.delete(&location).await;
            match result {
                Ok(()) => {
                    tracing::info!(
                        provider = %self.provider,
                        bucket = %target.bucket,
                        key = %remote_key,
                        "Object store delete successful"
                    );
                    Ok(format!("Deleted {}", remote_key))
                }
                Err(ObjectStoreError::NotFound { .. }) => {
                    Ok(format!("{} already absent", remote_key))
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        provider = %self.provider,
                        key = %remote_key,
                        "Object store delete failed"
                    );
                    Err(StorageError::DeleteFailed(e.to_string()))
                }
            }
        })
        .await
    }

    fn resolve_url(&self, remote_key: &str) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        self.public_url(remote_key)
    }

    fn is_configured(&self) -> bool {
        self.config.is_complete_for(self.provider)
    }

    async fn test_connection(&self) -> StorageResult<String> {
        let (store, target) = self.build_store()?;
        let probe = ObjectPath::from(CONNECTION_PROBE_KEY);

        with_timeout(self.timeout, async {
            match store.head(&probe).await {
                Ok(_) | Err(ObjectStoreError::NotFound { .. }) => Ok(format!(
                    "Connected to bucket {} ({})",
                    target.bucket, target.region
                )),
                Err(e) => Err(StorageError::ConnectionRejected(e.to_string())),
            }
        })
        .await
    }

    fn provider(&self) -> StorageProvider {
        self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliyun() -> ProviderConfig {
        ProviderConfig::new()
            .with("access_key_id", "LTAI")
            .with("access_key_secret", "secret")
            .with("endpoint", "https://oss-cn-hangzhou.aliyuncs.com/")
            .with("bucket_name", "photos")
    }

    fn storage(provider: StorageProvider, config: ProviderConfig) -> ObjectStoreStorage {
        ObjectStoreStorage::new(provider, config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn rejects_non_object_store_providers() {
        assert!(ObjectStoreStorage::new(
            StorageProvider::Jianguoyun,
            ProviderConfig::new(),
            Duration::from_secs(1)
        )
        .is_err());
    }

    #[test]
    fn aliyun_region_comes_from_endpoint_host() {
        let target = storage(StorageProvider::AliyunOss, aliyun()).target().unwrap();
        assert_eq!(target.region, "cn-hangzhou");
        assert_eq!(target.endpoint, "https://photos.oss-cn-hangzhou.aliyuncs.com");
    }

    #[test]
    fn public_urls_follow_provider_conventions() {
        let oss = storage(StorageProvider::AliyunOss, aliyun());
        assert_eq!(
            oss.resolve_url("images/a.png").as_deref(),
            Some("https://photos.oss-cn-hangzhou.aliyuncs.com/images/a.png")
        );

        let cos = storage(
            StorageProvider::TencentCos,
            ProviderConfig::new()
                .with("secret_id", "id")
                .with("secret_key", "key")
                .with("region", "ap-shanghai")
                .with("bucket_name", "media-125"),
        );
        assert_eq!(
            cos.resolve_url("videos/v.mp4").as_deref(),
            Some("https://media-125.cos.ap-shanghai.myqcloud.com/videos/v.mp4")
        );

        let qiniu = storage(
            StorageProvider::Qiniu,
            ProviderConfig::new()
                .with("access_key", "ak")
                .with("secret_key", "sk")
                .with("bucket_name", "kodo")
                .with("domain", "cdn.example.com"),
        );
        assert_eq!(
            qiniu.resolve_url("files/r").as_deref(),
            Some("https://cdn.example.com/files/r")
        );
        assert_eq!(
            qiniu.target().unwrap().endpoint,
            "https://kodo.s3.cn-east-1.qiniucs.com"
        );
    }

    #[test]
    fn unconfigured_provider_has_no_url() {
        let oss = storage(
            StorageProvider::AliyunOss,
            ProviderConfig::new().with("bucket_name", "photos"),
        );
        assert!(!oss.is_configured());
        assert!(oss.resolve_url("images/a.png").is_none());
    }

    #[tokio::test]
    async fn test_connection_reports_incomplete_configuration_without_network() {
        let oss = storage(
            StorageProvider::TencentCos,
            ProviderConfig::new().with("secret_id", "id"),
        );
        let err = oss.test_connection().await.unwrap_err();
        match &err {
            StorageError::NotConfigured { missing, .. } => {
                assert!(missing.contains(&"bucket_name"));
                assert!(missing.contains(&"region"));
            }
            other => panic!("expected NotConfigured, got {other:?}"),
        }
        assert!(err.to_string().contains("Configuration incomplete"));
    }
}
