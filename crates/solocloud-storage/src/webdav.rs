use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use solocloud_core::{ProviderConfig, StorageProvider};
use std::path::Path;
use std::time::Duration;

/// WebDAV storage (Jianguoyun).
///
/// Uses HTTP basic auth on every request. Parent collections are created with `MKCOL`
/// before each `PUT` since most WebDAV servers refuse to create them implicitly.
#[derive(Debug, Clone)]
pub struct WebDavStorage {
    config: ProviderConfig,
    timeout: Duration,
}

fn dav_method(name: &'static str) -> StorageResult<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| StorageError::DriverUnavailable(format!("Invalid HTTP method {}: {}", name, e)))
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Status line for a failed response. The body is only logged, never returned.
async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if !body.is_empty() {
        tracing::warn!(
            status = %status,
            url = %url,
            body = %body.chars().take(200).collect::<String>(),
            "WebDAV server returned an error"
        );
    }
    format!("HTTP {}", status)
}

impl WebDavStorage {
    pub fn new(config: ProviderConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        let missing = self.config.missing_fields(StorageProvider::Jianguoyun);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::NotConfigured {
                provider: StorageProvider::Jianguoyun,
                missing,
            })
        }
    }

    fn base_url(&self) -> Option<&str> {
        self.config
            .get("webdav_url")
            .map(|url| url.trim_end_matches('/'))
    }

    fn url_for(&self, key: &str) -> Option<String> {
        self.base_url()
            .map(|base| format!("{}/{}", base, encode_key(key)))
    }

    fn client(&self) -> StorageResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| StorageError::DriverUnavailable(e.to_string()))
    }

    /// Authenticated request builder for `url`.
    fn request(&self, client: &Client, method: Method, url: &str) -> StorageResult<RequestBuilder> {
        self.ensure_configured()?;
        let username = self.config.get("username").unwrap_or_default();
        let password = self.config.get("password");
        Ok(client
            .request(method, url)
            .basic_auth(username, password))
    }

    fn transport_error(&self, e: reqwest::Error) -> StorageError {
        if e.is_timeout() {
            StorageError::Timeout(self.timeout)
        } else {
            StorageError::UploadFailed(e.to_string())
        }
    }

    async fn ensure_collections(&self, client: &Client, key: &str) -> StorageResult<()> {
        let Some(base) = self.base_url() else {
            return self.ensure_configured();
        };

        let segments: Vec<&str> = key.split('/').collect();
        let mut prefix = String::new();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            prefix.push_str(&urlencoding::encode(segment));
            prefix.push('/');
            let url = format!("{}/{}", base, prefix);

            let response = self
                .request(client, dav_method("MKCOL")?, &url)?
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            match response.status() {
                // 405: collection already exists
                StatusCode::CREATED
                | StatusCode::OK
                | StatusCode::NO_CONTENT
                | StatusCode::METHOD_NOT_ALLOWED
                | StatusCode::MOVED_PERMANENTLY => {}
                _ => {
                    return Err(StorageError::UploadFailed(format!(
                        "MKCOL {} failed: {}",
                        prefix,
                        describe_failure(response).await
                    )))
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for WebDavStorage {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> StorageResult<String> {
        validate_key(remote_key)?;
        self.ensure_configured()?;
        let client = self.client()?;
        let url = self.url_for(remote_key).unwrap_or_default();

        let data = tokio::fs::read(local_path).await?;
        let size = data.len();
        let start = std::time::Instant::now();

        self.ensure_collections(&client, remote_key).await?;

        let response = self
            .request(&client, Method::PUT, &url)?
            .body(data)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                tracing::info!(
                    key = %remote_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "WebDAV upload successful"
                );
                Ok(format!("Uploaded {}", remote_key))
            }
            status => {
                let detail = describe_failure(response).await;
                tracing::error!(
                    key = %remote_key,
                    status = %status,
                    detail = %detail,
                    "WebDAV upload failed"
                );
                Err(StorageError::UploadFailed(detail))
            }
        }
    }

    async fn delete(&self, remote_key: &str) -> StorageResult<String> {
        validate_key(remote_key)?;
        self.ensure_configured()?;
        let client = self.client()?;
        let url = self.url_for(remote_key).unwrap_or_default();

        let response = self
            .request(&client, Method::DELETE, &url)?
            .send()
            .await
            .map_err(|e| match self.transport_error(e) {
                StorageError::UploadFailed(detail) => StorageError::DeleteFailed(detail),
                other => other,
            })?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                tracing::info!(key = %remote_key, "WebDAV delete successful");
                Ok(format!("Deleted {}", remote_key))
            }
            StatusCode::NOT_FOUND => Ok(format!("{} already absent", remote_key)),
            _ => Err(StorageError::DeleteFailed(describe_failure(response).await)),
        }
    }

    fn resolve_url(&self, remote_key: &str) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        self.url_for(remote_key)
    }

    fn is_configured(&self) -> bool {
        self.config.is_complete_for(StorageProvider::Jianguoyun)
    }

    async fn test_connection(&self) -> StorageResult<String> {
        self.ensure_configured()?;
        let client = self.client()?;
        let url = format!("{}/", self.base_url().unwrap_or_default());

        let response = self
            .request(&client, dav_method("PROPFIND")?, &url)?
            .header("Depth", "0")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout(self.timeout)
                } else {
                    StorageError::ConnectionRejected(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK | StatusCode::MULTI_STATUS => Ok("WebDAV connection OK".to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                StorageError::ConnectionRejected(format!(
                    "credentials rejected ({})",
                    describe_failure(response).await
                )),
            ),
            _ => Err(StorageError::ConnectionRejected(
                describe_failure(response).await,
            )),
        }
    }

    fn provider(&self) -> StorageProvider {
        StorageProvider::Jianguoyun
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const AUTH: &str = "Basic dXNlcjpzZWNyZXQ=";

    fn dav(base: &str) -> WebDavStorage {
        WebDavStorage::new(
            ProviderConfig::new()
                .with("webdav_url", format!("{}/dav/", base))
                .with("username", "user")
                .with("password", "secret"),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn upload_creates_collection_then_puts() {
        let mut server = mockito::Server::new_async().await;
        let mkcol = server
            .mock("MKCOL", "/dav/images/")
            .match_header("authorization", AUTH)
            .with_status(201)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/dav/images/abc.png")
            .match_header("authorization", AUTH)
            .match_body("png-bytes")
            .with_status(201)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("abc.png");
        tokio::fs::write(&staged, b"png-bytes").await.unwrap();

        dav(&server.url())
            .upload(&staged, "images/abc.png")
            .await
            .unwrap();

        mkcol.assert_async().await;
        put.assert_async().await;
    }

    #[tokio::test]
    async fn upload_reports_status_without_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("MKCOL", "/dav/files/")
            .with_status(405)
            .create_async()
            .await;
        server
            .mock("PUT", "/dav/files/readme")
            .with_status(507)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("readme");
        tokio::fs::write(&staged, b"text").await.unwrap();

        let err = dav(&server.url())
            .upload(&staged, "files/readme")
            .await
            .unwrap_err();
        match err {
            StorageError::UploadFailed(detail) => {
                assert!(detail.contains("507"));
                assert!(!detail.contains("quota exceeded"));
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_of_missing_resource_succeeds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/dav/images/gone.png")
            .with_status(404)
            .create_async()
            .await;

        dav(&server.url()).delete("images/gone.png").await.unwrap();
    }

    #[tokio::test]
    async fn propfind_multistatus_is_a_successful_connection() {
        let mut server = mockito::Server::new_async().await;
        let propfind = server
            .mock("PROPFIND", "/dav/")
            .match_header("depth", "0")
            .match_header("authorization", AUTH)
            .with_status(207)
            .create_async()
            .await;

        dav(&server.url()).test_connection().await.unwrap();
        propfind.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_are_distinct_from_missing_ones() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PROPFIND", "/dav/")
            .with_status(401)
            .create_async()
            .await;

        let err = dav(&server.url()).test_connection().await.unwrap_err();
        assert!(matches!(err, StorageError::ConnectionRejected(_)));

        let unconfigured = WebDavStorage::new(
            ProviderConfig::new().with("webdav_url", server.url()),
            Duration::from_secs(1),
        );
        let err = unconfigured.test_connection().await.unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn connection_failure_detail_omits_response_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PROPFIND", "/dav/")
            .with_status(500)
            .with_body("INTERNAL-METADATA-SECRET")
            .create_async()
            .await;

        let err = dav(&server.url()).test_connection().await.unwrap_err();
        let detail = err.to_string();
        assert!(detail.contains("500"));
        assert!(!detail.contains("INTERNAL-METADATA-SECRET"));
    }

    #[test]
    fn resolve_url_joins_base_and_key() {
        let storage = dav("https://dav.jianguoyun.com");
        assert_eq!(
            storage.resolve_url("images/a b.png").as_deref(),
            Some("https://dav.jianguoyun.com/dav/images/a%20b.png")
        );
    }
}
