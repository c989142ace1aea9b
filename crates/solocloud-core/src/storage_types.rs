use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage provider identifiers
///
/// Closed set of supported backends. Three of them (`AliyunOss`, `TencentCos`, `Qiniu`)
/// speak the S3 object-store protocol; `Jianguoyun` is a WebDAV service; `Local` keeps
/// bytes on the server's disk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_provider", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    Local,
    AliyunOss,
    TencentCos,
    Qiniu,
    Jianguoyun,
}

impl StorageProvider {
    pub const ALL: [StorageProvider; 5] = [
        StorageProvider::Local,
        StorageProvider::AliyunOss,
        StorageProvider::TencentCos,
        StorageProvider::Qiniu,
        StorageProvider::Jianguoyun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::Local => "local",
            StorageProvider::AliyunOss => "aliyun_oss",
            StorageProvider::TencentCos => "tencent_cos",
            StorageProvider::Qiniu => "qiniu",
            StorageProvider::Jianguoyun => "jianguoyun",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StorageProvider::Local => "Local storage",
            StorageProvider::AliyunOss => "Aliyun OSS",
            StorageProvider::TencentCos => "Tencent COS",
            StorageProvider::Qiniu => "Qiniu Kodo",
            StorageProvider::Jianguoyun => "Jianguoyun (WebDAV)",
        }
    }

    /// Fields that must be present and non-blank for the provider to count as configured.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            StorageProvider::Local => &[],
            StorageProvider::AliyunOss => &[
                "access_key_id",
                "access_key_secret",
                "endpoint",
                "bucket_name",
            ],
            StorageProvider::TencentCos => &["secret_id", "secret_key", "region", "bucket_name"],
            StorageProvider::Qiniu => &["access_key", "secret_key", "bucket_name", "domain"],
            StorageProvider::Jianguoyun => &["webdav_url", "username", "password"],
        }
    }

    /// Fields read when present but never required.
    pub fn optional_fields(&self) -> &'static [&'static str] {
        match self {
            StorageProvider::Qiniu => &["region"],
            _ => &[],
        }
    }

    /// Environment variable prefix, e.g. `ALIYUN_OSS` for `ALIYUN_OSS_BUCKET_NAME`.
    pub fn env_prefix(&self) -> Option<&'static str> {
        match self {
            StorageProvider::Local => None,
            StorageProvider::AliyunOss => Some("ALIYUN_OSS"),
            StorageProvider::TencentCos => Some("TENCENT_COS"),
            StorageProvider::Qiniu => Some("QINIU"),
            StorageProvider::Jianguoyun => Some("JIANGUOYUN"),
        }
    }

    /// Environment variable holding `field` for this provider.
    pub fn env_key(&self, field: &str) -> Option<String> {
        self.env_prefix()
            .map(|prefix| format!("{}_{}", prefix, field.to_uppercase()))
    }

    /// Whether the provider is reached through the S3-compatible object-store driver.
    pub fn is_object_store(&self) -> bool {
        matches!(
            self,
            StorageProvider::AliyunOss | StorageProvider::TencentCos | StorageProvider::Qiniu
        )
    }
}

impl FromStr for StorageProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StorageProvider::Local),
            "aliyun_oss" => Ok(StorageProvider::AliyunOss),
            "tencent_cos" => Ok(StorageProvider::TencentCos),
            "qiniu" => Ok(StorageProvider::Qiniu),
            "jianguoyun" => Ok(StorageProvider::Jianguoyun),
            _ => Err(anyhow::anyhow!("Invalid storage provider: {}", s)),
        }
    }
}

impl Display for StorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Credential and endpoint fields for one provider.
///
/// Values are never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig(BTreeMap<String, String>);

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Trimmed value of `key`, or `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn missing_fields(&self, provider: StorageProvider) -> Vec<&'static str> {
        provider
            .required_fields()
            .iter()
            .copied()
            .filter(|field| self.get(field).is_none())
            .collect()
    }

    pub fn is_complete_for(&self, provider: StorageProvider) -> bool {
        self.missing_fields(provider).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProviderConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "***")))
            .finish()
    }
}
