//! Configuration
//!
//! Two layers:
//! - [`Config`]: process-level settings read once at startup.
//! - [`StorageSettings`]: the active provider plus every provider's credentials. This part
//!   can change while the server runs, so callers build a fresh snapshot for each logical
//!   operation instead of holding one globally.

use crate::constants::{
    DEFAULT_CONNECTION_TEST_TIMEOUT_SECS, DEFAULT_MAX_UPLOAD_SIZE_MB, DEFAULT_SHARE_TTL_HOURS,
    DEFAULT_STORAGE_TIMEOUT_SECS, DEFAULT_THUMBNAIL_MAX_SIZE, DEFAULT_THUMBNAIL_QUALITY,
};
use crate::storage_types::{ProviderConfig, StorageProvider};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub upload_folder: PathBuf,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub storage_timeout: Duration,
    pub connection_test_timeout: Duration,
    pub thumbnail_max_size: u32,
    pub thumbnail_quality: u8,
    pub ffmpeg_path: String,
    pub max_upload_bytes: usize,
    pub public_base_url: Option<String>,
    pub share_default_ttl_hours: u32,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 5000,
            environment: "development".to_string(),
            upload_folder: PathBuf::from("uploads"),
            database_url: None,
            db_max_connections: 5,
            storage_timeout: Duration::from_secs(DEFAULT_STORAGE_TIMEOUT_SECS),
            connection_test_timeout: Duration::from_secs(DEFAULT_CONNECTION_TEST_TIMEOUT_SECS),
            thumbnail_max_size: DEFAULT_THUMBNAIL_MAX_SIZE,
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
            ffmpeg_path: "ffmpeg".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            public_base_url: None,
            share_default_ttl_hours: DEFAULT_SHARE_TTL_HOURS,
            cors_origins: vec!["*".to_string()],
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let thumbnail_quality: u8 = env_or("THUMBNAIL_QUALITY", defaults.thumbnail_quality);
        if thumbnail_quality == 0 || thumbnail_quality > 100 {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_QUALITY must be between 1 and 100, got {}",
                thumbnail_quality
            ));
        }

        let thumbnail_max_size = env_or("THUMBNAIL_MAX_SIZE", defaults.thumbnail_max_size);
        if thumbnail_max_size == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_MAX_SIZE must be greater than 0"));
        }

        let ffmpeg_path = env_opt("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path);

        let max_upload_mb: usize = env_or("MAX_UPLOAD_SIZE_MB", DEFAULT_MAX_UPLOAD_SIZE_MB);

        let cors_origins = env_opt("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        Ok(Self {
            server_port: env_or("PORT", defaults.server_port),
            environment,
            upload_folder: env_opt("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_folder),
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            storage_timeout: Duration::from_secs(env_or(
                "STORAGE_TIMEOUT_SECS",
                DEFAULT_STORAGE_TIMEOUT_SECS,
            )),
            connection_test_timeout: Duration::from_secs(env_or(
                "CONNECTION_TEST_TIMEOUT_SECS",
                DEFAULT_CONNECTION_TEST_TIMEOUT_SECS,
            )),
            thumbnail_max_size,
            thumbnail_quality,
            ffmpeg_path,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            public_base_url: env_opt("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            share_default_ttl_hours: env_or(
                "SHARE_DEFAULT_TTL_HOURS",
                defaults.share_default_ttl_hours,
            ),
            cors_origins,
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

/// Snapshot of storage provider selection and credentials.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    active: String,
    providers: HashMap<StorageProvider, ProviderConfig>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self::new(StorageProvider::Local.as_str())
    }
}

impl StorageSettings {
    /// `active` is kept as the raw identifier so an unknown value can be reported
    /// by the registry rather than silently replaced.
    pub fn new(active: impl Into<String>) -> Self {
        Self {
            active: active.into(),
            providers: HashMap::new(),
        }
    }

    pub fn with_provider(mut self, provider: StorageProvider, config: ProviderConfig) -> Self {
        self.providers.insert(provider, config);
        self
    }

    /// Read `STORAGE_PROVIDER` and every provider's credential variables from the process
    /// environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Fresh snapshot from `.env` in the working directory layered over the process
    /// environment.
    pub fn reload() -> Self {
        Self::reload_from(Path::new(".env"))
    }

    /// Values in `dotenv_path` win over the process environment, which is only read.
    pub fn reload_from(dotenv_path: &Path) -> Self {
        let overrides = read_dotenv(dotenv_path);
        Self::from_lookup(|key| overrides.get(key).cloned().or_else(|| env::var(key).ok()))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let active = lookup("STORAGE_PROVIDER")
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| StorageProvider::Local.as_str().to_string());

        let mut providers = HashMap::new();
        for provider in StorageProvider::ALL {
            let mut config = ProviderConfig::new();
            let fields = provider
                .required_fields()
                .iter()
                .chain(provider.optional_fields().iter());
            for field in fields {
                if let Some(value) = provider.env_key(field).and_then(|key| lookup(&key)) {
                    config.insert(*field, value);
                }
            }
            providers.insert(provider, config);
        }

        Self { active, providers }
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    /// Credentials for `provider`; empty when nothing is set.
    pub fn provider_config(&self, provider: StorageProvider) -> ProviderConfig {
        self.providers.get(&provider).cloned().unwrap_or_default()
    }

    pub fn is_configured(&self, provider: StorageProvider) -> bool {
        provider == StorageProvider::Local
            || self
                .providers
                .get(&provider)
                .map(|c| c.is_complete_for(provider))
                .unwrap_or(false)
    }
}

fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(error = %e, path = %path.display(), "No .env file reloaded");
            return HashMap::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Skipping malformed .env line");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_local_when_unset() {
        let settings = StorageSettings::from_lookup(|_| None);
        assert_eq!(settings.active_id(), "local");
        assert!(settings.is_configured(StorageProvider::Local));
        assert!(!settings.is_configured(StorageProvider::Qiniu));
    }

    #[test]
    fn reads_provider_fields_from_prefixed_keys() {
        let settings = StorageSettings::from_lookup(lookup_from(&[
            ("STORAGE_PROVIDER", " Tencent_COS "),
            ("TENCENT_COS_SECRET_ID", "id"),
            ("TENCENT_COS_SECRET_KEY", "key"),
            ("TENCENT_COS_REGION", "ap-guangzhou"),
            ("TENCENT_COS_BUCKET_NAME", "bucket-1250000000"),
        ]));

        assert_eq!(settings.active_id(), "tencent_cos");
        assert!(settings.is_configured(StorageProvider::TencentCos));
        assert_eq!(
            settings
                .provider_config(StorageProvider::TencentCos)
                .get("region"),
            Some("ap-guangzhou")
        );
    }

    #[test]
    fn reload_reads_dotenv_without_touching_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "STORAGE_PROVIDER=aliyun_oss\nALIYUN_OSS_BUCKET_NAME=from-dotenv\n",
        )
        .unwrap();

        let settings = StorageSettings::reload_from(&path);

        assert_eq!(settings.active_id(), "aliyun_oss");
        assert_eq!(
            settings
                .provider_config(StorageProvider::AliyunOss)
                .get("bucket_name"),
            Some("from-dotenv")
        );
        assert_ne!(env::var("STORAGE_PROVIDER").ok().as_deref(), Some("aliyun_oss"));
        assert!(env::var("ALIYUN_OSS_BUCKET_NAME").is_err());
    }

    #[test]
    fn reload_without_dotenv_falls_back_to_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let from_file = StorageSettings::reload_from(&dir.path().join(".env"));
        let from_env = StorageSettings::from_env();
        assert_eq!(from_file.active_id(), from_env.active_id());
    }

    #[test]
    fn keeps_unknown_active_identifier_verbatim() {
        let settings = StorageSettings::from_lookup(lookup_from(&[("STORAGE_PROVIDER", "ftp")]));
        assert_eq!(settings.active_id(), "ftp");
    }
}
