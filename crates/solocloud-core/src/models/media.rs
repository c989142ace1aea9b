use crate::storage_types::StorageProvider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Semantic category assigned to an upload from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_category", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Code,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Document => "document",
            FileCategory::Archive => "archive",
            FileCategory::Code => "code",
        }
    }

    /// Directory (and object-key prefix) that files of this category land in.
    pub fn subfolder(&self) -> &'static str {
        match self {
            FileCategory::Image => "images",
            FileCategory::Video => "videos",
            FileCategory::Audio => "audio",
            FileCategory::Document => "files",
            FileCategory::Archive => "archives",
            FileCategory::Code => "code",
        }
    }

    /// Images and videos get thumbnails and are served inline on share links.
    pub fn is_visual(&self) -> bool {
        matches!(self, FileCategory::Image | FileCategory::Video)
    }
}

impl FromStr for FileCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(FileCategory::Image),
            "video" => Ok(FileCategory::Video),
            "audio" => Ok(FileCategory::Audio),
            "document" => Ok(FileCategory::Document),
            "archive" => Ok(FileCategory::Archive),
            "code" => Ok(FileCategory::Code),
            _ => Err(anyhow::anyhow!("Invalid file category: {}", s)),
        }
    }
}

impl Display for FileCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Catalog record for one uploaded artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: Uuid,
    /// Random 128-bit hex name plus the lower-cased original extension, if any.
    pub unique_name: String,
    pub original_name: String,
    pub category: FileCategory,
    pub mime_type: String,
    pub size_bytes: i64,
    pub provider: StorageProvider,
    /// `{subfolder}/{unique_name}`: the backend key and the path under the upload root.
    pub path: String,
    /// Relative to the upload root.
    pub thumbnail_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub owner_id: Uuid,
}

impl StoredObject {
    /// Where the staged (or, for `Local`, the only) copy lives.
    pub fn local_path(&self, upload_root: &Path) -> PathBuf {
        upload_root.join(&self.path)
    }

    pub fn thumbnail_local_path(&self, upload_root: &Path) -> Option<PathBuf> {
        self.thumbnail_path.as_ref().map(|p| upload_root.join(p))
    }

    pub fn is_owned_by(&self, owner_id: Uuid) -> bool {
        self.owner_id == owner_id
    }
}
