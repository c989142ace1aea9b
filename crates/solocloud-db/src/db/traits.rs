use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solocloud_core::{AppError, FileCategory, ShareDenial, ShareLink, StoredObject};
use uuid::Uuid;

/// Column an owner's listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    OriginalName,
    Size,
    Category,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Lenient parse of the `sort_by` parameter; unknown values sort by upload time.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "filename" | "name" => SortField::OriginalName,
            "file_size" | "size" => SortField::Size,
            "file_type" | "category" => SortField::Category,
            _ => SortField::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` is descending.
    pub fn from_param(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

/// Filter, ordering and page window for [`MediaCatalog::list_for_owner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub category: Option<FileCategory>,
    /// Case-insensitive substring of the original filename.
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
            per_page: 20,
        }
    }
}

impl ListQuery {
    pub fn limit(&self) -> u32 {
        self.per_page.max(1)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit())
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// One page of an owner's objects plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPage {
    pub objects: Vec<StoredObject>,
    pub total: u64,
}

/// Catalog of stored objects.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn insert(&self, object: &StoredObject) -> Result<StoredObject, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<StoredObject>, AppError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        query: &ListQuery,
    ) -> Result<ObjectPage, AppError>;
}

/// Outcome of one attempt to dereference a share token.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// Access granted; the link is returned with its counter already incremented.
    Granted(ShareLink),
    Denied(ShareDenial),
    NotFound,
}

/// Share-link persistence.
#[async_trait]
pub trait ShareLinkStore: Send + Sync {
    async fn insert(&self, link: &ShareLink) -> Result<ShareLink, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<ShareLink>, AppError>;

    /// Check the link and increment its access counter as one atomic step.
    /// Two concurrent calls against a link with one access left never both succeed.
    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<ConsumeOutcome, AppError>;

    /// Soft-delete. Returns whether the link existed.
    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError>;

    /// Newest first.
    async fn list_active_for_object(&self, object_id: Uuid) -> Result<Vec<ShareLink>, AppError>;
}
