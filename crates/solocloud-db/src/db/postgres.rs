//! Postgres repositories for `media_objects` and `share_links`.

use crate::db::traits::{
    ConsumeOutcome, ListQuery, MediaCatalog, ObjectPage, ShareLinkStore, SortField, SortOrder,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solocloud_core::{AppError, FileCategory, ShareDenial, ShareLink, StorageProvider, StoredObject};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Open a connection pool.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the workspace migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}

/// Row type for media_objects table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct StoredObjectRow {
    id: Uuid,
    unique_name: String,
    original_name: String,
    category: FileCategory,
    mime_type: String,
    size_bytes: i64,
    provider: StorageProvider,
    path: String,
    thumbnail_path: Option<String>,
    created_at: DateTime<Utc>,
    owner_id: Uuid,
}

impl From<StoredObjectRow> for StoredObject {
    fn from(row: StoredObjectRow) -> Self {
        StoredObject {
            id: row.id,
            unique_name: row.unique_name,
            original_name: row.original_name,
            category: row.category,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            provider: row.provider,
            path: row.path,
            thumbnail_path: row.thumbnail_path,
            created_at: row.created_at,
            owner_id: row.owner_id,
        }
    }
}

/// Row type for share_links table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct ShareLinkRow {
    id: Uuid,
    token: String,
    object_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    access_count: i32,
    max_access: i32,
    is_active: bool,
}

impl From<ShareLinkRow> for ShareLink {
    fn from(row: ShareLinkRow) -> Self {
        ShareLink {
            id: row.id,
            token: row.token,
            object_id: row.object_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            access_count: row.access_count,
            max_access: row.max_access,
            is_active: row.is_active,
        }
    }
}

const OBJECT_COLUMNS: &str = "id, unique_name, original_name, category, mime_type, size_bytes, \
     provider, path, thumbnail_path, created_at, owner_id";

const LINK_COLUMNS: &str =
    "id, token, object_id, created_at, expires_at, access_count, max_access, is_active";

/// Repository for media_objects table.
#[derive(Clone)]
pub struct PgMediaCatalog {
    pool: PgPool,
}

impl PgMediaCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaCatalog for PgMediaCatalog {
    #[tracing::instrument(skip(self, object), fields(db.table = "media_objects", object.id = %object.id))]
    async fn insert(&self, object: &StoredObject) -> Result<StoredObject, AppError> {
        let row: StoredObjectRow = sqlx::query_as::<Postgres, StoredObjectRow>(&format!(
            r#"
            INSERT INTO media_objects ({OBJECT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {OBJECT_COLUMNS}
            "#
        ))
        .bind(object.id)
        .bind(&object.unique_name)
        .bind(&object.original_name)
        .bind(object.category)
        .bind(&object.mime_type)
        .bind(object.size_bytes)
        .bind(object.provider)
        .bind(&object.path)
        .bind(&object.thumbnail_path)
        .bind(object.created_at)
        .bind(object.owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_objects"))]
    async fn get(&self, id: Uuid) -> Result<Option<StoredObject>, AppError> {
        let row = sqlx::query_as::<Postgres, StoredObjectRow>(&format!(
            "SELECT {OBJECT_COLUMNS} FROM media_objects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_objects"))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM media_objects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, query), fields(db.table = "media_objects"))]
    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        query: &ListQuery,
    ) -> Result<ObjectPage, AppError> {
        const FILTER: &str = "owner_id = $1 \
             AND ($2::file_category IS NULL OR category = $2) \
             AND ($3::text IS NULL OR original_name ILIKE '%' || $3 || '%' ESCAPE '\\')";

        let pattern = query.search_term().map(escape_like);

        let total = sqlx::query_scalar::<Postgres, i64>(&format!(
            "SELECT COUNT(*) FROM media_objects WHERE {FILTER}"
        ))
        .bind(owner_id)
        .bind(query.category)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<Postgres, StoredObjectRow>(&format!(
            r#"
            SELECT {OBJECT_COLUMNS} FROM media_objects
            WHERE {FILTER}
            ORDER BY {order}
            LIMIT $4 OFFSET $5
            "#,
            order = order_by(query.sort_by, query.sort_order),
        ))
        .bind(owner_id)
        .bind(query.category)
        .bind(pattern.as_deref())
        .bind(i64::from(query.limit()))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(ObjectPage {
            objects: rows.into_iter().map(Into::into).collect(),
            total: u64::try_from(total).unwrap_or(0),
        })
    }
}

fn order_by(field: SortField, order: SortOrder) -> String {
    let column = match field {
        SortField::OriginalName => "original_name",
        SortField::Size => "size_bytes",
        SortField::Category => "category::text",
        SortField::CreatedAt => "created_at",
    };
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!("{column} {direction}, id {direction}")
}

/// Escape `LIKE` wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Repository for share_links table.
#[derive(Clone)]
pub struct PgShareLinkStore {
    pool: PgPool,
}

impl PgShareLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareLinkStore for PgShareLinkStore {
    #[tracing::instrument(skip(self, link), fields(db.table = "share_links", object.id = %link.object_id))]
    async fn insert(&self, link: &ShareLink) -> Result<ShareLink, AppError> {
        let row: ShareLinkRow = sqlx::query_as::<Postgres, ShareLinkRow>(&format!(
            r#"
            INSERT INTO share_links ({LINK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(link.id)
        .bind(&link.token)
        .bind(link.object_id)
        .bind(link.created_at)
        .bind(link.expires_at)
        .bind(link.access_count)
        .bind(link.max_access)
        .bind(link.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "share_links"))]
    async fn get(&self, id: Uuid) -> Result<Option<ShareLink>, AppError> {
        let row = sqlx::query_as::<Postgres, ShareLinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM share_links WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Conditional increment: the row is only touched when every check passes, so
    /// concurrent resolutions serialize on the row lock and cannot overshoot `max_access`.
    #[tracing::instrument(skip(self, token), fields(db.table = "share_links"))]
    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<ConsumeOutcome, AppError> {
        let granted = sqlx::query_as::<Postgres, ShareLinkRow>(&format!(
            r#"
            UPDATE share_links
            SET access_count = access_count + 1
            WHERE token = $1
              AND is_active
              AND expires_at > $2
              AND (max_access = 0 OR access_count < max_access)
              AND access_count < 2147483647
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = granted {
            return Ok(ConsumeOutcome::Granted(row.into()));
        }

        let current = sqlx::query_as::<Postgres, ShareLinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM share_links WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match current {
            None => ConsumeOutcome::NotFound,
            Some(row) => {
                let link: ShareLink = row.into();
                // An Active state here means another request took the last access
                // between the two statements, or the counter is saturated.
                ConsumeOutcome::Denied(
                    link.evaluate(now)
                        .denial()
                        .unwrap_or(ShareDenial::Exhausted),
                )
            }
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "share_links"))]
    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE share_links SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "share_links"))]
    async fn list_active_for_object(&self, object_id: Uuid) -> Result<Vec<ShareLink>, AppError> {
        let rows = sqlx::query_as::<Postgres, ShareLinkRow>(&format!(
            r#"
            SELECT {LINK_COLUMNS} FROM share_links
            WHERE object_id = $1 AND is_active
            ORDER BY created_at DESC
            "#
        ))
        .bind(object_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
