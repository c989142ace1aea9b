//! In-memory catalog implementations.
//!
//! Used when no `DATABASE_URL` is configured, and by tests. Data is lost on drop.

use crate::db::traits::{
    ConsumeOutcome, ListQuery, MediaCatalog, ObjectPage, ShareLinkStore, SortField, SortOrder,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solocloud_core::{AppError, FileCategory, ShareDenial, ShareLink, ShareLinkState, StoredObject};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMediaCatalog {
    objects: Arc<RwLock<HashMap<Uuid, StoredObject>>>,
}

impl InMemoryMediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl MediaCatalog for InMemoryMediaCatalog {
    async fn insert(&self, object: &StoredObject) -> Result<StoredObject, AppError> {
        let mut objects = self.objects.write().await;
        if objects
            .values()
            .any(|o| o.provider == object.provider && o.path == object.path)
        {
            return Err(AppError::Validation(format!(
                "Path {} already exists on {}",
                object.path, object.provider
            )));
        }
        objects.insert(object.id, object.clone());
        Ok(object.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredObject>, AppError> {
        Ok(self.objects.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.objects.write().await.remove(&id).is_some())
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        query: &ListQuery,
    ) -> Result<ObjectPage, AppError> {
        let search = query.search_term().map(str::to_lowercase);
        let mut objects: Vec<StoredObject> = self
            .objects
            .read()
            .await
            .values()
            .filter(|o| o.owner_id == owner_id)
            .filter(|o| query.category.map_or(true, |c| o.category == c))
            .filter(|o| {
                search
                    .as_deref()
                    .map_or(true, |term| o.original_name.to_lowercase().contains(term))
            })
            .cloned()
            .collect();

        objects.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortField::OriginalName => a.original_name.cmp(&b.original_name),
                SortField::Size => a.size_bytes.cmp(&b.size_bytes),
                SortField::Category => a.category.as_str().cmp(b.category.as_str()),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            }
            .then_with(|| a.id.cmp(&b.id));
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = objects.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let objects = objects
            .into_iter()
            .skip(offset)
            .take(query.limit() as usize)
            .collect();

        Ok(ObjectPage { objects, total })
    }
}

#[derive(Debug, Default)]
struct ShareTables {
    links: HashMap<Uuid, ShareLink>,
    by_token: HashMap<String, Uuid>,
}

/// Share links behind a single lock, so `consume` checks and increments atomically.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShareLinkStore {
    tables: Arc<RwLock<ShareTables>>,
}

impl InMemoryShareLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareLinkStore for InMemoryShareLinkStore {
    async fn insert(&self, link: &ShareLink) -> Result<ShareLink, AppError> {
        let mut tables = self.tables.write().await;
        if tables.by_token.contains_key(&link.token) {
            return Err(AppError::Internal("Share token collision".to_string()));
        }
        tables.by_token.insert(link.token.clone(), link.id);
        tables.links.insert(link.id, link.clone());
        Ok(link.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ShareLink>, AppError> {
        Ok(self.tables.read().await.links.get(&id).cloned())
    }

    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<ConsumeOutcome, AppError> {
        let mut tables = self.tables.write().await;
        let Some(id) = tables.by_token.get(token).copied() else {
            return Ok(ConsumeOutcome::NotFound);
        };
        let Some(link) = tables.links.get_mut(&id) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        match link.evaluate(now) {
            ShareLinkState::Active => match link.access_count.checked_add(1) {
                Some(count) => {
                    link.access_count = count;
                    Ok(ConsumeOutcome::Granted(link.clone()))
                }
                None => Ok(ConsumeOutcome::Denied(ShareDenial::Exhausted)),
            },
            state => Ok(state
                .denial()
                .map(ConsumeOutcome::Denied)
                .unwrap_or(ConsumeOutcome::NotFound)),
        }
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.links.get_mut(&id) {
            Some(link) => {
                link.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_active_for_object(&self, object_id: Uuid) -> Result<Vec<ShareLink>, AppError> {
        let mut links: Vec<ShareLink> = self
            .tables
            .read()
            .await
            .links
            .values()
            .filter(|l| l.object_id == object_id && l.is_active)
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }
}
