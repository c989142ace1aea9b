use super::token::generate_token;
use chrono::{Duration, Utc};
use solocloud_core::constants::permanent_expiry;
use solocloud_core::{AppError, ShareDenial, ShareLink, ShareLinkView, StoredObject};
use solocloud_db::{ConsumeOutcome, MediaCatalog, ShareLinkStore};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of dereferencing a share token that exists.
#[derive(Debug, Clone, PartialEq)]
pub enum ShareResolution {
    /// Access counted; `link` carries the incremented counter.
    Granted { link: ShareLink, object: StoredObject },
    Denied(ShareDenial),
}

/// Issues, resolves and revokes share links.
#[derive(Clone)]
pub struct ShareLinkManager {
    links: Arc<dyn ShareLinkStore>,
    catalog: Arc<dyn MediaCatalog>,
    default_ttl_hours: u32,
}

impl ShareLinkManager {
    pub fn new(
        links: Arc<dyn ShareLinkStore>,
        catalog: Arc<dyn MediaCatalog>,
        default_ttl_hours: u32,
    ) -> Self {
        Self {
            links,
            catalog,
            default_ttl_hours,
        }
    }

    /// Create a link to `object`. `ttl_hours = 0` means permanent, `max_access = 0` unbounded.
    #[tracing::instrument(skip(self, object), fields(object_id = %object.id))]
    pub async fn issue(
        &self,
        object: &StoredObject,
        ttl_hours: u32,
        max_access: u32,
    ) -> Result<ShareLink, AppError> {
        let max_access = i32::try_from(max_access).map_err(|_| {
            AppError::Validation(format!("max_access must be at most {}", i32::MAX))
        })?;

        let now = Utc::now();
        let expires_at = if ttl_hours == 0 {
            permanent_expiry()
        } else {
            now.checked_add_signed(Duration::hours(i64::from(ttl_hours)))
                .map(|at| at.min(permanent_expiry()))
                .unwrap_or_else(permanent_expiry)
        };

        let link = ShareLink {
            id: Uuid::new_v4(),
            token: generate_token(),
            object_id: object.id,
            created_at: now,
            expires_at,
            access_count: 0,
            max_access,
            is_active: true,
        };

        let link = self.links.insert(&link).await?;

        tracing::info!(
            link_id = %link.id,
            object_id = %link.object_id,
            expires_at = %link.expires_at,
            max_access = link.max_access,
            "Share link issued"
        );

        Ok(link)
    }

    /// Issue on behalf of `owner_id`, applying defaults. Objects the caller does not own
    /// are reported as missing.
    pub async fn issue_for_owner(
        &self,
        object_id: Uuid,
        owner_id: Uuid,
        ttl_hours: Option<u32>,
        max_access: Option<u32>,
    ) -> Result<ShareLink, AppError> {
        let object = self.owned_object(object_id, owner_id).await?;
        self.issue(
            &object,
            ttl_hours.unwrap_or(self.default_ttl_hours),
            max_access.unwrap_or(0),
        )
        .await
    }

    /// Dereference `token`, counting the access when granted.
    ///
    /// Unknown tokens and links whose object has disappeared are `NotFound`.
    #[tracing::instrument(skip(self, token))]
    pub async fn resolve(&self, token: &str) -> Result<ShareResolution, AppError> {
        let link = match self.links.consume(token, Utc::now()).await? {
            ConsumeOutcome::Granted(link) => link,
            ConsumeOutcome::Denied(reason) => {
                tracing::info!(reason = %reason, "Share link denied");
                return Ok(ShareResolution::Denied(reason));
            }
            ConsumeOutcome::NotFound => {
                return Err(AppError::NotFound("Share link not found".to_string()))
            }
        };

        let object = self.catalog.get(link.object_id).await?.ok_or_else(|| {
            AppError::NotFound("Shared file no longer exists".to_string())
        })?;

        tracing::info!(
            link_id = %link.id,
            object_id = %object.id,
            access_count = link.access_count,
            "Share link resolved"
        );

        Ok(ShareResolution::Granted { link, object })
    }

    /// Deactivate a link. Only the owner of the shared object may do this.
    #[tracing::instrument(skip(self))]
    pub async fn revoke(&self, link_id: Uuid, owner_id: Uuid) -> Result<(), AppError> {
        let link = self
            .links
            .get(link_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Share link not found".to_string()))?;

        let owns = self
            .catalog
            .get(link.object_id)
            .await?
            .is_some_and(|object| object.is_owned_by(owner_id));
        if !owns {
            return Err(AppError::Forbidden(
                "Not allowed to revoke this share link".to_string(),
            ));
        }

        self.links.deactivate(link_id).await?;
        tracing::info!(link_id = %link_id, "Share link revoked");
        Ok(())
    }

    /// Active links for an object the caller owns, newest first.
    pub async fn list_for_object(
        &self,
        object_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Vec<ShareLinkView>, AppError> {
        self.owned_object(object_id, owner_id).await?;
        let now = Utc::now();
        Ok(self
            .links
            .list_active_for_object(object_id)
            .await?
            .into_iter()
            .map(|link| ShareLinkView::new(link, now))
            .collect())
    }

    async fn owned_object(&self, object_id: Uuid, owner_id: Uuid) -> Result<StoredObject, AppError> {
        self.catalog
            .get(object_id)
            .await?
            .filter(|object| object.is_owned_by(owner_id))
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solocloud_core::{FileCategory, StorageProvider};
    use solocloud_db::{InMemoryMediaCatalog, InMemoryShareLinkStore};

    struct Fixture {
        manager: ShareLinkManager,
        links: InMemoryShareLinkStore,
        object: StoredObject,
    }

    async fn fixture() -> Fixture {
        let catalog = InMemoryMediaCatalog::new();
        let links = InMemoryShareLinkStore::new();
        let object = StoredObject {
            id: Uuid::new_v4(),
            unique_name: "5d0c.png".to_string(),
            original_name: "cat.png".to_string(),
            category: FileCategory::Image,
            mime_type: "image/png".to_string(),
            size_bytes: 42,
            provider: StorageProvider::Local,
            path: "images/5d0c.png".to_string(),
            thumbnail_path: None,
            created_at: Utc::now(),
            owner_id: Uuid::new_v4(),
        };
        catalog.insert(&object).await.unwrap();

        Fixture {
            manager: ShareLinkManager::new(Arc::new(links.clone()), Arc::new(catalog), 168),
            links,
            object,
        }
    }

    #[tokio::test]
    async fn zero_ttl_uses_permanent_sentinel() {
        let f = fixture().await;
        let link = f.manager.issue(&f.object, 0, 5).await.unwrap();
        assert_eq!(link.expires_at, permanent_expiry());
        assert!(link.is_permanent());
        assert_eq!(link.max_access, 5);
    }

    #[tokio::test]
    async fn one_hour_ttl_is_unbounded_by_default() {
        let f = fixture().await;
        let before = Utc::now();
        let link = f.manager.issue(&f.object, 1, 0).await.unwrap();
        let after = Utc::now();

        assert!(link.expires_at >= before + Duration::hours(1));
        assert!(link.expires_at <= after + Duration::hours(1));
        assert_eq!(link.max_access, 0);
        assert_eq!(link.access_count, 0);
        assert!(link.is_active);
    }

    #[tokio::test]
    async fn oversized_max_access_is_rejected() {
        let f = fixture().await;
        let err = f.manager.issue(&f.object, 1, u32::MAX).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn single_use_link_is_exhausted_after_first_access() {
        let f = fixture().await;
        let link = f.manager.issue(&f.object, 1, 1).await.unwrap();

        match f.manager.resolve(&link.token).await.unwrap() {
            ShareResolution::Granted { link, object } => {
                assert_eq!(link.access_count, 1);
                assert_eq!(object.id, f.object.id);
            }
            other => panic!("expected access, got {other:?}"),
        }
        assert_eq!(
            f.manager.resolve(&link.token).await.unwrap(),
            ShareResolution::Denied(ShareDenial::Exhausted)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_resolutions_never_both_succeed() {
        let f = fixture().await;
        let link = f.manager.issue(&f.object, 1, 1).await.unwrap();

        let (a, b) = tokio::join!(
            {
                let manager = f.manager.clone();
                let token = link.token.clone();
                tokio::spawn(async move { manager.resolve(&token).await.unwrap() })
            },
            {
                let manager = f.manager.clone();
                let token = link.token.clone();
                tokio::spawn(async move { manager.resolve(&token).await.unwrap() })
            }
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let granted = outcomes
            .iter()
            .filter(|o| matches!(o, ShareResolution::Granted { .. }))
            .count();
        let exhausted = outcomes
            .iter()
            .filter(|o| **o == ShareResolution::Denied(ShareDenial::Exhausted))
            .count();
        assert_eq!((granted, exhausted), (1, 1));
    }

    #[tokio::test]
    async fn expired_link_is_denied_even_with_budget_left() {
        let f = fixture().await;
        let mut link = f.manager.issue(&f.object, 1, 10).await.unwrap();
        link.id = Uuid::new_v4();
        link.token = generate_token();
        link.expires_at = Utc::now() - Duration::minutes(1);
        f.links.insert(&link).await.unwrap();

        assert_eq!(
            f.manager.resolve(&link.token).await.unwrap(),
            ShareResolution::Denied(ShareDenial::Expired)
        );
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.manager.resolve("no-such-token").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_the_owner_can_revoke() {
        let f = fixture().await;
        let link = f.manager.issue(&f.object, 0, 0).await.unwrap();

        let err = f.manager.revoke(link.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        f.manager.revoke(link.id, f.object.owner_id).await.unwrap();
        assert_eq!(
            f.manager.resolve(&link.token).await.unwrap(),
            ShareResolution::Denied(ShareDenial::Revoked)
        );
        // history is kept
        assert!(f.links.get(link.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn issue_and_list_require_ownership() {
        let f = fixture().await;
        let stranger = Uuid::new_v4();

        assert!(matches!(
            f.manager.issue_for_owner(f.object.id, stranger, None, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.list_for_object(f.object.id, stranger).await,
            Err(AppError::NotFound(_))
        ));

        let link = f
            .manager
            .issue_for_owner(f.object.id, f.object.owner_id, None, None)
            .await
            .unwrap();
        assert_eq!(link.max_access, 0);
        assert!(link.expires_at > Utc::now() + Duration::hours(167));

        let views = f
            .manager
            .list_for_object(f.object.id, f.object.owner_id)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert!(!views[0].is_expired);
        assert!(!views[0].is_permanent);
    }
}
