//! Share-link issuance, listing, revocation and public dereference.

use crate::auth::Owner;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::files::stream_from_disk;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solocloud_core::{
    AppError, FileCategory, ShareDenial, ShareLink, ShareLinkView, StorageProvider, StoredObject,
};
use solocloud_services::ShareResolution;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CreateShareRequest {
    /// Hours until expiry; 0 for a permanent link. Defaults to `SHARE_DEFAULT_TTL_HOURS`.
    pub expires_hours: Option<u32>,
    /// 0 for unlimited.
    pub max_access: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    #[serde(flatten)]
    pub link: ShareLinkView,
    pub share_url: String,
}

impl ShareResponse {
    fn new(state: &AppState, view: ShareLinkView) -> Self {
        let share_url = state.share_url(&view.link.token);
        Self {
            link: view,
            share_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SharedAccessQuery {
    /// `1` or `true` returns the bytes as an attachment instead of the landing metadata.
    pub download: Option<String>,
}

impl SharedAccessQuery {
    fn wants_download(&self) -> bool {
        matches!(self.download.as_deref(), Some("1") | Some("true"))
    }
}

/// What a recipient sees for files that are not streamed or redirected.
#[derive(Debug, Serialize)]
pub struct SharedFileResponse {
    pub name: String,
    pub category: FileCategory,
    pub mime_type: String,
    pub size_bytes: i64,
    pub access_count: i32,
    pub max_access: i32,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl SharedFileResponse {
    fn new(link: &ShareLink, object: &StoredObject, download_url: Option<String>) -> Self {
        Self {
            name: object.original_name.clone(),
            category: object.category,
            mime_type: object.mime_type.clone(),
            size_bytes: object.size_bytes,
            access_count: link.access_count,
            max_access: link.max_access,
            expires_at: link.expires_at,
            download_url,
        }
    }
}

pub async fn create_share(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateShareRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let link = state
        .shares
        .issue_for_owner(id, owner_id, request.expires_hours, request.max_access)
        .await?;

    let view = ShareLinkView::new(link, Utc::now());
    Ok((StatusCode::CREATED, Json(ShareResponse::new(&state, view))))
}

pub async fn list_shares(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let links: Vec<ShareResponse> = state
        .shares
        .list_for_object(id, owner_id)
        .await?
        .into_iter()
        .map(|view| ShareResponse::new(&state, view))
        .collect();
    Ok(Json(links))
}

pub async fn revoke_share(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Path(link_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.shares.revoke(link_id, owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /shared/{token}`: no caller identity, the token is the capability.
///
/// Every call counts as one access, including `?download=1`.
pub async fn access_shared(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(query): Query<SharedAccessQuery>,
) -> Result<Response, HttpAppError> {
    let (link, object) = match state.shares.resolve(&token).await? {
        ShareResolution::Granted { link, object } => (link, object),
        ShareResolution::Denied(ShareDenial::Revoked) => {
            return Err(AppError::NotFound("Share link not found".to_string()).into())
        }
        ShareResolution::Denied(reason) => return Ok(gone(reason)),
    };

    let download = query.wants_download();
    let inline = object.category.is_visual();

    if object.provider == StorageProvider::Local {
        if download || inline {
            let attachment = download.then_some(object.original_name.as_str());
            return stream_local(&state, &object, attachment).await;
        }
        let download_url = format!("{}?download=1", state.share_url(&token));
        return Ok(Json(SharedFileResponse::new(&link, &object, Some(download_url))).into_response());
    }

    let settings = state.settings.snapshot();
    let remote_url = state
        .registry
        .for_provider(object.provider, &settings)
        .ok()
        .and_then(|storage| storage.resolve_url(&object.path));

    if download || inline {
        match remote_url.as_deref() {
            Some(url) => return Ok(Redirect::temporary(url).into_response()),
            None if download => {
                return Err(AppError::Configuration(format!(
                    "Provider {} does not expose a URL for stored objects",
                    object.provider
                ))
                .into())
            }
            None => {}
        }
    }

    Ok(Json(SharedFileResponse::new(&link, &object, remote_url)).into_response())
}

fn gone(reason: ShareDenial) -> Response {
    let body = ErrorResponse::new(
        format!("Share link {}", reason),
        format!("SHARE_LINK_{}", reason.as_str().to_uppercase()),
    );
    (StatusCode::GONE, Json(body)).into_response()
}

async fn stream_local(
    state: &AppState,
    object: &StoredObject,
    attachment: Option<&str>,
) -> Result<Response, HttpAppError> {
    let path = object.local_path(state.upload_root());
    stream_from_disk(&path, &object.mime_type, attachment).await
}
