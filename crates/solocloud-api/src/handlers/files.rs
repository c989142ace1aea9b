//! Upload, list, fetch and delete stored objects.

use crate::auth::Owner;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use solocloud_core::{AppError, FileCategory, StorageProvider, StorageSettings, StoredObject};
use solocloud_db::{ListQuery, SortField, SortOrder};
use solocloud_processing::{guess_mime, UploadRequest};
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};
use uuid::Uuid;

/// Form field carrying the uploaded file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct FileResponse {
    #[serde(flatten)]
    pub object: StoredObject,
    /// Direct URL when the backend exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileResponse {
    fn new(state: &AppState, settings: &StorageSettings, object: StoredObject) -> Self {
        let url = state
            .registry
            .for_provider(object.provider, settings)
            .ok()
            .and_then(|storage| storage.resolve_url(&object.path));
        Self { object, url }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub category: Option<String>,
    /// Substring of the original filename, case-insensitive.
    pub search: Option<String>,
    /// `filename`, `file_size`, `file_type` or `upload_time` (default).
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
    pub per_page: u32,
}

/// Fetch an object the caller owns. Other users' objects look absent.
pub(crate) async fn owned_object(
    state: &AppState,
    id: Uuid,
    owner_id: Uuid,
) -> Result<StoredObject, AppError> {
    state
        .catalog
        .get(id)
        .await?
        .filter(|object| object.is_owned_by(owner_id))
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))
}

/// Stream a file from the upload root. `download_name` adds an attachment disposition.
pub(crate) async fn stream_from_disk(
    path: &std::path::Path,
    mime_type: &str,
    download_name: Option<&str>,
) -> Result<Response, HttpAppError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "File missing on disk");
            return Err(AppError::NotFound("File content no longer exists".to_string()).into());
        }
        Err(e) => return Err(AppError::from(e).into()),
    };
    let length = file.metadata().await.map(|m| m.len()).ok();

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type);
    if let Some(length) = length {
        response = response.header(header::CONTENT_LENGTH, length);
    }
    if let Some(name) = download_name {
        response = response.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", name.replace('"', "")),
        );
    }

    response
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)).into())
}

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let declared_mime = field.content_type().map(str::to_string);
        let body = StreamReader::new(Box::pin(field.map_err(std::io::Error::other)));

        let settings = state.settings.snapshot();
        let object = state
            .pipeline
            .ingest(
                &settings,
                UploadRequest {
                    filename,
                    declared_mime,
                    owner_id,
                    body,
                },
            )
            .await?;

        let response = FileResponse::new(&state, &settings, object);
        return Ok((StatusCode::CREATED, Json(response)));
    }

    Err(AppError::Validation(format!("Missing '{}' field in upload", FILE_FIELD)).into())
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Query(query): Query<ListFilesQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let category = query
        .category
        .as_deref()
        .map(str::parse::<FileCategory>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Enforce maximum page size to prevent abuse
    let list = ListQuery {
        category,
        search: query.search,
        sort_by: query
            .sort_by
            .as_deref()
            .map(SortField::from_param)
            .unwrap_or_default(),
        sort_order: query
            .sort_order
            .as_deref()
            .map(SortOrder::from_param)
            .unwrap_or_default(),
        page: query.page.max(1),
        per_page: query.per_page.clamp(1, 100),
    };

    let page = state.catalog.list_for_owner(owner_id, &list).await?;
    let settings = state.settings.snapshot();
    let files = page
        .objects
        .into_iter()
        .map(|object| FileResponse::new(&state, &settings, object))
        .collect();

    Ok(Json(FileListResponse {
        files,
        total: page.total,
        pages: page.total.div_ceil(u64::from(list.per_page)),
        current_page: list.page,
        per_page: list.per_page,
    }))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let object = owned_object(&state, id, owner_id).await?;
    let settings = state.settings.snapshot();
    Ok(Json(FileResponse::new(&state, &settings, object)))
}

/// Object bytes: streamed for local objects, a redirect for remote ones with a public URL.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    let object = owned_object(&state, id, owner_id).await?;

    if object.provider == StorageProvider::Local {
        return stream_from_disk(
            &object.local_path(state.upload_root()),
            &object.mime_type,
            Some(&object.original_name),
        )
        .await;
    }

    let settings = state.settings.snapshot();
    let url = state
        .registry
        .for_provider(object.provider, &settings)?
        .resolve_url(&object.path)
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider {} does not expose a URL for stored objects",
                object.provider
            ))
        })?;
    Ok(Redirect::temporary(&url).into_response())
}

pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    let object = owned_object(&state, id, owner_id).await?;
    let (relative, path) = object
        .thumbnail_path
        .as_deref()
        .zip(object.thumbnail_local_path(state.upload_root()))
        .ok_or_else(|| AppError::NotFound("Thumbnail not found".to_string()))?;

    let mime_type = guess_mime(relative).unwrap_or("image/jpeg");
    stream_from_disk(&path, mime_type, None).await
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let object = owned_object(&state, id, owner_id).await?;
    let settings = state.settings.snapshot();
    state.pipeline.delete(&settings, &object).await?;
    Ok(StatusCode::NO_CONTENT)
}
