//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs against the in-memory catalog and a temporary upload folder,
//! so no database or network is needed.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use solocloud_api::constants::{API_BASE, USER_ID_HEADER};
use solocloud_api::setup::routes;
use solocloud_api::state::{AppState, SettingsSource};
use solocloud_core::{Config, StorageSettings};
use solocloud_db::{InMemoryMediaCatalog, InMemoryShareLinkStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// API path prefix for tests (e.g. `/api/files`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_BASE, path)
}

/// Test application: server, catalog handle, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub catalog: InMemoryMediaCatalog,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn upload_root(&self) -> &Path {
        self._temp_dir.path()
    }
}

/// Setup test app with local storage as the active provider.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_settings(StorageSettings::default()).await
}

pub async fn setup_test_app_with_settings(settings: StorageSettings) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let config = Config {
        upload_folder: temp_dir.path().to_path_buf(),
        ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
        ..Config::default()
    };

    let catalog = InMemoryMediaCatalog::new();
    let state = AppState::new(
        config.clone(),
        Arc::new(catalog.clone()),
        Arc::new(InMemoryShareLinkStore::new()),
        SettingsSource::Fixed(settings),
    );

    let app = routes::setup_routes(&config, Arc::new(state)).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        catalog,
        _temp_dir: temp_dir,
    }
}

/// POST a single file as the `file` form field.
pub async fn upload(
    client: &TestServer,
    owner: Uuid,
    file_name: &str,
    mime_type: &str,
    bytes: Vec<u8>,
) -> TestResponse {
    let part = Part::bytes(bytes).file_name(file_name).mime_type(mime_type);
    client
        .post(&api_path("/upload"))
        .add_header(USER_ID_HEADER, owner.to_string())
        .multipart(MultipartForm::new().add_part("file", part))
        .await
}

/// Upload and return the created record.
pub async fn upload_ok(
    client: &TestServer,
    owner: Uuid,
    file_name: &str,
    mime_type: &str,
    bytes: Vec<u8>,
) -> serde_json::Value {
    let response = upload(client, owner, file_name, mime_type, bytes).await;
    assert_eq!(response.status_code(), 201, "upload failed: {}", response.text());
    response.json()
}

pub fn id_of(value: &serde_json::Value) -> Uuid {
    Uuid::parse_str(
        value
            .get("id")
            .and_then(|v| v.as_str())
            .expect("Expected 'id' in response"),
    )
    .expect("Invalid UUID in response")
}
