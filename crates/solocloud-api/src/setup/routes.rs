//! Route configuration and setup

use crate::constants::{API_BASE, SHARED_BASE};
use crate::handlers::{files, health, shares, storage};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use solocloud_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config);

    let api_routes = Router::new()
        .route("/upload", post(files::upload_file))
        .route("/files", get(files::list_files))
        .route("/files/{id}", get(files::get_file).delete(files::delete_file))
        .route("/files/{id}/content", get(files::download_file))
        .route("/files/{id}/thumbnail", get(files::get_thumbnail))
        .route("/files/{id}/share", post(shares::create_share))
        .route("/files/{id}/shares", get(shares::list_shares))
        .route("/shares/{id}", delete(shares::revoke_share))
        .route("/storage/providers", get(storage::list_providers))
        .route("/storage/test", post(storage::test_connection));

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);

    let app = Router::new()
        .nest(API_BASE, api_routes)
        .route(&format!("{}/{{token}}", SHARED_BASE), get(shares::access_shared))
        .route("/health", get(health::health_check))
        // Multipart uploads are bounded by RequestBodyLimitLayer instead of axum's 2 MB default.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if config.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
