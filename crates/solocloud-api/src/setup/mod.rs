//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use crate::state::{AppState, SettingsSource};
use anyhow::{Context, Result};
use solocloud_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(&config);

    tokio::fs::create_dir_all(&config.upload_folder)
        .await
        .with_context(|| {
            format!(
                "Failed to create upload folder {}",
                config.upload_folder.display()
            )
        })?;

    let (catalog, links) = database::setup_catalog(&config).await?;

    let settings = SettingsSource::Env;
    tracing::info!(
        active_provider = %settings.snapshot().active_id(),
        upload_folder = %config.upload_folder.display(),
        "Configuration loaded"
    );

    let state = Arc::new(AppState::new(config.clone(), catalog, links, settings));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
