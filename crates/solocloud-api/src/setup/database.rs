//! Catalog backend selection.

use anyhow::Result;
use solocloud_core::Config;
use solocloud_db::{InMemoryMediaCatalog, InMemoryShareLinkStore, MediaCatalog, ShareLinkStore};
use std::sync::Arc;

pub type CatalogPair = (Arc<dyn MediaCatalog>, Arc<dyn ShareLinkStore>);

/// Postgres when `DATABASE_URL` is set, otherwise in-memory (data is lost on restart).
pub async fn setup_catalog(config: &Config) -> Result<CatalogPair> {
    match config.database_url.as_deref() {
        Some(url) => connect(url, config).await,
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory catalog");
            Ok((
                Arc::new(InMemoryMediaCatalog::new()),
                Arc::new(InMemoryShareLinkStore::new()),
            ))
        }
    }
}

#[cfg(feature = "postgres")]
async fn connect(url: &str, config: &Config) -> Result<CatalogPair> {
    use anyhow::Context;
    use solocloud_db::{PgMediaCatalog, PgShareLinkStore};

    let pool = solocloud_db::connect(url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    solocloud_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected and migrations applied"
    );

    Ok((
        Arc::new(PgMediaCatalog::new(pool.clone())),
        Arc::new(PgShareLinkStore::new(pool)),
    ))
}

#[cfg(not(feature = "postgres"))]
async fn connect(_url: &str, _config: &Config) -> Result<CatalogPair> {
    Err(anyhow::anyhow!(
        "DATABASE_URL is set but Postgres support is not compiled in (postgres feature not enabled)"
    ))
}
