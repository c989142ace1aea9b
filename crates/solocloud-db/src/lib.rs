//! Catalog persistence for SoloCloud.
//!
//! The ingestion pipeline and share-link manager only talk to the record-shaped
//! traits in [`db::traits`]; Postgres and in-memory implementations live beside them.

pub mod db;

pub use db::memory::{InMemoryMediaCatalog, InMemoryShareLinkStore};
#[cfg(feature = "postgres")]
pub use db::postgres::{connect, run_migrations, PgMediaCatalog, PgShareLinkStore};
pub use db::traits::{
    ConsumeOutcome, ListQuery, MediaCatalog, ObjectPage, ShareLinkStore, SortField, SortOrder,
};
