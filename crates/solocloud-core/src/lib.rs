//! SoloCloud core types
//!
//! Shared domain model (stored objects, share links, storage providers),
//! configuration loading and the unified `AppError` taxonomy used by every
//! other crate in the workspace.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::{Config, StorageSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    FileCategory, ShareDenial, ShareLink, ShareLinkState, ShareLinkView, StoredObject,
};
pub use storage_types::{ProviderConfig, StorageProvider};
