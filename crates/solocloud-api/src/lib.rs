//! SoloCloud HTTP API
//!
//! Thin axum layer over the ingestion pipeline, the catalog and the share-link manager.

pub mod auth;
pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
