//! Upload ingestion: name → classify → stage → thumbnail → upload → catalog.

mod naming;
mod pipeline;

pub use naming::{sanitize_filename, unique_storage_name};
pub use pipeline::{IngestionPipeline, UploadRequest};
