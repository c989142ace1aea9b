//! Media processing for SoloCloud uploads.
//!
//! - [`classifier`]: filename → category, subfolder and MIME type.
//! - [`thumbnail`]: bounded previews for images and videos.
//! - [`upload`]: the ingestion pipeline tying classification, staging, thumbnailing,
//!   backend upload and cataloging together.

pub mod classifier;
#[cfg(feature = "image")]
pub mod image;
pub mod thumbnail;
pub mod upload;
#[cfg(feature = "video")]
pub mod video;

pub use classifier::{classify, extension_of, guess_mime, resolve_mime};
#[cfg(feature = "image")]
pub use crate::image::ImageThumbnailer;
pub use thumbnail::{thumbnail_relative_path, ThumbnailGenerator, Thumbnailer};
pub use upload::{
    sanitize_filename, unique_storage_name, IngestionPipeline, UploadRequest,
};
#[cfg(feature = "video")]
pub use crate::video::VideoThumbnailer;
