//! Thumbnail contract and per-category dispatch.

use async_trait::async_trait;
use solocloud_core::constants::{THUMBNAIL_DIR, THUMBNAIL_PREFIX};
use solocloud_core::{Config, FileCategory};
use std::path::Path;
use std::sync::Arc;

/// Produces a bounded-size preview of `source` at `dest`.
///
/// Implementations must not leave a file at `dest` when they fail.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, source: &Path, dest: &Path, max_size: u32) -> anyhow::Result<()>;
}

/// Thumbnail location relative to the upload root, or `None` for categories without one.
///
/// Image thumbnails keep the original name (and format); video thumbnails are JPEG.
pub fn thumbnail_relative_path(category: FileCategory, unique_name: &str) -> Option<String> {
    match category {
        FileCategory::Image => Some(format!(
            "{}/{}{}",
            THUMBNAIL_DIR, THUMBNAIL_PREFIX, unique_name
        )),
        FileCategory::Video => {
            let stem = unique_name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(unique_name);
            Some(format!(
                "{}/{}{}.jpg",
                THUMBNAIL_DIR, THUMBNAIL_PREFIX, stem
            ))
        }
        _ => None,
    }
}

/// Generators available to the pipeline, keyed by category.
#[derive(Clone, Default)]
pub struct Thumbnailer {
    image: Option<Arc<dyn ThumbnailGenerator>>,
    video: Option<Arc<dyn ThumbnailGenerator>>,
}

impl Thumbnailer {
    pub fn new(
        image: Option<Arc<dyn ThumbnailGenerator>>,
        video: Option<Arc<dyn ThumbnailGenerator>>,
    ) -> Self {
        Self { image, video }
    }

    /// Build every generator compiled into this crate.
    pub fn from_config(config: &Config) -> Self {
        #[cfg(feature = "image")]
        let image: Option<Arc<dyn ThumbnailGenerator>> = Some(Arc::new(
            crate::image::ImageThumbnailer::new(config.thumbnail_quality),
        ));
        #[cfg(not(feature = "image"))]
        let image: Option<Arc<dyn ThumbnailGenerator>> = None;

        #[cfg(feature = "video")]
        let video: Option<Arc<dyn ThumbnailGenerator>> = match crate::video::VideoThumbnailer::new(
            config.ffmpeg_path.clone(),
            config.thumbnail_quality,
        ) {
            Ok(video) => Some(Arc::new(video)),
            Err(e) => {
                tracing::warn!(error = %e, "Video thumbnails disabled");
                None
            }
        };
        #[cfg(not(feature = "video"))]
        let video: Option<Arc<dyn ThumbnailGenerator>> = None;

        #[cfg(not(any(feature = "image", feature = "video")))]
        let _ = config;

        Self { image, video }
    }

    pub fn for_category(&self, category: FileCategory) -> Option<&dyn ThumbnailGenerator> {
        match category {
            FileCategory::Image => self.image.as_deref(),
            FileCategory::Video => self.video.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_thumbnail_keeps_unique_name() {
        assert_eq!(
            thumbnail_relative_path(FileCategory::Image, "0f3a.png").as_deref(),
            Some("thumbnails/thumb_0f3a.png")
        );
    }

    #[test]
    fn video_thumbnail_is_jpeg() {
        assert_eq!(
            thumbnail_relative_path(FileCategory::Video, "9bc1.mp4").as_deref(),
            Some("thumbnails/thumb_9bc1.jpg")
        );
    }

    #[test]
    fn other_categories_have_no_thumbnail() {
        assert!(thumbnail_relative_path(FileCategory::Document, "readme").is_none());
        assert!(thumbnail_relative_path(FileCategory::Audio, "a.mp3").is_none());
        assert!(Thumbnailer::default()
            .for_category(FileCategory::Image)
            .is_none());
    }
}
