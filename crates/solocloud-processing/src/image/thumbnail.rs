use crate::thumbnail::ThumbnailGenerator;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Image thumbnails: decode, shrink to fit, re-encode.
#[derive(Debug, Clone)]
pub struct ImageThumbnailer {
    quality: u8,
}

impl ImageThumbnailer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

/// Largest size with the same aspect ratio that fits in `max × max`. Never upscales.
pub fn fit_within(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width <= max_size && height <= max_size {
        return (width, height);
    }
    let scale = (max_size as f64 / width as f64).min(max_size as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_size);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_size);
    (w, h)
}

/// Choose resize filter by downscale ratio (higher ratio = faster filter).
pub fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Resize `img` and write it to `dest` in the format its extension names (JPEG when
/// unknown). The file only appears at `dest` once fully encoded.
///
/// Returns the thumbnail dimensions.
pub fn encode_thumbnail(img: DynamicImage, dest: &Path, max_size: u32, quality: u8) -> Result<(u32, u32)> {
    let (width, height) = img.dimensions();
    let (thumb_width, thumb_height) = fit_within(width, height, max_size);

    let thumb = if (thumb_width, thumb_height) == (width, height) {
        img
    } else {
        let filter = select_filter(width, height, thumb_width, thumb_height);
        img.resize_exact(thumb_width, thumb_height, filter)
    };

    let format = ImageFormat::from_path(dest).unwrap_or(ImageFormat::Jpeg);
    let dir = dest
        .parent()
        .ok_or_else(|| anyhow!("Thumbnail path has no parent: {}", dest.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".thumb-")
        .tempfile_in(dir)
        .context("Failed to create temporary thumbnail file")?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        match format {
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(thumb.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
                    .context("Failed to encode JPEG thumbnail")?;
            }
            ImageFormat::Png | ImageFormat::Tiff => thumb
                .write_to(&mut writer, format)
                .with_context(|| format!("Failed to encode {:?} thumbnail", format))?,
            other => DynamicImage::ImageRgba8(thumb.to_rgba8())
                .write_to(&mut writer, other)
                .with_context(|| format!("Failed to encode {:?} thumbnail", other))?,
        }
        writer.flush()?;
    }

    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move thumbnail into {}", dest.display()))?;

    Ok((thumb_width, thumb_height))
}

fn decode(source: &Path) -> Result<DynamicImage> {
    ImageReader::open(source)
        .with_context(|| format!("Failed to open {}", source.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Failed to decode image {}", source.display()))
}

#[async_trait]
impl ThumbnailGenerator for ImageThumbnailer {
    async fn generate(&self, source: &Path, dest: &Path, max_size: u32) -> Result<()> {
        let source: PathBuf = source.to_path_buf();
        let dest_owned: PathBuf = dest.to_path_buf();
        let quality = self.quality;
        let start = std::time::Instant::now();

        let (width, height) = tokio::task::spawn_blocking(move || {
            let img = decode(&source)?;
            encode_thumbnail(img, &dest_owned, max_size, quality)
        })
        .await
        .context("Thumbnail task panicked")??;

        tracing::debug!(
            dest = %dest.display(),
            width,
            height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image thumbnail generated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 255) as u8, (y % 255) as u8, 128]));
        img.save(path).unwrap();
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        assert_eq!(fit_within(800, 400, 200), (200, 100));
        assert_eq!(fit_within(300, 1200, 200), (50, 200));
        assert_eq!(fit_within(4000, 1, 200), (200, 1));
    }

    #[test]
    fn fit_within_never_upscales() {
        assert_eq!(fit_within(50, 50, 200), (50, 50));
        assert_eq!(fit_within(200, 10, 200), (200, 10));
    }

    #[tokio::test]
    async fn large_image_is_shrunk_within_bounds() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("big.png");
        let dest = dir.path().join("thumbnails/thumb_big.png");
        write_png(&src, 640, 480);

        ImageThumbnailer::new(85)
            .generate(&src, &dest, 200)
            .await
            .unwrap();

        let thumb = image::open(&dest).unwrap();
        assert_eq!(thumb.dimensions(), (200, 150));
    }

    #[tokio::test]
    async fn small_image_keeps_its_size() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("small.png");
        let dest = dir.path().join("thumb_small.jpg");
        write_png(&src, 50, 50);

        ImageThumbnailer::new(85)
            .generate(&src, &dest, 200)
            .await
            .unwrap();

        let thumb = image::open(&dest).unwrap();
        assert_eq!(thumb.dimensions(), (50, 50));
    }

    #[tokio::test]
    async fn undecodable_input_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("fake.png");
        let dest = dir.path().join("thumb_fake.png");
        std::fs::write(&src, b"definitely not a png").unwrap();

        let result = ImageThumbnailer::new(85).generate(&src, &dest, 200).await;
        assert!(result.is_err());
        assert!(!dest.exists());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
