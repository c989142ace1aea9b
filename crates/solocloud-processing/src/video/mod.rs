//! Video thumbnails via FFmpeg frame grab.

use crate::image::encode_thumbnail;
use crate::thumbnail::ThumbnailGenerator;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

/// Grabs the first decodable frame with FFmpeg, then shrinks it like an image.
#[derive(Debug, Clone)]
pub struct VideoThumbnailer {
    ffmpeg_path: String,
    quality: u8,
}

impl VideoThumbnailer {
    pub fn new(ffmpeg_path: String, quality: u8) -> Result<Self> {
        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        if ffmpeg_path.trim().is_empty() {
            return Err(anyhow!("Invalid ffmpeg_path: empty"));
        }
        if ffmpeg_path.chars().any(|c| dangerous_chars.contains(&c)) {
            return Err(anyhow!(
                "Invalid ffmpeg_path: contains dangerous characters"
            ));
        }

        Ok(Self {
            ffmpeg_path,
            quality: quality.clamp(1, 100),
        })
    }

    async fn extract_frame(&self, source: &Path, frame: &Path) -> Result<()> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-v")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-frames:v")
            .arg("1")
            .arg(frame)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("FFmpeg frame extraction failed: {}", stderr.trim()));
        }

        let written = tokio::fs::metadata(frame)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(anyhow!("FFmpeg produced no frame for {}", source.display()));
        }
        Ok(())
    }
}

#[async_trait]
impl ThumbnailGenerator for VideoThumbnailer {
    async fn generate(&self, source: &Path, dest: &Path, max_size: u32) -> Result<()> {
        let start = std::time::Instant::now();
        let work_dir = TempDir::new().context("Failed to create temp directory")?;
        let frame_path = work_dir.path().join("frame.png");

        self.extract_frame(source, &frame_path).await?;

        let dest_owned: PathBuf = dest.to_path_buf();
        let quality = self.quality;
        let (width, height) = tokio::task::spawn_blocking(move || {
            let frame = image::open(&frame_path).context("Failed to decode extracted frame")?;
            encode_thumbnail(frame, &dest_owned, max_size, quality)
        })
        .await
        .context("Thumbnail task panicked")??;

        tracing::debug!(
            dest = %dest.display(),
            width,
            height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video thumbnail generated"
        );
        Ok(())
    }
}
