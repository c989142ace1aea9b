//! Test fixtures: small media blobs.

use image::{ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;

/// PNG of the given dimensions with a simple gradient.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test PNG");
    bytes
}

pub fn create_test_text() -> Vec<u8> {
    b"solocloud integration test document\n".to_vec()
}
