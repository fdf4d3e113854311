use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Unsupported or corrupt image: {0}")]
    Decode(String),
    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),
    #[error("Thumbnail task failed: {0}")]
    Task(String),
}

/// An encoded thumbnail
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Derives thumbnails that fit inside a `max_width` x `max_height` box.
#[derive(Debug, Clone, Copy)]
pub struct Thumbnailer {
    pub max_width: u32,
    pub max_height: u32,
}

impl Thumbnailer {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Decode and resize on the blocking pool.
    pub async fn derive(&self, source: Bytes) -> Result<Thumbnail, ThumbnailError> {
        let this = *self;
        tokio::task::spawn_blocking(move || {
            derive_thumbnail(&source, this.max_width, this.max_height)
        })
        .await
        .map_err(|e| ThumbnailError::Task(e.to_string()))?
    }
}

/// Resize `source` to fit inside the box, keeping aspect ratio.
///
/// Images already inside the box keep their size. JPEG sources produce a
/// JPEG thumbnail; everything else is re-encoded as PNG.
pub fn derive_thumbnail(
    source: &[u8],
    max_width: u32,
    max_height: u32,
) -> Result<Thumbnail, ThumbnailError> {
    let format = image::guess_format(source).map_err(|e| ThumbnailError::Decode(e.to_string()))?;
    let img = image::load_from_memory_with_format(source, format)
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

    let (width, height) = fit_within(img.width(), img.height(), max_width, max_height);
    let resized = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.thumbnail_exact(width, height)
    };

    let (out_format, content_type, extension) = match format {
        ImageFormat::Jpeg => (ImageFormat::Jpeg, "image/jpeg", "jpg"),
        _ => (ImageFormat::Png, "image/png", "png"),
    };

    let data = encode(&resized, out_format)?;
    Ok(Thumbnail {
        data,
        width,
        height,
        content_type,
        extension,
    })
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ThumbnailError> {
    // JPEG has no alpha channel
    let img = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img.clone()
    };

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Largest size with the same aspect ratio that fits the box. Never upscales,
/// never returns a zero dimension.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(400, 200, 200, 200), (200, 100));
        assert_eq!(fit_within(200, 400, 200, 200), (100, 200));
        assert_eq!(fit_within(800, 800, 200, 200), (200, 200));
        assert_eq!(fit_within(100, 50, 200, 200), (100, 50));
        assert_eq!(fit_within(3000, 1, 200, 200), (200, 1));
    }

    #[test]
    fn test_png_thumbnail_keeps_aspect_ratio() {
        let thumb = derive_thumbnail(&png(400, 200), 200, 200).unwrap();
        assert_eq!((thumb.width, thumb.height), (200, 100));
        assert_eq!(thumb.content_type, "image/png");

        let decoded = image::load_from_memory(&thumb.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[test]
    fn test_jpeg_stays_jpeg() {
        let thumb = derive_thumbnail(&jpeg(600, 300), 200, 200).unwrap();
        assert_eq!(thumb.content_type, "image/jpeg");
        assert_eq!(thumb.extension, "jpg");
        assert_eq!(
            image::guess_format(&thumb.data).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let thumb = derive_thumbnail(&png(50, 20), 200, 200).unwrap();
        assert_eq!((thumb.width, thumb.height), (50, 20));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            derive_thumbnail(b"definitely not an image", 200, 200),
            Err(ThumbnailError::Decode(_))
        ));
    }
}
