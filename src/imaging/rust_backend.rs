//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader`, format sniffed from content |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Thumbnail crop | `DynamicImage::resize_to_fill` |
//! | Sharpening | `image::imageops::unsharpen` |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode other | `DynamicImage::save_with_format`, format from the output extension |
//!
//! `unsharpen` has no amount parameter; only sigma and threshold of the
//! [`Sharpening`](super::Sharpening) pass are honoured here.

use super::backend::{BackendError, ImageBackend};
use super::calculations::scaled_height;
use super::params::{ResizeParams, Sharpening, ThumbnailParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

fn sharpen(img: DynamicImage, sharpening: Option<Sharpening>) -> DynamicImage {
    match sharpening {
        Some(s) => DynamicImage::from(image::imageops::unsharpen(
            &img,
            s.sigma,
            s.threshold_8bit(),
        )),
        None => img,
    }
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(path).map_err(|_| {
        BackendError::ProcessingFailed(format!("Unsupported output format: {}", path.display()))
    })?;

    match format {
        ImageFormat::Jpeg => save_jpeg(img, path, quality),
        other => img.save_with_format(path, other).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to encode {}: {}", path.display(), e))
        }),
    }
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100) as u8);
    // JPEG has no alpha channel.
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let height = scaled_height((img.width(), img.height()), params.width);
        let resized = img.resize_exact(params.width, height, FilterType::Lanczos3);
        let final_img = sharpen(resized, params.sharpening);
        save_image(&final_img, &params.output, params.quality.value())
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        // Fill-resize then center-crop to exact dimensions
        let filled =
            img.resize_to_fill(params.crop_width, params.crop_height, FilterType::Lanczos3);
        let final_img = sharpen(filled, params.sharpening);
        save_image(&final_img, &params.output, params.quality.value())
    }
}
