//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations), which decides which
//! files a photo needs, and the [`backend`](super::backend), which does the
//! pixel work. Swapping backends (pure Rust, ImageMagick, a test mock) never
//! changes the plan.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`] — Unsharp-mask pass applied after every resize.
//! - [`ResizeParams`] — Fit to a target width, height follows the aspect ratio.
//! - [`ThumbnailParams`] — Fill an exact pixel box, center crop.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Highest encode quality, used for the size variants.
    pub fn max() -> Self {
        Self(100)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Unsharp-mask parameters, in ImageMagick's `-unsharp` terms.
///
/// - `radius` / `sigma`: size of the Gaussian used for the mask
/// - `amount`: fraction of the difference added back
/// - `threshold`: minimum difference to sharpen, as a fraction of full range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub radius: f32,
    pub sigma: f32,
    pub amount: f32,
    pub threshold: f32,
}

impl Sharpening {
    /// The fixed pass applied to every thumbnail and variant.
    pub fn fine() -> Self {
        Self {
            radius: 0.25,
            sigma: 0.08,
            amount: 8.3,
            threshold: 0.045,
        }
    }

    /// `-unsharp` geometry argument: `{radius}x{sigma}+{amount}+{threshold}`.
    pub fn magick_geometry(&self) -> String {
        format!(
            "{}x{}+{}+{}",
            self.radius, self.sigma, self.amount, self.threshold
        )
    }

    /// Threshold on the 0-255 scale used by `image::imageops::unsharpen`.
    pub fn threshold_8bit(&self) -> i32 {
        (self.threshold * 255.0).round() as i32
    }
}

/// Resize preserving aspect ratio so the output is exactly `width` wide.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

/// Parameters for a thumbnail operation (resize to fill + center crop).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Final crop dimensions.
    pub crop_width: u32,
    pub crop_height: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
        assert_eq!(Quality::max().value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn fine_sharpening_geometry() {
        assert_eq!(Sharpening::fine().magick_geometry(), "0.25x0.08+8.3+0.045");
    }

    #[test]
    fn threshold_maps_to_8bit_scale() {
        assert_eq!(Sharpening::fine().threshold_8bit(), 11);
    }
}
