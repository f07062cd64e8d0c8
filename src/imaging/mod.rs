//! Image processing.
//!
//! | Operation | Rust backend | ImageMagick backend |
//! |---|---|---|
//! | **Resize** | Lanczos3 to the target width | `convert -resize {w}x` |
//! | **Thumbnail** | `resize_to_fill` | `-thumbnail WxH^ -gravity center -extent WxH` |
//! | **Sharpen** | `unsharpen` | `mogrify -unsharp` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`] + [`MagickBackend`]
//! - **Operations**: Per-photo planning and execution

pub mod backend;
mod calculations;
pub mod magick_backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use magick_backend::MagickBackend;
pub use operations::{Operation, PhotoPlan, ThumbnailConfig, VariantConfig, plan_photo};
pub use params::{Quality, ResizeParams, Sharpening, ThumbnailParams};
pub use rust_backend::RustBackend;
