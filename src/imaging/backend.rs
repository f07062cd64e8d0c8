//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the whole image capability the site needs:
//! produce a raster at a target width, and produce a fixed-box thumbnail.
//! Both apply the sharpening pass carried in their params.
//!
//! Implementations:
//! - [`RustBackend`](super::rust_backend::RustBackend) — the `image` crate,
//!   statically linked, the default.
//! - [`MagickBackend`](super::magick_backend::MagickBackend) — shells out to
//!   ImageMagick's `convert` / `mogrify` with a timeout.

use super::params::{ResizeParams, ThumbnailParams};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("{tool} could not be started: {source}")]
    ToolUnavailable {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("{tool} timed out after {secs}s", secs = .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Resize to the target width (height follows the aspect ratio), then
    /// sharpen if requested.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Fill the crop box, center crop, then sharpen if requested.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}
