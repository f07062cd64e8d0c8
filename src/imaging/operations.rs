//! High-level image operations.
//!
//! Turns a [`Photo`] into the list of backend calls it needs: one thumbnail
//! and one resize per configured width, all written into the photo's asset
//! directory. Planning is pure; execution walks the plan in order and stops
//! at the first failure.

use super::backend::{BackendError, ImageBackend};
use super::params::{Quality, ResizeParams, Sharpening, ThumbnailParams};
use crate::config::SiteConfig;
use crate::photo::Photo;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for thumbnail generation.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 65,
            quality: Quality::default(),
            sharpening: Some(Sharpening::fine()),
        }
    }
}

/// Configuration for the size variants.
#[derive(Debug, Clone)]
pub struct VariantConfig {
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            quality: Quality::max(),
            sharpening: Some(Sharpening::fine()),
        }
    }
}

impl ThumbnailConfig {
    pub fn from_site_config(config: &SiteConfig) -> Self {
        Self {
            width: config.thumbnail.width,
            height: config.thumbnail.height,
            ..Self::default()
        }
    }
}

/// One backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Thumbnail(ThumbnailParams),
    Resize(ResizeParams),
}

impl Operation {
    pub fn output(&self) -> &Path {
        match self {
            Operation::Thumbnail(p) => &p.output,
            Operation::Resize(p) => &p.output,
        }
    }

    /// Short display label: `thumbnail` or `800px`.
    pub fn label(&self) -> String {
        match self {
            Operation::Thumbnail(_) => "thumbnail".to_string(),
            Operation::Resize(p) => format!("{}px", p.width),
        }
    }

    pub fn execute<B: ImageBackend + ?Sized>(&self, backend: &B) -> Result<()> {
        match self {
            Operation::Thumbnail(p) => backend.thumbnail(p),
            Operation::Resize(p) => backend.resize(p),
        }
    }
}

/// Everything one photo needs, in execution order (thumbnail first).
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoPlan {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub operations: Vec<Operation>,
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(source: &Path, output: &Path, config: &ThumbnailConfig) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        crop_width: config.width,
        crop_height: config.height,
        quality: config.quality,
        sharpening: config.sharpening,
    }
}

/// Plan all operations for a photo.
///
/// `source_images` is the directory holding originals; `site_root` is the
/// output root that `images/{id}/` lives under.
pub fn plan_photo(
    photo: &Photo,
    source_images: &Path,
    site_root: &Path,
    thumbnail: &ThumbnailConfig,
    variants: &VariantConfig,
) -> PhotoPlan {
    let source = source_images.join(&photo.filename);
    let output_dir = site_root.join(photo.asset_dir());

    let mut operations = vec![Operation::Thumbnail(plan_thumbnail(
        &source,
        &site_root.join(photo.thumb_path()),
        thumbnail,
    ))];
    operations.extend(photo.widths.iter().map(|width| {
        Operation::Resize(ResizeParams {
            source: source.clone(),
            output: site_root.join(photo.variant_path(*width)),
            width: *width,
            quality: variants.quality,
            sharpening: variants.sharpening,
        })
    }));

    PhotoPlan {
        source,
        output_dir,
        operations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::store::PhotoId;

    fn photo() -> Photo {
        Photo {
            id: PhotoId::new(3),
            alt: "Mon, 02 Jan 2006".to_string(),
            filename: "fog.jpg".to_string(),
            prev_id: None,
            next_id: None,
            widths: vec![1200, 800, 400],
        }
    }

    fn plan() -> PhotoPlan {
        plan_photo(
            &photo(),
            Path::new("/site/images"),
            Path::new("/public"),
            &ThumbnailConfig::default(),
            &VariantConfig::default(),
        )
    }

    #[test]
    fn plan_has_thumbnail_then_each_width() {
        let plan = plan();
        let labels: Vec<String> = plan.operations.iter().map(Operation::label).collect();
        assert_eq!(labels, vec!["thumbnail", "1200px", "800px", "400px"]);
        assert_eq!(plan.source, Path::new("/site/images/fog.jpg"));
        assert_eq!(plan.output_dir, Path::new("/public/images/3"));
    }

    #[test]
    fn plan_output_names() {
        let outputs: Vec<PathBuf> = plan()
            .operations
            .iter()
            .map(|op| op.output().to_path_buf())
            .collect();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("/public/images/3/thumb_fog.jpg"),
                PathBuf::from("/public/images/3/1200_fog.jpg"),
                PathBuf::from("/public/images/3/800_fog.jpg"),
                PathBuf::from("/public/images/3/400_fog.jpg"),
            ]
        );
    }

    #[test]
    fn plan_thumbnail_uses_box() {
        let config = ThumbnailConfig {
            width: 150,
            height: 100,
            ..ThumbnailConfig::default()
        };
        let params = plan_thumbnail(Path::new("/a.jpg"), Path::new("/thumb_a.jpg"), &config);
        assert_eq!((params.crop_width, params.crop_height), (150, 100));
        assert_eq!(params.sharpening, Some(Sharpening::fine()));
    }

    #[test]
    fn variants_use_max_quality_and_sharpening() {
        for op in &plan().operations[1..] {
            let Operation::Resize(params) = op else {
                panic!("expected resize, got {op:?}");
            };
            assert_eq!(params.quality, Quality::max());
            assert!(params.sharpening.is_some());
        }
    }

    #[test]
    fn execute_dispatches_to_backend() {
        let backend = MockBackend::new();
        for op in &plan().operations {
            op.execute(&backend).unwrap();
        }
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 4);
        assert!(matches!(
            &ops[0],
            RecordedOp::Thumbnail {
                crop_width: 100,
                crop_height: 65,
                quality: 90,
                ..
            }
        ));
        assert!(matches!(
            &ops[1],
            RecordedOp::Resize {
                width: 1200,
                quality: 100,
                sharpened: true,
                ..
            }
        ));
    }
}
