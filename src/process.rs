//! Image variant generation.
//!
//! Runs between loading the photos and rendering pages. For every photo the
//! plan from [`plan_photo`] is executed: one fixed-box thumbnail and one
//! resize per configured width, all under `{dst}/images/{id}/`.
//!
//! ## Output Structure
//!
//! ```text
//! public/images/
//! ├── 1/
//! │   ├── thumb_harbour.jpg      # 100x65 center crop, sharpened
//! │   ├── 1200_harbour.jpg       # one per configured width
//! │   ├── 800_harbour.jpg
//! │   └── 400_harbour.jpg
//! └── 2/
//!     └── ...
//! ```
//!
//! ## Parallel Processing
//!
//! Photos are independent, so they are processed in parallel on a local
//! [rayon](https://docs.rs/rayon) pool sized by `max_processes`. Within a
//! photo the operations run in order.
//!
//! ## Failures
//!
//! A failing variant stops the remaining variants of that photo only. Every
//! other photo still runs, and the failure is returned in the
//! [`ProcessReport`] so the caller can render pages and then report the
//! incomplete photos. Setting the cancel flag stops photos that have not
//! started yet; they are reported as cancelled.

use crate::config::{self, SiteConfig};
use crate::imaging::{
    BackendError, ImageBackend, PhotoPlan, ThumbnailConfig, VariantConfig, plan_photo,
};
use crate::photo::Photo;
use crate::store::PhotoId;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single photo is incomplete.
#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("source image not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{label} failed: {source}")]
    Backend {
        label: String,
        #[source]
        source: BackendError,
    },
    #[error("cancelled before start")]
    Cancelled,
}

/// A photo whose variants were not all written.
#[derive(Debug)]
pub struct PhotoFailure {
    pub id: PhotoId,
    pub filename: String,
    pub error: PhotoError,
}

/// Configuration for image processing
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub thumbnail: ThumbnailConfig,
    pub variants: VariantConfig,
    pub threads: usize,
}

impl ProcessOptions {
    /// Build a ProcessOptions from SiteConfig values.
    pub fn from_site_config(config: &SiteConfig) -> Self {
        Self {
            thumbnail: ThumbnailConfig::from_site_config(config),
            variants: VariantConfig::default(),
            threads: config::effective_threads(config),
        }
    }
}

/// Progress events emitted while processing.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started {
        photo_count: usize,
    },
    PhotoProcessed {
        id: PhotoId,
        filename: String,
        variants: Vec<VariantInfo>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantInfo {
    /// `thumbnail` or `{width}px`.
    pub label: String,
    pub status: VariantStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    Encoded,
    Failed,
    /// Not attempted: an earlier step of the same photo failed, or the
    /// build was cancelled.
    Skipped,
}

/// Outcome of a full generation pass.
#[derive(Debug, Default)]
pub struct ProcessReport {
    pub photos: usize,
    pub variants_written: usize,
    /// In ascending ID order.
    pub failures: Vec<PhotoFailure>,
}

impl ProcessReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<PhotoId> {
        self.failures.iter().map(|f| f.id).collect()
    }
}

struct PhotoOutcome {
    variants: Vec<VariantInfo>,
    error: Option<PhotoError>,
}

impl PhotoOutcome {
    /// Every planned variant marked skipped.
    fn skipped(plan: &PhotoPlan, error: PhotoError) -> Self {
        Self {
            variants: plan
                .operations
                .iter()
                .map(|op| VariantInfo {
                    label: op.label(),
                    status: VariantStatus::Skipped,
                })
                .collect(),
            error: Some(error),
        }
    }
}

/// Ask a running [`generate_images`] to stop before its next photo.
///
/// Returns `true` when cancellation had already been requested.
pub fn request_cancel(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}

/// Generate the thumbnail and size variants for every photo.
///
/// `source_images` holds the originals; `site_root` is the build destination.
/// Only a worker pool that cannot be built is an `Err`; per-photo problems
/// land in [`ProcessReport::failures`].
pub fn generate_images<B: ImageBackend + ?Sized>(
    backend: &B,
    photos: &[Photo],
    source_images: &Path,
    site_root: &Path,
    options: &ProcessOptions,
    cancel: &AtomicBool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessReport, ProcessError> {
    // The subscriber is scoped to the calling thread; carry it onto the workers.
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .spawn_handler(move |thread| {
            let dispatch = dispatch.clone();
            std::thread::Builder::new()
                .name(format!("photolog-image-{}", thread.index()))
                .spawn(move || tracing::dispatcher::with_default(&dispatch, || thread.run()))?;
            Ok(())
        })
        .build()?;

    info!(
        photos = photos.len(),
        threads = options.threads,
        "generating image variants"
    );
    if let Some(tx) = &progress {
        // A dropped receiver only means nobody is watching.
        let _ = tx.send(ProcessEvent::Started {
            photo_count: photos.len(),
        });
    }

    let outcomes: Vec<PhotoOutcome> = pool.install(|| {
        photos
            .par_iter()
            .map_with(progress, |tx, photo| {
                let plan = plan_photo(
                    photo,
                    source_images,
                    site_root,
                    &options.thumbnail,
                    &options.variants,
                );
                let outcome = process_photo(backend, photo.id, &plan, cancel);
                if let Some(tx) = tx {
                    let _ = tx.send(ProcessEvent::PhotoProcessed {
                        id: photo.id,
                        filename: photo.filename.clone(),
                        variants: outcome.variants.clone(),
                    });
                }
                outcome
            })
            .collect()
    });

    let mut report = ProcessReport {
        photos: photos.len(),
        ..ProcessReport::default()
    };
    for (photo, outcome) in photos.iter().zip(outcomes) {
        report.variants_written += outcome
            .variants
            .iter()
            .filter(|v| v.status == VariantStatus::Encoded)
            .count();
        if let Some(error) = outcome.error {
            report.failures.push(PhotoFailure {
                id: photo.id,
                filename: photo.filename.clone(),
                error,
            });
        }
    }

    if report.is_complete() {
        info!(variants = report.variants_written, "image variants complete");
    } else {
        warn!(
            failed = report.failures.len(),
            "some photos have incomplete image assets"
        );
    }
    Ok(report)
}

fn process_photo<B: ImageBackend + ?Sized>(
    backend: &B,
    id: PhotoId,
    plan: &PhotoPlan,
    cancel: &AtomicBool,
) -> PhotoOutcome {
    if cancel.load(Ordering::SeqCst) {
        debug!(photo_id = %id, "cancelled");
        return PhotoOutcome::skipped(plan, PhotoError::Cancelled);
    }
    if !plan.source.is_file() {
        warn!(photo_id = %id, path = %plan.source.display(), "source image not found");
        return PhotoOutcome::skipped(plan, PhotoError::SourceNotFound(plan.source.clone()));
    }
    if let Err(e) = std::fs::create_dir_all(&plan.output_dir) {
        warn!(photo_id = %id, path = %plan.output_dir.display(), error = %e, "cannot create asset directory");
        return PhotoOutcome::skipped(plan, PhotoError::Io(e));
    }

    let mut variants = Vec::with_capacity(plan.operations.len());
    let mut error = None;
    for op in &plan.operations {
        let label = op.label();
        if error.is_some() {
            variants.push(VariantInfo {
                label,
                status: VariantStatus::Skipped,
            });
            continue;
        }
        match op.execute(backend) {
            Ok(()) => {
                debug!(photo_id = %id, variant = %label, path = %op.output().display(), "encoded");
                variants.push(VariantInfo {
                    label,
                    status: VariantStatus::Encoded,
                });
            }
            Err(source) => {
                warn!(photo_id = %id, variant = %label, error = %source, "variant failed");
                variants.push(VariantInfo {
                    label: label.clone(),
                    status: VariantStatus::Failed,
                });
                error = Some(PhotoError::Backend { label, source });
            }
        }
    }
    PhotoOutcome { variants, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn photo(id: u32, filename: &str) -> Photo {
        Photo {
            id: PhotoId::new(id),
            alt: "Mon, 02 Jan 2006".to_string(),
            filename: filename.to_string(),
            prev_id: None,
            next_id: None,
            widths: vec![800, 400],
        }
    }

    fn options() -> ProcessOptions {
        ProcessOptions {
            thumbnail: ThumbnailConfig::default(),
            variants: VariantConfig::default(),
            threads: 2,
        }
    }

    /// Source directory holding empty originals; the mock never reads them.
    fn sources(names: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for name in names {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        tmp
    }

    fn run(
        backend: &MockBackend,
        photos: &[Photo],
        src: &Path,
        dst: &Path,
        cancel: bool,
    ) -> ProcessReport {
        generate_images(
            backend,
            photos,
            src,
            dst,
            &options(),
            &AtomicBool::new(cancel),
            None,
        )
        .unwrap()
    }

    #[test]
    fn options_from_site_config() {
        let config = crate::test_helpers::site_config();
        let options = ProcessOptions::from_site_config(&config);
        assert_eq!(options.thumbnail.width, 100);
        assert_eq!(options.thumbnail.height, 65);
        assert_eq!(options.variants.quality.value(), 100);
        assert!(options.threads >= 1);
    }

    #[test]
    fn every_photo_gets_thumbnail_and_variants() {
        let src = sources(&["a.jpg", "b.jpg"]);
        let dst = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let photos = vec![photo(1, "a.jpg"), photo(2, "b.jpg")];

        let report = run(&backend, &photos, src.path(), dst.path(), false);

        assert!(report.is_complete());
        assert_eq!(report.photos, 2);
        assert_eq!(report.variants_written, 6);
        assert!(dst.path().join("images/1").is_dir());
        assert!(dst.path().join("images/2").is_dir());

        let mut outputs: Vec<String> = backend
            .get_operations()
            .iter()
            .map(|op| op.output().to_string())
            .collect();
        outputs.sort();
        let expected: Vec<String> = [
            "images/1/400_a.jpg",
            "images/1/800_a.jpg",
            "images/1/thumb_a.jpg",
            "images/2/400_b.jpg",
            "images/2/800_b.jpg",
            "images/2/thumb_b.jpg",
        ]
        .iter()
        .map(|p| dst.path().join(p).to_string_lossy().to_string())
        .collect();
        assert_eq!(outputs, expected);
    }

    #[test]
    fn failure_is_collected_and_other_photos_continue() {
        let src = sources(&["a.jpg", "b.jpg", "c.jpg"]);
        let dst = TempDir::new().unwrap();
        let backend = MockBackend::failing_on(&["800_b.jpg"]);
        let photos = vec![photo(1, "a.jpg"), photo(2, "b.jpg"), photo(3, "c.jpg")];

        let report = run(&backend, &photos, src.path(), dst.path(), false);

        assert_eq!(report.failed_ids(), vec![PhotoId::new(2)]);
        assert!(matches!(
            &report.failures[0].error,
            PhotoError::Backend { label, .. } if label == "800px"
        ));
        // Photo 2 stops after the failing variant; 400px is never attempted.
        let ops = backend.get_operations();
        assert!(!ops.iter().any(|op| op.output().ends_with("400_b.jpg")));
        assert!(ops.iter().any(|op| op.output().ends_with("400_c.jpg")));
        assert_eq!(report.variants_written, 3 + 1 + 3);
    }

    #[test]
    fn missing_source_is_reported_without_backend_calls() {
        let src = sources(&["a.jpg"]);
        let dst = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let photos = vec![photo(1, "a.jpg"), photo(2, "gone.jpg")];

        let report = run(&backend, &photos, src.path(), dst.path(), false);

        assert_eq!(report.failed_ids(), vec![PhotoId::new(2)]);
        assert!(matches!(
            report.failures[0].error,
            PhotoError::SourceNotFound(_)
        ));
        assert!(
            backend
                .get_operations()
                .iter()
                .all(|op| !op.output().contains("gone.jpg"))
        );
    }

    #[test]
    fn cancelled_run_touches_nothing() {
        let src = sources(&["a.jpg", "b.jpg"]);
        let dst = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let photos = vec![photo(1, "a.jpg"), photo(2, "b.jpg")];

        let report = run(&backend, &photos, src.path(), dst.path(), true);

        assert_eq!(report.failures.len(), 2);
        assert!(
            report
                .failures
                .iter()
                .all(|f| matches!(f.error, PhotoError::Cancelled))
        );
        assert!(backend.get_operations().is_empty());
        assert!(!dst.path().join("images").exists());
    }

    #[test]
    fn request_cancel_reports_repeat_requests() {
        let cancel = AtomicBool::new(false);
        assert!(!request_cancel(&cancel));
        assert!(cancel.load(Ordering::SeqCst));
        assert!(request_cancel(&cancel));
    }

    #[test]
    fn cancel_requested_mid_run_stops_remaining_photos() {
        struct CancelAfterFirst<'a> {
            inner: MockBackend,
            cancel: &'a AtomicBool,
        }
        impl ImageBackend for CancelAfterFirst<'_> {
            fn resize(&self, params: &crate::imaging::ResizeParams) -> Result<(), BackendError> {
                self.inner.resize(params)
            }
            fn thumbnail(
                &self,
                params: &crate::imaging::ThumbnailParams,
            ) -> Result<(), BackendError> {
                request_cancel(self.cancel);
                self.inner.thumbnail(params)
            }
        }

        let names = ["a.jpg", "b.jpg", "c.jpg", "d.jpg"];
        let src = sources(&names);
        let dst = TempDir::new().unwrap();
        let cancel = AtomicBool::new(false);
        let backend = CancelAfterFirst {
            inner: MockBackend::new(),
            cancel: &cancel,
        };
        let photos: Vec<Photo> = (1..=4).zip(names).map(|(id, n)| photo(id, n)).collect();
        let mut opts = options();
        opts.threads = 1;

        let report = generate_images(
            &backend,
            &photos,
            src.path(),
            dst.path(),
            &opts,
            &cancel,
            None,
        )
        .unwrap();

        // The photo in flight finishes; nothing after it starts.
        assert_eq!(report.photos, 4);
        assert_eq!(report.failures.len(), 3);
        assert!(
            report
                .failures
                .iter()
                .all(|f| matches!(f.error, PhotoError::Cancelled))
        );
        assert_eq!(report.variants_written, 3);
    }

    #[test]
    fn empty_photo_list_is_complete() {
        let dst = TempDir::new().unwrap();
        let report = run(&MockBackend::new(), &[], dst.path(), dst.path(), false);
        assert!(report.is_complete());
        assert_eq!(report.variants_written, 0);
    }

    #[test]
    fn progress_events_cover_every_photo() {
        let src = sources(&["a.jpg", "b.jpg"]);
        let dst = TempDir::new().unwrap();
        let backend = MockBackend::failing_on(&["thumb_b.jpg"]);
        let photos = vec![photo(1, "a.jpg"), photo(2, "b.jpg")];
        let (tx, rx) = mpsc::channel();

        generate_images(
            &backend,
            &photos,
            src.path(),
            dst.path(),
            &options(),
            &AtomicBool::new(false),
            Some(tx),
        )
        .unwrap();

        let events: Vec<ProcessEvent> = rx.iter().collect();
        assert!(matches!(
            events[0],
            ProcessEvent::Started { photo_count: 2 }
        ));
        assert_eq!(events.len(), 3);

        let failed = events
            .iter()
            .find_map(|e| match e {
                ProcessEvent::PhotoProcessed { id, variants, .. } if id.value() == 2 => {
                    Some(variants.clone())
                }
                _ => None,
            })
            .unwrap();
        let statuses: Vec<VariantStatus> = failed.iter().map(|v| v.status).collect();
        assert_eq!(
            statuses,
            vec![
                VariantStatus::Failed,
                VariantStatus::Skipped,
                VariantStatus::Skipped
            ]
        );
    }

    #[test]
    fn thumbnail_uses_configured_box() {
        let src = sources(&["a.jpg"]);
        let dst = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut opts = options();
        opts.thumbnail.width = 150;
        opts.thumbnail.height = 100;

        generate_images(
            &backend,
            &[photo(1, "a.jpg")],
            src.path(),
            dst.path(),
            &opts,
            &AtomicBool::new(false),
            None,
        )
        .unwrap();

        assert!(backend.get_operations().iter().any(|op| matches!(
            op,
            RecordedOp::Thumbnail {
                crop_width: 150,
                crop_height: 100,
                ..
            }
        )));
    }
}
