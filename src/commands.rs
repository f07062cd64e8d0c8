//! Command implementations behind the CLI.
//!
//! Each command takes a [`SitePaths`] and returns the crate [`Error`]; the
//! binary only parses arguments, wires up logging and prints results.
//!
//! Registration and build both read the record store, and registration
//! appends to it. They are not safe to run concurrently against the same
//! source directory; serializing them is up to the caller.

use crate::config::{self, SiteConfig};
use crate::error::Error;
use crate::imaging::ImageBackend;
use crate::photo::{self, Photo};
use crate::process::{ProcessEvent, ProcessOptions};
use crate::site::{self, BuildPaths, BuildReport, Builder};
use crate::store::{self, Record, RecordStore};
use crate::template::{self, TemplateSet};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use tracing::info;

/// Directory of original images inside a site source directory.
pub const IMAGES_DIR: &str = "images";

/// The directories a command works on.
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Overrides `{source}/templates`.
    pub templates: Option<PathBuf>,
}

impl SitePaths {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            templates: None,
        }
    }

    pub fn template_dir(&self) -> PathBuf {
        self.templates
            .clone()
            .unwrap_or_else(|| self.source.join(template::TEMPLATE_DIR))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.source.join(IMAGES_DIR)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Files created by [`init`].
#[derive(Debug, Default)]
pub struct InitReport {
    pub created: Vec<PathBuf>,
}

/// Scaffold a site source directory. Existing files are left untouched.
pub fn init(paths: &SitePaths) -> Result<InitReport, Error> {
    let mut report = InitReport::default();
    std::fs::create_dir_all(&paths.source).map_err(io_error(&paths.source))?;

    let config_path = paths.source.join(config::CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, config::stock_config_yaml())
            .map_err(io_error(&config_path))?;
        report.created.push(config_path);
    }

    let template_dir = paths.template_dir();
    report
        .created
        .extend(template::write_stock(&template_dir).map_err(io_error(&template_dir))?);

    let images = paths.images_dir();
    if !images.is_dir() {
        std::fs::create_dir_all(&images).map_err(io_error(&images))?;
        report.created.push(images);
    }

    let config = config::load_config(&paths.source)?;
    let data_path = config.data_path(&paths.source);
    if !data_path.exists() {
        RecordStore::create(&data_path)?;
        report.created.push(data_path);
    }

    info!(created = report.created.len(), source = %paths.source.display(), "initialized site");
    Ok(report)
}

/// Register a photo: copy `reference` into the images directory and append
/// a record with the next ID.
///
/// Nothing is written when the reference does not exist, its name cannot
/// be stored, or a different image with the same name is already in the
/// images directory.
pub fn register(paths: &SitePaths, reference: &Path) -> Result<Record, Error> {
    if !reference.is_file() {
        return Err(Error::ReferenceNotFound(reference.to_path_buf()));
    }
    let filename = reference
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::ReferenceNotFound(reference.to_path_buf()))?;
    store::validate_filename(filename)?;

    let config = config::load_config(&paths.source)?;
    let store = RecordStore::create(&config.data_path(&paths.source))?;
    let id = store.next_id()?;

    let images = paths.images_dir();
    std::fs::create_dir_all(&images).map_err(io_error(&images))?;
    let destination = images.join(filename);
    if destination.exists() {
        let existing = std::fs::read(&destination).map_err(io_error(&destination))?;
        let incoming = std::fs::read(reference).map_err(io_error(reference))?;
        if existing != incoming {
            return Err(Error::OriginalConflict(destination));
        }
        info!(path = %destination.display(), "identical original already in place, not copying");
    } else {
        std::fs::copy(reference, &destination).map_err(io_error(&destination))?;
    }

    let record = store.append(id, filename)?;
    info!(photo_id = %record.id, filename = %record.filename, "registered photo");
    Ok(record)
}

/// Build knobs that do not come from `config.yaml`.
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Stop before rendering when any photo's images failed.
    pub fail_fast: bool,
    pub progress: Option<Sender<ProcessEvent>>,
}

fn load_photos(config: &SiteConfig, source: &Path) -> Result<Vec<Photo>, Error> {
    let store = RecordStore::open(&config.data_path(source))?;
    let records = store.records_with_navigation(&config.image_sizes)?;
    Ok(photo::photos_from_records(records))
}

/// Build the site into `paths.output`.
///
/// Config, store and templates are all loaded before the output directory
/// is touched. Photos with failed images do not abort the build; the report
/// lists them.
pub fn build<B: ImageBackend + ?Sized>(
    paths: &SitePaths,
    backend: &B,
    options: BuildOptions,
    cancel: &AtomicBool,
) -> Result<BuildReport, Error> {
    let config = config::load_config(&paths.source)?;
    let photos = load_photos(&config, &paths.source)?;
    let templates = TemplateSet::load(&paths.template_dir())?;

    let builder = Builder::new(
        &config,
        &photos,
        &templates,
        site::build_timestamp(Utc::now()),
    )?;
    let report = builder.build(
        backend,
        &BuildPaths {
            source_images: paths.images_dir(),
            dst: paths.output.clone(),
        },
        &ProcessOptions::from_site_config(&config),
        cancel,
        options.progress,
        options.fail_fast,
    )?;
    info!(
        posts = report.posts,
        feed_items = report.feed_items,
        output = %paths.output.display(),
        "build complete"
    );
    Ok(report)
}

/// All photos in chronological order.
pub fn list(paths: &SitePaths) -> Result<Vec<Photo>, Error> {
    let config = config::load_config(&paths.source)?;
    load_photos(&config, &paths.source)
}
