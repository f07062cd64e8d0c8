//! Site builder.
//!
//! Produces every generated file of a build from the photos, the site
//! configuration and a [`TemplateSet`]:
//!
//! ```text
//! public/
//! ├── index.html              # newest-first thumbnail grid
//! ├── index.xml               # RSS feed of the most recent photos
//! ├── style.css               # copied once, never overwritten
//! ├── photo/
//! │   ├── index.html          # byte-identical copy of the root index
//! │   ├── 1/index.html        # one post page per photo
//! │   └── 2/index.html
//! └── images/                 # written by the process stage
//! ```
//!
//! Index links and feed items are sorted newest first by natural order of
//! their rendered text, so a fragment whose first varying part is the photo
//! ID orders by ID value (`10` after `9`).
//!
//! Every value taken from data (title, labels, paths) is escaped before it
//! is substituted; fragments rendered from templates are inserted as is.

use crate::config::SiteConfig;
use crate::imaging::ImageBackend;
use crate::natural;
use crate::photo::{self, Photo};
use crate::process::{self, ProcessError, ProcessEvent, ProcessOptions, ProcessReport};
use crate::template::{self, STYLESHEET, TemplateError, TemplateSet};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, info_span, warn};

/// strftime pattern for the feed's `lastBuildDate`.
pub const BUILD_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

#[derive(Error, Debug)]
pub enum SiteError {
    /// A template failed while a page was being rendered.
    #[error(transparent)]
    Render(#[from] TemplateError),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("{failed} photo(s) have incomplete image assets; nothing rendered")]
    ImagesIncomplete { failed: usize },
}

/// Where the build reads originals from and writes to.
#[derive(Debug, Clone)]
pub struct BuildPaths {
    /// Directory holding the original images.
    pub source_images: PathBuf,
    /// Destination root.
    pub dst: PathBuf,
}

/// Everything a finished build did.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub images: ProcessReport,
    pub posts: usize,
    pub index_pages: Vec<PathBuf>,
    pub feed_items: usize,
    pub stylesheet_copied: bool,
}

/// Format a build timestamp for the feed.
pub fn build_timestamp(now: DateTime<Utc>) -> String {
    now.format(BUILD_DATE_FORMAT).to_string()
}

fn write_file(path: &Path, contents: &str) -> Result<(), SiteError> {
    let write_err = |source| SiteError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, contents).map_err(write_err)
}

/// Sort fragments newest first and join them one per line.
fn join_newest_first(mut fragments: Vec<String>) -> String {
    natural::sort_descending(&mut fragments);
    fragments.join("\n")
}

/// Renders one build.
///
/// The head fragment and the build timestamp are fixed at construction, so
/// every page of a build shares them.
pub struct Builder<'a> {
    config: &'a SiteConfig,
    photos: &'a [Photo],
    templates: &'a TemplateSet,
    head: String,
    last_build: String,
}

impl<'a> Builder<'a> {
    /// `photos` must be in chronological order, see
    /// [`photos_from_records`](crate::photo::photos_from_records).
    pub fn new(
        config: &'a SiteConfig,
        photos: &'a [Photo],
        templates: &'a TemplateSet,
        last_build: String,
    ) -> Result<Self, SiteError> {
        let head = templates
            .head
            .render(&[("title", &template::escape(&config.title))])?;
        Ok(Self {
            config,
            photos,
            templates,
            head: head.trim_end().to_string(),
            last_build,
        })
    }

    pub fn render_post(&self, photo: &Photo) -> Result<String, SiteError> {
        let older = match photo.older() {
            Some(href) => self.fragment(&self.templates.older, &[("older", &href)])?,
            None => String::new(),
        };
        let newer = match photo.newer() {
            Some(href) => self.fragment(&self.templates.newer, &[("newer", &href)])?,
            None => String::new(),
        };
        Ok(self.templates.post.render(&[
            ("head", &self.head),
            ("photo_href", &template::escape(&photo.href())),
            ("src", &template::escape(&photo.src())),
            ("srcset", &template::escape(&photo.srcset_attr())),
            ("alt", &template::escape(&photo.alt)),
            ("older", &older),
            ("newer", &newer),
        ])?)
    }

    /// Write `{dst}/photo/{id}/index.html` for every photo.
    pub fn render_posts(&self, dst: &Path) -> Result<usize, SiteError> {
        info!(count = self.photos.len(), "writing posts");
        for photo in self.photos {
            let path = dst.join("photo").join(photo.id.to_string()).join("index.html");
            write_file(&path, &self.render_post(photo)?)?;
        }
        Ok(self.photos.len())
    }

    /// The thumbnail links, newest first.
    pub fn render_links(&self) -> Result<String, SiteError> {
        let fragments = self
            .photos
            .iter()
            .map(|photo| {
                self.fragment(
                    &self.templates.link,
                    &[
                        ("href", &template::escape(&photo.href())),
                        ("thumb_src", &template::escape(&format!("/{}", photo.thumb_path()))),
                        ("alt", &template::escape(&photo.alt)),
                    ],
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(join_newest_first(fragments))
    }

    pub fn render_index_page(&self) -> Result<String, SiteError> {
        Ok(self.templates.index.render(&[
            ("head", &self.head),
            ("links", &self.render_links()?),
            ("email", &template::escape(&self.config.email)),
        ])?)
    }

    /// Write the index to `{dst}/index.html` and `{dst}/photo/index.html`.
    pub fn render_index(&self, dst: &Path) -> Result<Vec<PathBuf>, SiteError> {
        info!("writing indexes");
        let page = self.render_index_page()?;
        let paths = vec![dst.join("index.html"), dst.join("photo").join("index.html")];
        for path in &paths {
            write_file(path, &page)?;
        }
        Ok(paths)
    }

    /// Feed items for the most recent photos, newest first.
    pub fn render_feed_items(&self) -> Result<(String, usize), SiteError> {
        let window = photo::feed_window(self.photos, self.config.feed_size);
        let url = template::escape(&self.config.url);
        let fragments = window
            .iter()
            .map(|photo| {
                let src = photo.src();
                self.fragment(
                    &self.templates.rss_item,
                    &[
                        ("alt", &template::escape(&photo.alt)),
                        (
                            "permalink",
                            &template::escape(&format!("{}{}", self.config.url, src)),
                        ),
                        ("url", &url),
                        ("src", &template::escape(&src)),
                    ],
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((join_newest_first(fragments), window.len()))
    }

    pub fn render_feed_document(&self) -> Result<(String, usize), SiteError> {
        let (items, count) = self.render_feed_items()?;
        let document = self.templates.feed.render(&[
            ("title", &template::escape(&self.config.title)),
            ("url", &template::escape(&self.config.url)),
            ("last_build", &self.last_build),
            ("rss_items", &items),
        ])?;
        Ok((document, count))
    }

    /// Write `{dst}/index.xml`. Returns the number of items.
    pub fn render_feed(&self, dst: &Path) -> Result<usize, SiteError> {
        info!("writing RSS feed");
        let (document, count) = self.render_feed_document()?;
        write_file(&dst.join("index.xml"), &document)?;
        Ok(count)
    }

    /// Copy the stylesheet unless `{dst}/style.css` already exists.
    pub fn copy_stylesheet(&self, dst: &Path) -> Result<bool, SiteError> {
        let path = dst.join(STYLESHEET);
        if path.exists() {
            info!(path = %path.display(), "stylesheet present, not copying");
            return Ok(false);
        }
        info!("copying stylesheet");
        write_file(&path, &self.templates.stylesheet)?;
        Ok(true)
    }

    /// Run the whole build: images, posts, index, feed, stylesheet.
    ///
    /// Image failures are collected in the report and rendering continues,
    /// unless `fail_fast` is set, in which case nothing is rendered.
    pub fn build<B: ImageBackend + ?Sized>(
        &self,
        backend: &B,
        paths: &BuildPaths,
        options: &ProcessOptions,
        cancel: &AtomicBool,
        progress: Option<Sender<ProcessEvent>>,
        fail_fast: bool,
    ) -> Result<BuildReport, SiteError> {
        let _span = info_span!("build", photos = self.photos.len()).entered();
        let dst = paths.dst.as_path();

        let images = process::generate_images(
            backend,
            self.photos,
            &paths.source_images,
            dst,
            options,
            cancel,
            progress,
        )?;
        if fail_fast && !images.is_complete() {
            return Err(SiteError::ImagesIncomplete {
                failed: images.failures.len(),
            });
        }
        for failure in &images.failures {
            warn!(photo_id = %failure.id, error = %failure.error, "rendering with incomplete images");
        }

        let posts = self.render_posts(dst)?;
        let index_pages = self.render_index(dst)?;
        let feed_items = self.render_feed(dst)?;
        let stylesheet_copied = self.copy_stylesheet(dst)?;

        Ok(BuildReport {
            images,
            posts,
            index_pages,
            feed_items,
            stylesheet_copied,
        })
    }

    /// Render a single-line fragment.
    fn fragment(
        &self,
        template: &template::Template,
        values: &[(&str, &str)],
    ) -> Result<String, SiteError> {
        Ok(template.render(values)?.trim_end().to_string())
    }
}
