//! # photolog
//!
//! A static site generator for a chronological photo blog. One photo per
//! post, newest first, with an RSS feed.
//!
//! # Architecture
//!
//! The source directory holds everything the site is built from:
//!
//! ```text
//! site/
//! ├── config.yaml        # title, url, author, email, data_file, image_sizes
//! ├── data/photos.tsv    # append-only record store: id, label, filename
//! ├── images/            # originals, copied in by `photolog add`
//! └── templates/         # page and feed templates + style.css
//! ```
//!
//! A build is a full regeneration pass:
//!
//! ```text
//! 1. Load     config.yaml + store + templates   (nothing written yet)
//! 2. Derive   records  →  photos                (prev/next links, URIs)
//! 3. Process  photos   →  public/images/{id}/   (thumbnail + size variants)
//! 4. Render   photos   →  public/               (posts, index x2, feed, css)
//! ```
//!
//! Image failures for one photo never stop the others, and pages are
//! rendered regardless. The build then reports the incomplete photos.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.yaml` loading and validation, stock config |
//! | [`store`] | Append-only record store, ID allocation, neighbour links |
//! | [`photo`] | Photo entities and every URI derived from them |
//! | [`natural`] | Numeric-aware string ordering for index and feed |
//! | [`imaging`] | Image backends (pure Rust, ImageMagick) and per-photo planning |
//! | [`process`] | Parallel variant generation with per-photo failure reporting |
//! | [`template`] | minijinja templates checked against fixed fields, stock template set |
//! | [`site`] | Site builder: posts, index, feed, stylesheet |
//! | [`commands`] | `init`, `add`, `build`, `list` |
//! | [`output`] | CLI output formatting |
//! | [`error`] | Top-level error with the failing stage |
//!
//! # Design Decisions
//!
//! ## Templates Are Files
//!
//! Templates live in the site's `templates/` directory so the look of a blog
//! can change without recompiling. Placeholders are checked against a fixed
//! list per file when the set loads, so a typo fails the build before any
//! output is written instead of leaking an empty `{{ alt }}` into a page.
//!
//! ## Chronology Is the ID
//!
//! IDs are allocated sequentially, so numeric ID order is upload order. A
//! photo links to `id - 1` and `id + 1` only when those IDs are stored;
//! hand-deleted lines leave a gap without dangling links.
//!
//! ## No Caching
//!
//! Every build regenerates every variant. The store is small and builds are
//! rare; correctness beats speed here.

pub mod commands;
pub mod config;
pub mod error;
pub mod imaging;
pub mod natural;
pub mod output;
pub mod photo;
pub mod process;
pub mod site;
pub mod store;
pub mod template;

pub use error::Error;

#[cfg(test)]
pub(crate) mod test_helpers;
