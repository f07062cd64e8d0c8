//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! The primary display for a photo is its identity: the zero-padded ID and
//! the stored filename. File paths and per-variant status are secondary
//! context on indented lines below it.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Images (3 photos)
//!     001 harbour.jpg
//!         thumbnail: encoded
//!         1200px: encoded
//!     002 fog.jpg
//!         thumbnail: failed
//!         1200px: skipped
//!
//! Index → index.html
//! Index → photo/index.html
//! Posts (3) → photo/{id}/index.html
//! Feed (3 items) → index.xml
//! Stylesheet → style.css (copied)
//!
//! Incomplete images
//!     002 fog.jpg
//!         thumbnail failed: Processing failed: ...
//! ```
//!
//! ## Add
//!
//! ```text
//! 004 harbour.jpg (Mon, 02 Jan 2006)
//!     Source: images/harbour.jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::commands::{IMAGES_DIR, InitReport};
use crate::process::{PhotoFailure, ProcessEvent, VariantStatus};
use crate::site::BuildReport;
use crate::store::{PhotoId, Record};
use std::path::Path;

/// Format a photo ID as 3-digit zero-padded.
fn format_id(id: PhotoId) -> String {
    format!("{:0>3}", id.value())
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn photo_line(depth: usize, id: PhotoId, filename: &str) -> String {
    format!("{}{} {}", indent(depth), format_id(id), filename)
}

/// Path relative to `root` when possible, for display.
fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// init
// ============================================================================

pub fn format_init_output(report: &InitReport, source: &Path) -> Vec<String> {
    if report.created.is_empty() {
        return vec![format!("{} is already initialized", source.display())];
    }
    let mut lines = vec![format!("Initialized {}", source.display())];
    for path in &report.created {
        lines.push(format!("{}{}", indent(1), display_relative(path, source)));
    }
    lines
}

pub fn print_init_output(report: &InitReport, source: &Path) {
    for line in format_init_output(report, source) {
        println!("{}", line);
    }
}

// ============================================================================
// add
// ============================================================================

pub fn format_register_output(record: &Record) -> Vec<String> {
    vec![
        format!("{} ({})", photo_line(0, record.id, &record.filename), record.label),
        format!("{}Source: {}/{}", indent(1), IMAGES_DIR, record.filename),
    ]
}

pub fn print_register_output(record: &Record) {
    for line in format_register_output(record) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Format a single image progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { photo_count } => {
            vec![format!("Images ({} photos)", photo_count)]
        }
        ProcessEvent::PhotoProcessed {
            id,
            filename,
            variants,
        } => {
            let mut lines = vec![photo_line(1, *id, filename)];
            for variant in variants {
                let status = match variant.status {
                    VariantStatus::Encoded => "encoded",
                    VariantStatus::Failed => "failed",
                    VariantStatus::Skipped => "skipped",
                };
                lines.push(format!("{}{}: {}", indent(2), variant.label, status));
            }
            lines
        }
    }
}

/// Format the rendered-pages summary of a build.
pub fn format_build_output(report: &BuildReport, output: &Path) -> Vec<String> {
    let mut lines = vec![String::new()];
    for page in &report.index_pages {
        lines.push(format!("Index \u{2192} {}", display_relative(page, output)));
    }
    lines.push(format!(
        "Posts ({}) \u{2192} photo/{{id}}/index.html",
        report.posts
    ));
    lines.push(format!(
        "Feed ({} items) \u{2192} index.xml",
        report.feed_items
    ));
    let stylesheet = if report.stylesheet_copied {
        "copied"
    } else {
        "kept"
    };
    lines.push(format!("Stylesheet \u{2192} style.css ({})", stylesheet));

    if !report.images.is_complete() {
        lines.push(String::new());
        lines.extend(format_failures(&report.images.failures));
    }
    lines
}

/// Format photos whose images are incomplete.
pub fn format_failures(failures: &[PhotoFailure]) -> Vec<String> {
    let mut lines = vec!["Incomplete images".to_string()];
    for failure in failures {
        lines.push(photo_line(1, failure.id, &failure.filename));
        lines.push(format!("{}{}", indent(2), failure.error));
    }
    lines
}

pub fn print_build_output(report: &BuildReport, output: &Path) {
    for line in format_build_output(report, output) {
        println!("{}", line);
    }
}
