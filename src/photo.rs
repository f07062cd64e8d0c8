//! Photo entities: a stored record plus everything derived from it.
//!
//! Entities are rebuilt from the record store on every run and never
//! persisted. All URIs are root-relative and derived from the ID and the
//! stored filename:
//!
//! ```text
//! permalink   /photo/{id}/
//! asset dir   images/{id}/
//! thumbnail   images/{id}/thumb_{filename}
//! variant     images/{id}/{width}_{filename}
//! ```
//!
//! The default `src` of a post is the variant at the first configured width.

use crate::store::{NavigationRecord, PhotoId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    pub id: PhotoId,
    /// Upload label, used as alt text and feed item title.
    pub alt: String,
    pub filename: String,
    pub prev_id: Option<PhotoId>,
    pub next_id: Option<PhotoId>,
    /// Variant widths in configured order.
    pub widths: Vec<u32>,
}

impl Photo {
    pub fn from_navigation(nav: NavigationRecord) -> Self {
        Self {
            id: nav.record.id,
            alt: nav.record.label,
            filename: nav.record.filename,
            prev_id: nav.prev_id,
            next_id: nav.next_id,
            widths: nav.widths,
        }
    }

    /// Permalink of a photo page.
    pub fn permalink(id: PhotoId) -> String {
        format!("/photo/{}/", id)
    }

    pub fn href(&self) -> String {
        Self::permalink(self.id)
    }

    /// Per-photo asset directory, relative to the site root.
    pub fn asset_dir(&self) -> String {
        format!("images/{}", self.id)
    }

    pub fn thumb_path(&self) -> String {
        format!("{}/thumb_{}", self.asset_dir(), self.filename)
    }

    pub fn variant_path(&self, width: u32) -> String {
        format!("{}/{}_{}", self.asset_dir(), width, self.filename)
    }

    /// The canonical display width (first configured).
    pub fn largest(&self) -> Option<u32> {
        self.widths.first().copied()
    }

    /// Root-relative `src` of the default variant.
    pub fn src(&self) -> String {
        match self.largest() {
            Some(width) => format!("/{}", self.variant_path(width)),
            None => format!("/{}", self.thumb_path()),
        }
    }

    /// `(path, width)` pairs in configured order.
    pub fn srcset(&self) -> Vec<(String, u32)> {
        self.widths
            .iter()
            .map(|w| (format!("/{}", self.variant_path(*w)), *w))
            .collect()
    }

    /// The `srcset` attribute value: `"/images/1/800_a.jpg 800w, ..."`.
    pub fn srcset_attr(&self) -> String {
        self.srcset()
            .iter()
            .map(|(path, width)| format!("{path} {width}w"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Link to the previous (older) photo.
    pub fn older(&self) -> Option<String> {
        self.prev_id.map(Self::permalink)
    }

    /// Link to the next (newer) photo.
    pub fn newer(&self) -> Option<String> {
        self.next_id.map(Self::permalink)
    }
}

/// Entities in chronological (ascending ID) order.
pub fn photos_from_records(records: BTreeMap<PhotoId, NavigationRecord>) -> Vec<Photo> {
    // BTreeMap iteration is already ascending by ID.
    records.into_values().map(Photo::from_navigation).collect()
}

/// The `size` most recent photos of a chronologically sorted slice.
pub fn feed_window(photos: &[Photo], size: usize) -> &[Photo] {
    &photos[photos.len().saturating_sub(size)..]
}
