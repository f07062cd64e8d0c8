//! Append-only record store.
//!
//! The store is a flat, human-editable text file with one photo per line:
//!
//! ```text
//! 1\tMon, 02 Jan 2023\tharbour.jpg
//! 2\tTue, 03 Jan 2023\tfog.jpg
//! ```
//!
//! Columns are the photo ID, the upload label (UTC date at registration) and
//! the source filename under `{source}/images/`. IDs are allocated
//! sequentially from 1. Lines are only ever appended; nothing in this crate
//! rewrites or deletes a prior line.
//!
//! Chronology is defined by numeric ID, not by line order, so a hand-edited
//! store whose lines are out of order still builds the same site.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::ops::RangeInclusive;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// strftime pattern for the upload label, e.g. `Mon, 02 Jan 2006`.
pub const LABEL_FORMAT: &str = "%a, %d %b %Y";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record store not found: {0} (register a photo first)")]
    NotFound(PathBuf),
    #[error("IO error on record store {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt record at {path}:{line_number}: {reason} ({line:?})")]
    Corrupt {
        path: PathBuf,
        line_number: usize,
        line: String,
        reason: String,
    },
    #[error("record store {} already holds the largest possible photo ID", .0.display())]
    IdSpaceExhausted(PathBuf),
    #[error("filename {0:?} cannot be stored (tabs, newlines and path separators are not allowed)")]
    InvalidFilename(String),
}

/// Numeric photo identifier. Rendered as its decimal string in paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PhotoId(u32);

impl PhotoId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The numerically preceding ID, if any.
    pub fn pred(self) -> Option<PhotoId> {
        self.0.checked_sub(1).filter(|v| *v > 0).map(PhotoId)
    }

    /// The numerically following ID, if any.
    pub fn succ(self) -> Option<PhotoId> {
        self.0.checked_add(1).map(PhotoId)
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PhotoId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u32>() {
            Ok(0) => Err("photo IDs start at 1".to_string()),
            Ok(v) => Ok(PhotoId(v)),
            Err(_) => Err(format!("`{s}` is not a numeric photo ID")),
        }
    }
}

/// One stored line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: PhotoId,
    /// Upload label, shown as the photo's alt text.
    pub label: String,
    pub filename: String,
}

/// A record with its chronological neighbours and the variant widths attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRecord {
    pub record: Record,
    pub prev_id: Option<PhotoId>,
    pub next_id: Option<PhotoId>,
    pub widths: Vec<u32>,
}

/// Format the upload label for a date.
pub fn upload_label(date: NaiveDate) -> String {
    date.format(LABEL_FORMAT).to_string()
}

/// Handle to an existing store file.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Ensure the store file exists, creating parent directories. Existing
    /// content is never truncated.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Open an existing store. An empty file is a valid, empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Parse every line. Blank lines are skipped; anything else that is not
    /// `id\tlabel\tfilename` is a [`StoreError::Corrupt`].
    pub fn records(&self) -> Result<Vec<Record>, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        parse_records(&content, &self.path)
    }

    pub fn all_ids(&self) -> Result<BTreeSet<PhotoId>, StoreError> {
        Ok(self.records()?.into_iter().map(|r| r.id).collect())
    }

    /// Largest stored ID, or 0 for an empty store.
    pub fn max_id(&self) -> Result<u32, StoreError> {
        Ok(self.all_ids()?.last().map(|id| id.value()).unwrap_or(0))
    }

    /// Smallest stored ID, or 0 for an empty store.
    pub fn min_id(&self) -> Result<u32, StoreError> {
        Ok(self.all_ids()?.first().map(|id| id.value()).unwrap_or(0))
    }

    /// The ID the next registration will receive.
    pub fn next_id(&self) -> Result<PhotoId, StoreError> {
        self.max_id()?
            .checked_add(1)
            .map(PhotoId)
            .ok_or_else(|| StoreError::IdSpaceExhausted(self.path.clone()))
    }

    /// Append a record labelled with today's UTC date.
    pub fn append(&self, id: PhotoId, filename: &str) -> Result<Record, StoreError> {
        self.append_dated(id, filename, Utc::now().date_naive())
    }

    /// Append a record with an explicit upload date.
    ///
    /// The line is written with a single `write_all` so a failure never
    /// leaves half a record behind.
    pub fn append_dated(
        &self,
        id: PhotoId,
        filename: &str,
        date: NaiveDate,
    ) -> Result<Record, StoreError> {
        validate_filename(filename)?;
        let record = Record {
            id,
            label: upload_label(date),
            filename: filename.to_string(),
        };

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        // A hand-edited store may lack the final newline.
        let mut line = String::new();
        if !ends_with_newline(&mut file).map_err(|e| self.io_error(e))? {
            line.push('\n');
        }
        line.push_str(&format!(
            "{}\t{}\t{}\n",
            record.id, record.label, record.filename
        ));
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))?;
        debug!(photo_id = %record.id, filename = %record.filename, "appended record");
        Ok(record)
    }

    /// All records keyed by ID, each with its neighbours resolved.
    ///
    /// A neighbour exists only when `id - 1` / `id + 1` is itself stored, so
    /// stores with gaps never produce links to missing photos.
    pub fn records_with_navigation(
        &self,
        widths: &[u32],
    ) -> Result<BTreeMap<PhotoId, NavigationRecord>, StoreError> {
        let records = self.records()?;
        let ids: BTreeSet<PhotoId> = records.iter().map(|r| r.id).collect();

        let gaps = missing_ranges(&ids);
        if !gaps.is_empty() {
            warn!(
                store = %self.path.display(),
                missing = ?gaps,
                "record store has gaps in its ID sequence"
            );
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let prev_id = record.id.pred().filter(|id| ids.contains(id));
                let next_id = record.id.succ().filter(|id| ids.contains(id));
                (
                    record.id,
                    NavigationRecord {
                        record,
                        prev_id,
                        next_id,
                        widths: widths.to_vec(),
                    },
                )
            })
            .collect())
    }
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Reject filenames that cannot round-trip through a store line.
pub fn validate_filename(filename: &str) -> Result<(), StoreError> {
    let bad = filename.trim().is_empty()
        || filename
            .chars()
            .any(|c| matches!(c, '\t' | '\n' | '\r' | '/' | '\\'));
    if bad {
        return Err(StoreError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Parse store content. `path` is only used for error messages.
pub fn parse_records(content: &str, path: &Path) -> Result<Vec<Record>, StoreError> {
    let mut seen = BTreeSet::new();
    let mut records = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let corrupt = |reason: String| StoreError::Corrupt {
            path: path.to_path_buf(),
            line_number: idx + 1,
            line: raw.to_string(),
            reason,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        let [id, label, filename] = fields.as_slice() else {
            return Err(corrupt(format!(
                "expected 3 tab-separated columns, found {}",
                fields.len()
            )));
        };
        let id: PhotoId = id.trim().parse().map_err(corrupt)?;
        if filename.trim().is_empty() {
            return Err(corrupt("empty filename".to_string()));
        }
        if !seen.insert(id) {
            return Err(corrupt(format!("duplicate photo ID {id}")));
        }

        records.push(Record {
            id,
            label: label.trim().to_string(),
            filename: filename.trim().to_string(),
        });
    }

    Ok(records)
}

/// Runs of unstored IDs between the smallest and largest stored ID.
///
/// One range per gap, so the result is bounded by the number of records.
pub fn missing_ranges(ids: &BTreeSet<PhotoId>) -> Vec<RangeInclusive<u32>> {
    ids.iter()
        .zip(ids.iter().skip(1))
        .filter(|(lo, hi)| hi.value() - lo.value() > 1)
        .map(|(lo, hi)| lo.value() + 1..=hi.value() - 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(content: &str) -> (TempDir, RecordStore) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photos.tsv");
        fs::write(&path, content).unwrap();
        let store = RecordStore::open(&path).unwrap();
        (tmp, store)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn upload_label_format() {
        assert_eq!(upload_label(date(2006, 1, 2)), "Mon, 02 Jan 2006");
    }

    #[test]
    fn create_makes_parent_dirs_and_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data/nested/photos.tsv");
        let store = RecordStore::create(&path).unwrap();
        assert!(path.is_file());
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn create_does_not_truncate() {
        let (_tmp, store) = store_with("1\tMon, 02 Jan 2006\ta.jpg\n");
        RecordStore::create(store.path()).unwrap();
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn open_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = RecordStore::open(&tmp.path().join("nope.tsv"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn empty_store_uses_zero_sentinels() {
        let (_tmp, store) = store_with("");
        assert!(store.all_ids().unwrap().is_empty());
        assert_eq!(store.max_id().unwrap(), 0);
        assert_eq!(store.min_id().unwrap(), 0);
        assert_eq!(store.next_id().unwrap(), PhotoId::new(1));
    }

    #[test]
    fn ids_follow_numeric_not_line_order() {
        let (_tmp, store) = store_with("10\tx\tj.jpg\n9\tx\ti.jpg\n11\tx\tk.jpg\n");
        assert_eq!(store.min_id().unwrap(), 9);
        assert_eq!(store.max_id().unwrap(), 11);
    }

    #[test]
    fn append_writes_one_well_formed_line() {
        let (_tmp, store) = store_with("");
        store
            .append_dated(PhotoId::new(1), "harbour.jpg", date(2006, 1, 2))
            .unwrap();
        store
            .append_dated(PhotoId::new(2), "fog.jpg", date(2006, 1, 3))
            .unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "1\tMon, 02 Jan 2006\tharbour.jpg\n2\tTue, 03 Jan 2006\tfog.jpg\n"
        );
    }

    #[test]
    fn append_repairs_missing_final_newline() {
        let (_tmp, store) = store_with("1\tMon, 02 Jan 2006\ta.jpg");
        store
            .append_dated(PhotoId::new(2), "b.jpg", date(2006, 1, 3))
            .unwrap();
        let records = store.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].filename, "b.jpg");
    }

    #[test]
    fn append_rejects_tabs_and_separators() {
        let (_tmp, store) = store_with("");
        for bad in ["a\tb.jpg", "dir/a.jpg", "", "a\nb"] {
            let result = store.append(PhotoId::new(1), bad);
            assert!(matches!(result, Err(StoreError::InvalidFilename(_))), "{bad:?}");
        }
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "");
    }

    #[test]
    fn wrong_column_count_is_corrupt() {
        let (_tmp, store) = store_with("1\tMon, 02 Jan 2006\ta.jpg\n2\tmissing filename\n");
        let err = store.records().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line_number: 2, .. }));
    }

    #[test]
    fn non_numeric_id_is_corrupt() {
        let (_tmp, store) = store_with("one\tMon, 02 Jan 2006\ta.jpg\n");
        let err = store.records().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line_number: 1, .. }));
        assert!(err.to_string().contains("one"));
    }

    #[test]
    fn duplicate_id_is_corrupt() {
        let (_tmp, store) = store_with("1\tx\ta.jpg\n1\tx\tb.jpg\n");
        let err = store.records().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line_number: 2, .. }));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let (_tmp, store) = store_with("1\tx\ta.jpg\n\n2\tx\tb.jpg\n");
        assert_eq!(store.records().unwrap().len(), 2);
    }

    #[test]
    fn navigation_links_contiguous_ids() {
        let (_tmp, store) = store_with("1\tx\ta.jpg\n2\tx\tb.jpg\n3\tx\tc.jpg\n");
        let nav = store.records_with_navigation(&[800, 400]).unwrap();

        let first = &nav[&PhotoId::new(1)];
        assert_eq!(first.prev_id, None);
        assert_eq!(first.next_id, Some(PhotoId::new(2)));

        let middle = &nav[&PhotoId::new(2)];
        assert_eq!(middle.prev_id, Some(PhotoId::new(1)));
        assert_eq!(middle.next_id, Some(PhotoId::new(3)));
        assert_eq!(middle.widths, vec![800, 400]);

        let last = &nav[&PhotoId::new(3)];
        assert_eq!(last.prev_id, Some(PhotoId::new(2)));
        assert_eq!(last.next_id, None);
    }

    #[test]
    fn navigation_never_links_into_a_gap() {
        let (_tmp, store) = store_with("1\tx\ta.jpg\n2\tx\tb.jpg\n5\tx\te.jpg\n");
        let nav = store.records_with_navigation(&[800]).unwrap();

        assert_eq!(nav[&PhotoId::new(2)].next_id, None);
        assert_eq!(nav[&PhotoId::new(5)].prev_id, None);
        assert_eq!(nav[&PhotoId::new(5)].next_id, None);
    }

    #[test]
    fn neighbours_differ_by_exactly_one() {
        let (_tmp, store) = store_with("3\tx\tc.jpg\n1\tx\ta.jpg\n2\tx\tb.jpg\n7\tx\tg.jpg\n");
        for (id, rec) in store.records_with_navigation(&[800]).unwrap() {
            if let Some(prev) = rec.prev_id {
                assert_eq!(prev.value() + 1, id.value());
            }
            if let Some(next) = rec.next_id {
                assert_eq!(next.value(), id.value() + 1);
            }
        }
    }

    #[test]
    fn missing_ranges_lists_gaps() {
        let ids: BTreeSet<PhotoId> = [1, 2, 5, 7].into_iter().map(PhotoId::new).collect();
        assert_eq!(missing_ranges(&ids), vec![3..=4, 6..=6]);
        assert!(missing_ranges(&BTreeSet::new()).is_empty());
        let contiguous: BTreeSet<PhotoId> = (1..=4).map(PhotoId::new).collect();
        assert!(missing_ranges(&contiguous).is_empty());
    }

    #[test]
    fn huge_gap_is_one_range() {
        let (_tmp, store) = store_with("1\tx\ta.jpg\n3000000000\tx\tb.jpg\n");
        let ids = store.all_ids().unwrap();
        assert_eq!(missing_ranges(&ids), vec![2..=2_999_999_999]);

        let nav = store.records_with_navigation(&[800]).unwrap();
        assert_eq!(nav.len(), 2);
        assert_eq!(nav[&PhotoId::new(1)].next_id, None);
        assert_eq!(nav[&PhotoId::new(3_000_000_000)].prev_id, None);
    }

    #[test]
    fn next_id_at_u32_max_is_error() {
        let (_tmp, store) = store_with("4294967295\tx\ta.jpg\n");
        assert!(matches!(
            store.next_id(),
            Err(StoreError::IdSpaceExhausted(_))
        ));
    }

    #[test]
    fn photo_id_parsing() {
        assert_eq!("12".parse::<PhotoId>().unwrap(), PhotoId::new(12));
        assert!("0".parse::<PhotoId>().is_err());
        assert!("-1".parse::<PhotoId>().is_err());
        assert_eq!(PhotoId::new(1).pred(), None);
        assert_eq!(PhotoId::new(9).succ(), Some(PhotoId::new(10)));
        assert_eq!(PhotoId::new(10).to_string(), "10");
    }
}
