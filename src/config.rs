//! Site configuration module.
//!
//! Loads `config.yaml` from the source directory into an immutable
//! [`SiteConfig`]. The file is a flat key-value document; every build and
//! registration reads it fresh, nothing is cached between invocations.
//!
//! ## Configuration Options
//!
//! ```yaml
//! title: "My Photo Blog"            # Site title, used in <head> and the feed
//! url: "https://photos.example.com" # Canonical URL, no trailing slash needed
//! author: "Jane Doe"
//! email: "jane@example.com"         # Shown in the index footer
//! data_file: "data/photos.tsv"      # Record store, relative to the source dir
//! image_sizes: "1200 800 400"       # Variant widths; the first is the default src
//!
//! # Optional, defaults shown
//! thumbnail:
//!   width: 100
//!   height: 65
//! feed_size: 10                     # Most recent photos included in index.xml
//! max_processes: ~                  # Parallel image workers (omit for auto)
//! ```
//!
//! ## Width Order
//!
//! `image_sizes` keeps the order it was written in. The first width is the
//! canonical display size: post pages use it for `src` and the feed links to
//! it. Put the largest width first.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file within the source directory.
pub const CONFIG_FILENAME: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title, injected into the head fragment and the feed channel.
    pub title: String,
    /// Canonical site URL. Stored without a trailing slash.
    pub url: String,
    pub author: String,
    pub email: String,
    /// Record store location, relative to the source directory.
    pub data_file: String,
    /// Variant widths in configured order. The first is the default size.
    #[serde(
        deserialize_with = "deserialize_widths",
        serialize_with = "serialize_widths"
    )]
    pub image_sizes: Vec<u32>,
    /// Fixed thumbnail box used on the index page.
    #[serde(default)]
    pub thumbnail: ThumbnailBox,
    /// Number of most recent photos included in the feed.
    #[serde(default = "default_feed_size")]
    pub feed_size: usize,
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    #[serde(default)]
    pub max_processes: Option<usize>,
}

/// Pixel box for the index thumbnails (crop-to-fill, center gravity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailBox {
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailBox {
    fn default() -> Self {
        Self {
            width: 100,
            height: 65,
        }
    }
}

fn default_feed_size() -> usize {
    10
}

/// `image_sizes` is written as a whitespace-separated string, but YAML turns a
/// lone `800` into an integer and some people write a list. Accept all three.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawWidths {
    Text(String),
    Single(u32),
    List(Vec<u32>),
}

fn deserialize_widths<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawWidths::deserialize(deserializer)? {
        RawWidths::Text(text) => parse_widths(&text).map_err(serde::de::Error::custom),
        RawWidths::Single(width) => Ok(vec![width]),
        RawWidths::List(widths) => Ok(widths),
    }
}

fn serialize_widths<S>(widths: &[u32], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = widths
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    serializer.serialize_str(&text)
}

/// Split a whitespace-separated width list, preserving order.
pub fn parse_widths(text: &str) -> Result<Vec<u32>, String> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| format!("image size `{token}` is not a pixel width"))
        })
        .collect()
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_sizes.is_empty() {
            return Err(ConfigError::Validation(
                "image_sizes must list at least one width".into(),
            ));
        }
        if self.image_sizes.contains(&0) {
            return Err(ConfigError::Validation(
                "image_sizes must be non-zero".into(),
            ));
        }
        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnail width and height must be non-zero".into(),
            ));
        }
        if self.data_file.trim().is_empty() {
            return Err(ConfigError::Validation("data_file must not be empty".into()));
        }
        Ok(())
    }

    /// The default ("largest") display width: the first configured size.
    pub fn default_width(&self) -> u32 {
        self.image_sizes[0]
    }

    /// Absolute path of the record store for a given source directory.
    pub fn data_path(&self, source: &Path) -> PathBuf {
        source.join(&self.data_file)
    }
}

/// Parse a config document. `path` is only used for error messages.
pub fn parse_config(content: &str, path: &Path) -> Result<SiteConfig, ConfigError> {
    let mut config: SiteConfig =
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.url = config.url.trim_end_matches('/').to_string();
    config.validate()?;
    Ok(config)
}

/// Load `config.yaml` from the given source directory.
///
/// Fails with [`ConfigError::NotFound`] when the file is absent.
pub fn load_config(source: &Path) -> Result<SiteConfig, ConfigError> {
    let path = source.join(CONFIG_FILENAME);
    if !path.is_file() {
        return Err(ConfigError::NotFound(path));
    }
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    parse_config(&content, &path)
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &SiteConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns a fully-commented stock `config.yaml`.
///
/// Used by the `gen-config` and `init` commands.
pub fn stock_config_yaml() -> &'static str {
    r##"# photolog configuration
# ======================
# All keys except those under "Optional" are required.

# Site title, shown in every page <head> and in the RSS channel.
title: "My Photo Blog"

# Canonical URL of the published site (used for absolute feed links).
url: "https://photos.example.com"

author: "Jane Doe"
email: "jane@example.com"

# Record store, relative to this directory. Created by `photolog add`.
data_file: "data/photos.tsv"

# Variant widths, whitespace separated. Order matters: the first width is
# the default image shown on each post page.
image_sizes: "1200 800 400"

# ---------------------------------------------------------------------------
# Optional
# ---------------------------------------------------------------------------

# Thumbnail box for the index page (crop to fill, centered).
thumbnail:
  width: 100
  height: 65

# Number of most recent photos in index.xml.
feed_size: 10

# Maximum parallel image-processing workers.
# Omit to auto-detect (= number of CPU cores).
# max_processes: 4
"##
}
