//! Shared test utilities for the photolog test suite.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = setup_site(&["harbour.jpg", "fog.jpg"]);
//! // site.path() holds config.yaml, templates/, images/ and an empty store
//! ```

use crate::config::{self, SiteConfig, ThumbnailBox};
use crate::template;
use image::{ImageEncoder, RgbImage};
use std::path::Path;
use tempfile::TempDir;

/// Config used by unit tests. Matches the `config.yaml` written by
/// [`setup_site`].
pub fn site_config() -> SiteConfig {
    SiteConfig {
        title: "Test Site".to_string(),
        url: "https://photos.example.com".to_string(),
        author: "Test Author".to_string(),
        email: "author@example.com".to_string(),
        data_file: "data/photos.tsv".to_string(),
        image_sizes: vec![1200, 800],
        thumbnail: ThumbnailBox::default(),
        feed_size: 10,
        max_processes: Some(2),
    }
}

pub const SITE_CONFIG_YAML: &str = r#"title: "Test Site"
url: "https://photos.example.com/"
author: "Test Author"
email: "author@example.com"
data_file: "data/photos.tsv"
image_sizes: "1200 800"
max_processes: 2
"#;

/// Write a small gradient JPEG.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// A temporary site source directory: config, stock templates, and the
/// given originals (40x30 JPEGs) under `images/`. No store is created.
pub fn setup_site(originals: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join(config::CONFIG_FILENAME), SITE_CONFIG_YAML).unwrap();
    template::write_stock(&tmp.path().join(template::TEMPLATE_DIR)).unwrap();
    let images = tmp.path().join("images");
    std::fs::create_dir_all(&images).unwrap();
    for name in originals {
        write_test_jpeg(&images.join(name), 40, 30);
    }
    tmp
}

#[test]
fn fixture_config_matches_yaml() {
    let site = setup_site(&[]);
    assert_eq!(config::load_config(site.path()).unwrap(), site_config());
}
