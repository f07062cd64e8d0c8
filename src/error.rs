//! Top-level error type.
//!
//! Every command returns [`Error`]. Each variant knows which stage of the
//! pipeline failed, and the binary prints it as one line:
//!
//! ```text
//! error[config]: config file not found: site/config.yaml
//! error[image]: 2 photo(s) have incomplete image assets: 3, 7
//! ```

use crate::config::ConfigError;
use crate::site::SiteError;
use crate::store::{PhotoId, StoreError};
use crate::template::TemplateError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Store,
    Template,
    Image,
    Render,
    Io,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Store => "store",
            Stage::Template => "template",
            Stage::Image => "image",
            Stage::Render => "render",
            Stage::Io => "io",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error("reference file not found: {}", .0.display())]
    ReferenceNotFound(PathBuf),
    #[error("a different image named {} is already registered; rename the new file", .0.display())]
    OriginalConflict(PathBuf),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Pages were written, but some photos lack image variants.
    #[error("{} photo(s) have incomplete image assets: {}", .0.len(), join_ids(.0))]
    ImagesIncomplete(Vec<PhotoId>),
}

fn join_ids(ids: &[PhotoId]) -> String {
    ids.iter()
        .map(PhotoId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_) => Stage::Config,
            Error::Store(_) => Stage::Store,
            Error::Template(_) => Stage::Template,
            Error::Site(SiteError::Render(_)) => Stage::Render,
            Error::Site(SiteError::Write { .. }) => Stage::Render,
            Error::Site(SiteError::Process(_) | SiteError::ImagesIncomplete { .. }) => Stage::Image,
            Error::ReferenceNotFound(_) | Error::OriginalConflict(_) => Stage::Store,
            Error::Io { .. } => Stage::Io,
            Error::ImagesIncomplete(_) => Stage::Image,
        }
    }

    /// The one-line diagnostic printed by the binary.
    pub fn diagnostic(&self) -> String {
        format!("error[{}]: {}", self.stage(), self)
    }
}
