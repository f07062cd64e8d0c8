//! ImageMagick backend.
//!
//! Shells out to `convert` for the resize and `mogrify` for the in-place
//! sharpening pass. Every invocation checks its exit status, captures stderr
//! and is killed once it exceeds the configured timeout.
//!
//! Argument lists are built by pure functions so they can be tested without
//! ImageMagick installed.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{box_geometry, width_geometry};
use super::params::{ResizeParams, Sharpening, ThumbnailParams};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct MagickBackend {
    pub timeout: Duration,
    pub convert: String,
    pub mogrify: String,
}

impl Default for MagickBackend {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            convert: "convert".to_string(),
            mogrify: "mogrify".to_string(),
        }
    }
}

impl MagickBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    fn sharpen(&self, path: &Path, sharpening: Option<Sharpening>) -> Result<(), BackendError> {
        match sharpening {
            Some(s) => run_tool(&self.mogrify, &sharpen_args(path, &s), self.timeout),
            None => Ok(()),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `convert -resize {w}x -quality {q} SRC DST`
pub fn resize_args(params: &ResizeParams) -> Vec<String> {
    vec![
        "-resize".to_string(),
        width_geometry(params.width),
        "-quality".to_string(),
        params.quality.value().to_string(),
        path_arg(&params.source),
        path_arg(&params.output),
    ]
}

/// `convert -define jpeg:size=WxH SRC -thumbnail WxH^ -gravity center -extent WxH -quality Q DST`
pub fn thumbnail_args(params: &ThumbnailParams) -> Vec<String> {
    let geometry = box_geometry(params.crop_width, params.crop_height);
    vec![
        "-define".to_string(),
        format!("jpeg:size={}", geometry),
        path_arg(&params.source),
        "-thumbnail".to_string(),
        format!("{}^", geometry),
        "-gravity".to_string(),
        "center".to_string(),
        "-extent".to_string(),
        geometry,
        "-quality".to_string(),
        params.quality.value().to_string(),
        path_arg(&params.output),
    ]
}

/// `mogrify -unsharp {geometry} FILE`
pub fn sharpen_args(path: &Path, sharpening: &Sharpening) -> Vec<String> {
    vec![
        "-unsharp".to_string(),
        sharpening.magick_geometry(),
        path_arg(path),
    ]
}

/// Run a tool to completion, killing it after `timeout`.
///
/// Stderr is drained on its own thread while the tool runs, so a chatty
/// tool never blocks on a full pipe.
fn run_tool(tool: &str, args: &[String], timeout: Duration) -> Result<(), BackendError> {
    debug!(tool, ?args, "running");
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| BackendError::ToolUnavailable {
            tool: tool.to_string(),
            source,
        })?;

    let drain = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            // The child may have exited between the poll and the kill.
            // The drain thread is left to finish on its own: a grandchild
            // can still hold the pipe open.
            let _ = child.kill();
            let _ = child.wait();
            return Err(BackendError::Timeout {
                tool: tool.to_string(),
                timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    if status.success() {
        return Ok(());
    }

    let stderr = drain
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Err(BackendError::ToolFailed {
        tool: tool.to_string(),
        status: status.to_string(),
        stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
    })
}

impl ImageBackend for MagickBackend {
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        run_tool(&self.convert, &resize_args(params), self.timeout)?;
        self.sharpen(&params.output, params.sharpening)
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        run_tool(&self.convert, &thumbnail_args(params), self.timeout)?;
        self.sharpen(&params.output, params.sharpening)
    }
}
