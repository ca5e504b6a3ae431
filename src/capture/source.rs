//! Frame sources.
//!
//! The camera itself is an external collaborator. A source either reads a
//! snapshot file that a grabber keeps overwriting, or runs a one-shot
//! capture command and takes its stdout.

use crate::agent::Frame;
use crate::config::{CaptureConfig, SourceKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while acquiring a frame.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("capture command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("capture command is empty")]
    EmptyCommand,

    #[error("frame preprocessing failed: {0}")]
    Preprocess(#[from] image::ImageError),
}

/// Source of still frames.
#[async_trait]
pub trait FrameSource: Send + Sync + 'static {
    /// Grab one frame. `Ok(None)` when the camera is not ready yet.
    async fn capture(&self) -> Result<Option<Frame>, CaptureError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Build the configured frame source.
pub fn create_source(config: &CaptureConfig) -> Arc<dyn FrameSource> {
    match config.source {
        SourceKind::File => Arc::new(FileFrameSource::new(config.path.clone())),
        SourceKind::Command => Arc::new(CommandFrameSource::new(config.command.clone())),
    }
}

/// Guess the MIME type from a file extension, defaulting to JPEG.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Reads a snapshot file on every capture.
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn capture(&self) -> Result<Option<Frame>, CaptureError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(Frame {
            bytes,
            mime_type: mime_for(&self.path).to_string(),
        }))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Runs a capture command per frame; stdout is the encoded image.
pub struct CommandFrameSource {
    argv: Vec<String>,
}

impl CommandFrameSource {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl FrameSource for CommandFrameSource {
    async fn capture(&self) -> Result<Option<Frame>, CaptureError> {
        let (program, args) = self.argv.split_first().ok_or(CaptureError::EmptyCommand)?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(CaptureError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Ok(None);
        }

        Ok(Some(Frame::jpeg(output.stdout)))
    }

    fn describe(&self) -> String {
        format!("command {}", self.argv.join(" "))
    }
}
