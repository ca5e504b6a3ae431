//! Capture loop configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest allowed capture interval, in seconds
pub const MIN_INTERVAL_SECS: u64 = 5;

/// Clamp an interval to [`MIN_INTERVAL_SECS`].
pub fn clamp_interval(seconds: u64) -> u64 {
    seconds.max(MIN_INTERVAL_SECS)
}

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Read a still image that an external grabber keeps overwriting
    #[default]
    File,
    /// Run a command that writes one encoded frame to stdout
    Command,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_seconds: u64,
    /// Grayscale + contrast boost before analysis
    pub preprocess: bool,
    pub source: SourceKind,
    /// Snapshot path for `source = "file"`
    pub path: PathBuf,
    /// argv for `source = "command"`
    pub command: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
            preprocess: true,
            source: SourceKind::File,
            path: PathBuf::from("snapshot.jpg"),
            command: vec![
                "ffmpeg".to_string(),
                "-loglevel".to_string(),
                "error".to_string(),
                "-f".to_string(),
                "v4l2".to_string(),
                "-i".to_string(),
                "/dev/video0".to_string(),
                "-frames:v".to_string(),
                "1".to_string(),
                "-f".to_string(),
                "image2".to_string(),
                "-".to_string(),
            ],
        }
    }
}
