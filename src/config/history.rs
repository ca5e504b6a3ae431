//! History store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest history the store keeps
pub const MAX_HISTORY: usize = 100;

/// File name of the persisted history slot
pub const HISTORY_FILE: &str = "study_logs.json";

/// History configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// JSON file holding the history; defaults to the platform data dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            capacity: MAX_HISTORY,
        }
    }
}

impl HistoryConfig {
    /// Resolve the history file path.
    ///
    /// Falls back to `<data_dir>/studycam/study_logs.json`, or the working
    /// directory when no data dir is known.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .map(|dir| dir.join("studycam"))
                .unwrap_or_default()
                .join(HISTORY_FILE),
        }
    }
}
