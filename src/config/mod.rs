//! Configuration module for studycam
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`STUDYCAM_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use studycam::config::StudyConfig;
//!
//! // Load defaults
//! let config = StudyConfig::default();
//! assert_eq!(config.capture.interval_seconds, 10);
//!
//! // Parse from TOML
//! let toml = r#"
//! [capture]
//! interval_seconds = 30
//! "#;
//! let config: StudyConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.capture.interval_seconds, 30);
//! ```

pub mod analysis;
pub mod capture;
pub mod error;
pub mod history;
pub mod logging;
pub mod speech;

pub use analysis::{AnalysisConfig, GoogleConfig, LmStudioConfig, Provider};
pub use capture::{clamp_interval, CaptureConfig, SourceKind, MIN_INTERVAL_SECS};
pub use error::ConfigError;
pub use history::{HistoryConfig, MAX_HISTORY};
pub use logging::{LogFormat, LoggingConfig};
pub use speech::SpeechConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unified configuration for studycam.
///
/// # Example
///
/// ```rust
/// use studycam::config::{Provider, StudyConfig};
///
/// let config = StudyConfig::default();
/// assert_eq!(config.analysis.provider, Provider::Google);
/// assert_eq!(config.history.capacity, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StudyConfig {
    /// Vision backend selection and settings
    pub analysis: AnalysisConfig,
    /// Frame source and schedule
    pub capture: CaptureConfig,
    /// Spoken feedback
    pub speech: SpeechConfig,
    /// History persistence
    pub history: HistoryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl StudyConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports STUDYCAM_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("STUDYCAM_PROVIDER") {
            if let Ok(p) = provider.parse() {
                self.analysis.provider = p;
            }
        }
        if let Ok(interval) = std::env::var("STUDYCAM_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.capture.interval_seconds = secs;
            }
        }
        if let Ok(path) = std::env::var("STUDYCAM_HISTORY_PATH") {
            self.history.path = Some(PathBuf::from(path));
        }

        // Logging settings
        if let Ok(level) = std::env::var("STUDYCAM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("STUDYCAM_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.analysis.provider {
            Provider::Google => {
                if self.analysis.google.base_url.is_empty() {
                    return Err(ConfigError::invalid(
                        "analysis.google.base_url",
                        "URL cannot be empty",
                    ));
                }
                if self.analysis.google.model.is_empty() {
                    return Err(ConfigError::invalid(
                        "analysis.google.model",
                        "model cannot be empty",
                    ));
                }
            }
            Provider::LmStudio => {
                if self.analysis.lmstudio.base_url.is_empty() {
                    return Err(ConfigError::invalid(
                        "analysis.lmstudio.base_url",
                        "URL cannot be empty",
                    ));
                }
                if self.analysis.lmstudio.model.is_empty() {
                    return Err(ConfigError::invalid(
                        "analysis.lmstudio.model",
                        "model cannot be empty",
                    ));
                }
            }
        }

        if self.analysis.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "analysis.timeout_seconds",
                "timeout must be non-zero",
            ));
        }

        if self.history.capacity == 0 || self.history.capacity > MAX_HISTORY {
            return Err(ConfigError::invalid(
                "history.capacity",
                format!("capacity must be between 1 and {}", MAX_HISTORY),
            ));
        }

        if self.capture.source == SourceKind::Command && self.capture.command.is_empty() {
            return Err(ConfigError::invalid(
                "capture.command",
                "command cannot be empty when source = \"command\"",
            ));
        }

        if self.speech.enabled && self.speech.command.is_empty() {
            return Err(ConfigError::invalid(
                "speech.command",
                "command cannot be empty when speech is enabled",
            ));
        }

        Ok(())
    }
}
