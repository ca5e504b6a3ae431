//! CLI module for studycam
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `watch` - Run the capture loop until interrupted
//! - `analyze` - Analyse a single image file
//! - `history` - Inspect or clear the study log (list, clear)
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Watch with a 30 second interval against LM Studio
//! studycam watch --interval 30 --provider lmstudio
//!
//! # Show the last 10 entries
//! studycam history list --limit 10
//!
//! # Generate shell completions
//! studycam completions bash > ~/.bash_completion.d/studycam
//! ```

pub mod analyze;
pub mod completions;
pub mod config;
pub mod history;
pub mod output;
pub mod watch;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::Provider;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// studycam - camera-driven study companion
#[derive(Parser, Debug)]
#[command(
    name = "studycam",
    version,
    about = "Watches a study desk through a camera and gives spoken feedback"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture and analyse frames until interrupted
    Watch(WatchArgs),
    /// Analyse a single image file
    Analyze(AnalyzeArgs),
    /// Inspect the study log
    #[command(subcommand)]
    History(HistoryCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "studycam.toml")]
    pub config: PathBuf,

    /// Seconds between captures (minimum 5)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Vision provider (google, lmstudio)
    #[arg(short, long)]
    pub provider: Option<Provider>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Disable spoken feedback
    #[arg(long)]
    pub no_speech: bool,

    /// Keep history in memory only
    #[arg(long)]
    pub no_persist: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image file to analyse (JPEG or PNG)
    pub image: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Send the image as-is, without grayscale/contrast enhancement
    #[arg(long)]
    pub no_preprocess: bool,

    /// Vision provider (google, lmstudio)
    #[arg(short, long)]
    pub provider: Option<Provider>,

    /// Path to configuration file
    #[arg(short, long, default_value = "studycam.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List entries, newest first
    List(HistoryListArgs),
    /// Delete all entries
    Clear(HistoryClearArgs),
}

#[derive(Args, Debug)]
pub struct HistoryListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show at most this many entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Path to configuration file
    #[arg(short, long, default_value = "studycam.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct HistoryClearArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "studycam.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "studycam.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load the config file if present, then apply `STUDYCAM_*` overrides.
pub(crate) fn load_config(
    path: &std::path::Path,
) -> Result<crate::config::StudyConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        crate::config::StudyConfig::load(Some(path))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        crate::config::StudyConfig::default()
    };

    Ok(config.with_env_overrides())
}
