//! Spoken feedback.

use crate::config::SpeechConfig;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("speech IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("speech command exited with {0}")]
    CommandFailed(String),

    #[error("speech command is empty")]
    EmptyCommand,
}

/// Text-to-speech sink.
#[async_trait]
pub trait Speaker: Send + Sync + 'static {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Build the configured speaker (silent when speech is disabled).
pub fn create_speaker(config: &SpeechConfig) -> Arc<dyn Speaker> {
    if config.enabled {
        Arc::new(CommandSpeaker::new(config.command.clone()))
    } else {
        Arc::new(NullSpeaker)
    }
}

/// Runs a TTS program with the utterance as its last argument.
pub struct CommandSpeaker {
    argv: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let (program, args) = self.argv.split_first().ok_or(SpeechError::EmptyCommand)?;

        let status = tokio::process::Command::new(program)
            .args(args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        if !status.success() {
            return Err(SpeechError::CommandFailed(status.to_string()));
        }
        Ok(())
    }
}

/// Logs utterances instead of speaking them.
pub struct NullSpeaker;

#[async_trait]
impl Speaker for NullSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        tracing::info!(utterance = %text, "speech disabled, not speaking");
        Ok(())
    }
}
