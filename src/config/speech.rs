//! Spoken feedback configuration

use serde::{Deserialize, Serialize};

/// Speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Text-to-speech argv; the utterance is appended as the last argument
    pub command: Vec<String>,
    /// Spoken before a hint
    pub hint_prefix: String,
    /// Spoken when nobody is at the desk
    pub absent_prompt: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["espeak".to_string()],
            hint_prefix: "Looks like you could use some help. ".to_string(),
            absent_prompt: "The student is not at the desk. Shall we start studying?".to_string(),
        }
    }
}
