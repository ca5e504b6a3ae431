//! Shared test utilities for studycam integration tests.
//!
//! Provides scripted frame sources, speakers, and mock-server replies so the
//! capture loop can be driven end to end without a camera or a model.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use studycam::agent::Frame;
use studycam::capture::{CaptureError, FrameSource, Speaker, SpeechError};

// =============================================================================
// Frame Sources
// =============================================================================

/// Returns the same frame on every capture and counts calls.
pub struct StaticSource {
    frame: Option<Frame>,
    captures: AtomicUsize,
}

impl StaticSource {
    pub fn jpeg() -> Self {
        Self {
            frame: Some(Frame::jpeg(vec![0xff, 0xd8, 0xff, 0xe0])),
            captures: AtomicUsize::new(0),
        }
    }

    /// A camera that never has a frame ready.
    pub fn empty() -> Self {
        Self {
            frame: None,
            captures: AtomicUsize::new(0),
        }
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for StaticSource {
    async fn capture(&self) -> Result<Option<Frame>, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.frame.clone())
    }

    fn describe(&self) -> String {
        "static test frame".to_string()
    }
}

// =============================================================================
// Speakers
// =============================================================================

/// Records every utterance.
#[derive(Default)]
pub struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

// =============================================================================
// Mock Server Replies
// =============================================================================

/// OpenAI-compatible completion body whose message content is `content`.
pub fn lmstudio_reply(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// Gemini generateContent body whose candidate text is `text`.
pub fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

/// Model output for a student who is present and solving a page.
pub const SOLVING: &str =
    r#"{"present": true, "page": "42", "status": "solving", "needHint": false, "hint": ""}"#;

/// Model output for a stuck student, wrapped in a code fence.
pub const STUCK: &str = "```json\n{\"present\": true, \"page\": 17, \"status\": \"stuck\", \"needHint\": true, \"hint\": \"Try drawing the figure.\"}\n```";

/// Model output for an empty desk.
pub const AWAY: &str =
    r#"{"present": false, "page": "unrecognizable", "status": "away", "needHint": false, "hint": ""}"#;
