//! LM Studio agent implementation.

use super::{parser, prompt, AgentError, AgentProfile, AnalysisResult, Frame, VisionAgent};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// LM Studio agent implementation.
///
/// LM Studio provides an OpenAI-compatible API for local inference. The frame
/// is attached as an `image_url` part holding a `data:` URL.
pub struct LMStudioAgent {
    /// Unique agent ID
    id: String,
    /// Human-readable name
    name: String,
    /// Base URL (e.g., "http://localhost:1234")
    base_url: String,
    /// Loaded vision model identifier
    model: String,
    /// Completion token cap
    max_tokens: u32,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl LMStudioAgent {
    pub fn new(
        id: String,
        name: String,
        base_url: String,
        model: String,
        max_tokens: u32,
        client: Arc<Client>,
    ) -> Self {
        Self {
            id,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            client,
        }
    }

    fn build_request(&self, frame: &Frame) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt::analysis_prompt()},
                    {"type": "image_url", "image_url": {"url": frame.to_data_url()}}
                ]
            }],
            "temperature": 0,
            "max_tokens": self.max_tokens
        })
    }
}

/// OpenAI-compatible chat completion response, reduced to what we read.
#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl VisionAgent for LMStudioAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            backend_type: "lmstudio".to_string(),
            model: self.model.clone(),
            remote: false, // Local backend
        }
    }

    async fn analyze(&self, frame: &Frame) -> Result<AnalysisResult, AgentError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.build_request(frame))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, REQUEST_TIMEOUT_SECS * 1000))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse completion response: {}", e))
        })?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AgentError::InvalidResponse("completion contained no message content".to_string())
            })?;
        tracing::trace!(backend = "lmstudio", raw = %text, "model reply");

        parser::parse_analysis(&text)
    }
}
