//! Google AI (Gemini) agent implementation.

use super::{parser, prompt, AgentError, AgentProfile, AnalysisResult, Frame, VisionAgent};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Google AI agent implementation.
///
/// Sends the prompt and the frame as an inline-data part:
/// - POST /v1beta/models/{model}:generateContent
/// - API key in the `x-goog-api-key` header, never in the URL
/// - Reply text is the concatenation of the first candidate's parts
pub struct GoogleAIAgent {
    /// Unique agent ID
    id: String,
    /// Human-readable name
    name: String,
    /// Base URL (e.g., "https://generativelanguage.googleapis.com")
    base_url: String,
    /// Model identifier (e.g., "gemini-flash-lite-latest")
    model: String,
    /// API key sent in the `x-goog-api-key` header
    api_key: String,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl GoogleAIAgent {
    pub fn new(
        id: String,
        name: String,
        base_url: String,
        model: String,
        api_key: String,
        client: Arc<Client>,
    ) -> Self {
        Self {
            id,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client,
        }
    }

    /// Build the generateContent request for a frame.
    fn build_request(&self, frame: &Frame) -> GoogleRequest {
        GoogleRequest {
            contents: vec![GoogleContent {
                role: "user".to_string(),
                parts: vec![
                    GooglePart::Text {
                        text: prompt::analysis_prompt(),
                    },
                    GooglePart::InlineData {
                        inline_data: GoogleInlineData {
                            mime_type: frame.mime_type.clone(),
                            data: frame.to_base64(),
                        },
                    },
                ],
            }],
            generation_config: GoogleGenerationConfig { temperature: 0.0 },
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(response: GoogleResponse) -> Result<String, AgentError> {
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            AgentError::InvalidResponse("Google response contained no candidates".to_string())
        })?;

        Ok(candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<String>>()
            .join(""))
    }
}

/// Google Generative AI request format
#[derive(Debug, Serialize)]
struct GoogleRequest {
    contents: Vec<GoogleContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GoogleGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GoogleContent {
    role: String,
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GooglePart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GoogleInlineData,
    },
}

#[derive(Debug, Serialize)]
struct GoogleInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GoogleGenerationConfig {
    temperature: f32,
}

/// Google Generative AI response format
#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Debug, Deserialize)]
struct GoogleCandidate {
    content: GoogleReplyContent,
}

#[derive(Debug, Deserialize)]
struct GoogleReplyContent {
    #[serde(default)]
    parts: Vec<GoogleReplyPart>,
}

#[derive(Debug, Deserialize)]
struct GoogleReplyPart {
    text: Option<String>,
}

#[async_trait]
impl VisionAgent for GoogleAIAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            backend_type: "google".to_string(),
            model: self.model.clone(),
            remote: true, // Cloud service
        }
    }

    async fn analyze(&self, frame: &Frame) -> Result<AnalysisResult, AgentError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        tracing::debug!(
            backend = "google",
            agent_id = %self.id,
            model = %self.model,
            frame_bytes = frame.bytes.len(),
            "sending frame for analysis"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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

        let body: GoogleResponse = response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse Google response: {}", e))
        })?;

        let text = Self::extract_text(body)?;
        tracing::trace!(backend = "google", raw = %text, "model reply");

        parser::parse_analysis(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Presence;
    use mockito::{Matcher, Server};

    fn test_agent(base_url: String) -> GoogleAIAgent {
        GoogleAIAgent::new(
            "test-google".to_string(),
            "Gemini".to_string(),
            base_url,
            "gemini-test".to_string(),
            "test-key".to_string(),
            Arc::new(Client::new()),
        )
    }

    fn reply_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("inlineData".to_string()),
                Matcher::Regex("image/jpeg".to_string()),
                Matcher::Regex("needHint".to_string()),
            ]))
            .with_status(200)
            .with_body(reply_body(
                "```json\n{\"present\":false,\"page\":\"unrecognizable\",\"status\":\"new page\",\"needHint\":false,\"hint\":\"\"}\n```",
            ))
            .create_async()
            .await;

        let agent = test_agent(server.url());
        let result = agent.analyze(&Frame::jpeg(vec![1, 2, 3])).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.present, Presence::Absent);
        assert!(!result.page_readable());
        assert_eq!(result.status, "new page");
    }

    #[tokio::test]
    async fn test_analyze_joins_parts() {
        let mut server = Server::new_async().await;
        let body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "{\"present\":true,"},
                    {"text": "\"page\":\"8\"}"}
                ]}
            }]
        });
        server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let result = test_agent(server.url())
            .analyze(&Frame::jpeg(vec![1]))
            .await
            .unwrap();
        assert_eq!(result.page, "8");
    }

    #[tokio::test]
    async fn test_analyze_upstream_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(403)
            .with_body("API key not valid")
            .create_async()
            .await;

        let err = test_agent(server.url())
            .analyze(&Frame::jpeg(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Upstream { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_analyze_no_candidates() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let err = test_agent(server.url())
            .analyze(&Frame::jpeg(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_analyze_prose_reply_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(reply_body("The image is too dark to read."))
            .create_async()
            .await;

        let err = test_agent(server.url())
            .analyze(&Frame::jpeg(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_key() {
        let agent = GoogleAIAgent::new(
            "test-google".to_string(),
            "Gemini".to_string(),
            "http://127.0.0.1:1".to_string(),
            "m".to_string(),
            "SECRETKEY123".to_string(),
            Arc::new(Client::new()),
        );

        let err = agent.analyze(&Frame::jpeg(vec![1])).await.unwrap_err();
        assert!(matches!(err, AgentError::Network(_)));
        assert!(!err.to_string().contains("SECRETKEY123"), "{}", err);

        let result = crate::agent::AnalysisClient::new(Arc::new(agent), Duration::from_secs(5))
            .analyze(&Frame::jpeg(vec![1]))
            .await;
        assert!(!result.error.unwrap().contains("SECRETKEY123"));
    }

    #[test]
    fn test_profile() {
        let agent = test_agent("https://generativelanguage.googleapis.com/".to_string());
        let profile = agent.profile();

        assert_eq!(profile.backend_type, "google");
        assert_eq!(profile.model, "gemini-test");
        assert!(profile.remote);
        assert_eq!(agent.base_url, "https://generativelanguage.googleapis.com");
    }
}
