//! Vision agent abstraction layer.
//!
//! This module provides the `VisionAgent` trait, its Google and LM Studio
//! implementations, and the `AnalysisClient` wrapper that turns every
//! failure into an error-carrying [`AnalysisResult`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod error;
pub mod factory;
pub mod google;
pub mod lmstudio;
pub mod parser;
pub mod prompt;
pub mod types;

// Re-export key types for convenience
pub use error::AgentError;
pub use types::{AgentProfile, AnalysisResult, Frame, Presence, PAGE_UNREADABLE, UNKNOWN};

/// Unified interface for vision-model backends.
///
/// Encapsulates backend-specific HTTP protocols and reply extraction. Every
/// implementation sends [`prompt::analysis_prompt`] with the frame and decodes
/// the reply with [`parser::parse_analysis`].
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn VisionAgent>`.
///
/// # Cancellation Safety
///
/// Dropping the `analyze` future aborts the in-flight HTTP request.
#[async_trait]
pub trait VisionAgent: Send + Sync + 'static {
    /// Unique identifier for this agent instance.
    fn id(&self) -> &str;

    /// Provider label used in logs and error messages (e.g., "Gemini").
    fn name(&self) -> &str;

    /// Agent profile with provider type and model.
    fn profile(&self) -> AgentProfile;

    /// Analyse one frame.
    ///
    /// # Returns
    ///
    /// - `Ok(AnalysisResult)` when the backend replied with a decodable object
    /// - `Err(AgentError::Upstream)` on a 4xx/5xx reply
    /// - `Err(AgentError::Network)` / `Err(AgentError::Timeout)` on transport failure
    /// - `Err(AgentError::MalformedResponse)` when the reply holds no JSON object
    async fn analyze(&self, frame: &Frame) -> Result<AnalysisResult, AgentError>;
}

/// Non-failing front for a [`VisionAgent`].
///
/// Bounds each call with a timeout and converts every error into
/// [`AnalysisResult::failed`], so callers never handle errors for analysis.
#[derive(Clone)]
pub struct AnalysisClient {
    agent: Arc<dyn VisionAgent>,
    timeout: Duration,
}

impl AnalysisClient {
    pub fn new(agent: Arc<dyn VisionAgent>, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    pub fn agent(&self) -> &Arc<dyn VisionAgent> {
        &self.agent
    }

    /// Analyse a frame, never failing.
    pub async fn analyze(&self, frame: &Frame) -> AnalysisResult {
        let provider = self.agent.profile().backend_type;
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.agent.analyze(frame)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(self.timeout.as_millis() as u64)),
        };

        let latency = start.elapsed();
        metrics::histogram!("studycam_analysis_duration_seconds", "provider" => provider.clone())
            .record(latency.as_secs_f64());

        match outcome {
            Ok(result) => {
                metrics::counter!("studycam_analyses_total",
                    "provider" => provider,
                    "status" => "success"
                )
                .increment(1);
                tracing::debug!(
                    agent_id = %self.agent.id(),
                    latency_ms = latency.as_millis() as u64,
                    present = %result.present,
                    page = %result.page,
                    "analysis completed"
                );
                result
            }
            Err(e) => {
                metrics::counter!("studycam_analyses_total",
                    "provider" => provider,
                    "status" => "error"
                )
                .increment(1);
                tracing::warn!(
                    agent_id = %self.agent.id(),
                    latency_ms = latency.as_millis() as u64,
                    error = %e,
                    "analysis failed"
                );
                AnalysisResult::failed(self.agent.name(), &e)
            }
        }
    }
}
