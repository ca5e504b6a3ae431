//! Agent factory for creating VisionAgent trait objects from configuration.

use super::{google::GoogleAIAgent, lmstudio::LMStudioAgent, AgentError, VisionAgent};
use crate::config::{AnalysisConfig, Provider};
use reqwest::Client;
use std::sync::Arc;

/// Create the configured vision agent.
///
/// The provider is chosen once here; the rest of the program only sees
/// `Arc<dyn VisionAgent>`.
///
/// # Examples
///
/// ```
/// use studycam::agent::factory::create_agent;
/// use studycam::config::{AnalysisConfig, Provider};
/// use reqwest::Client;
/// use std::sync::Arc;
///
/// let mut config = AnalysisConfig::default();
/// config.provider = Provider::LmStudio;
///
/// let agent = create_agent(&config, Arc::new(Client::new())).unwrap();
/// assert_eq!(agent.profile().backend_type, "lmstudio");
/// ```
pub fn create_agent(
    config: &AnalysisConfig,
    client: Arc<Client>,
) -> Result<Arc<dyn VisionAgent>, AgentError> {
    match config.provider {
        Provider::Google => {
            let google = &config.google;
            // Inline key first, then the configured env var
            let api_key = match &google.api_key {
                Some(key) => key.clone(),
                None => std::env::var(&google.api_key_env).map_err(|e| {
                    AgentError::Configuration(format!(
                        "Failed to read API key from env var '{}': {}",
                        google.api_key_env, e
                    ))
                })?,
            };

            Ok(Arc::new(GoogleAIAgent::new(
                "google".to_string(),
                "Gemini".to_string(),
                google.base_url.clone(),
                google.model.clone(),
                api_key,
                client,
            )))
        }
        Provider::LmStudio => {
            let lmstudio = &config.lmstudio;
            Ok(Arc::new(LMStudioAgent::new(
                "lmstudio".to_string(),
                "Local AI (LM Studio)".to_string(),
                lmstudio.base_url.clone(),
                lmstudio.model.clone(),
                lmstudio.max_tokens,
                client,
            )))
        }
    }
}
