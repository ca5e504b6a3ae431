//! Vision backend configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which vision backend analyses frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini (cloud)
    #[default]
    Google,
    /// LM Studio OpenAI-compatible server (local)
    #[serde(alias = "lm_studio")]
    LmStudio,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(Provider::Google),
            "lmstudio" | "lm_studio" | "local" => Ok(Provider::LmStudio),
            _ => Err(format!("Invalid provider: {}", s)),
        }
    }
}

/// Analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub provider: Provider,
    /// Upper bound for one analysis call, including the model's response time
    pub timeout_seconds: u64,
    pub google: GoogleConfig,
    pub lmstudio: LmStudioConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Google,
            timeout_seconds: 30,
            google: GoogleConfig::default(),
            lmstudio: LmStudioConfig::default(),
        }
    }
}

/// Google Gemini settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Inline API key (takes precedence over `api_key_env`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-flash-lite-latest".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
        }
    }
}

// Configuration is debug-logged at startup; never print the inline key
impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// LM Studio settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LmStudioConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for LmStudioConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            model: "qwen/qwen2.5-vl-7b".to_string(),
            max_tokens: 500,
        }
    }
}
