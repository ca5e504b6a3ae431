//! Core types for frame analysis.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Page label the model reports when no page number is visible.
pub const PAGE_UNREADABLE: &str = "unrecognizable";

/// Placeholder used for fields that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// A still frame handed to a vision backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes` (e.g., "image/jpeg")
    pub mime_type: String,
}

impl Frame {
    /// Create a JPEG frame from raw bytes.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "image/jpeg".to_string(),
        }
    }

    /// Decode a `data:image/...;base64,` URL (or a bare base64 string, assumed JPEG).
    pub fn from_data_url(data: &str) -> Result<Self, base64::DecodeError> {
        let (mime_type, payload) = match data
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
        {
            Some((mime, payload)) => (mime.to_string(), payload),
            None => ("image/jpeg".to_string(), data),
        };

        Ok(Self {
            bytes: STANDARD.decode(payload.trim())?,
            mime_type,
        })
    }

    /// Standard base64 encoding of the frame bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URL form, as expected by OpenAI-style `image_url` parts.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Whether a person is detected at the desk.
///
/// Serialized as `true`, `false`, or the string `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    Present,
    Absent,
    #[default]
    Unknown,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Present => write!(f, "present"),
            Presence::Absent => write!(f, "absent"),
            Presence::Unknown => write!(f, "{}", UNKNOWN),
        }
    }
}

impl Serialize for Presence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Presence::Present => serializer.serialize_bool(true),
            Presence::Absent => serializer.serialize_bool(false),
            Presence::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl<'de> Deserialize<'de> for Presence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
            Null(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(true) => Presence::Present,
            Raw::Bool(false) => Presence::Absent,
            Raw::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" => Presence::Present,
                "false" => Presence::Absent,
                _ => Presence::Unknown,
            },
            Raw::Null(()) => Presence::Unknown,
        })
    }
}

/// Structured interpretation of one captured frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub present: Presence,
    #[serde(deserialize_with = "string_or_number")]
    pub page: String,
    pub status: String,
    pub need_hint: bool,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Placeholder result for a failed analysis.
    ///
    /// The message is prefixed with the provider label so the user knows
    /// which backend to check.
    pub fn failed(provider: &str, error: impl fmt::Display) -> Self {
        Self {
            present: Presence::Unknown,
            page: UNKNOWN.to_string(),
            status: "error".to_string(),
            need_hint: false,
            hint: String::new(),
            error: Some(format!("{} analysis failed: {}", provider, error)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True when the model could read a page label.
    pub fn page_readable(&self) -> bool {
        !self.page.is_empty() && self.page != PAGE_UNREADABLE && self.page != UNKNOWN
    }
}

/// Accept `"12"`, `12`, or `null` for string fields.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

/// Static description of an agent, for logging and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    /// Provider key ("google", "lmstudio")
    pub backend_type: String,
    /// Model identifier sent to the backend
    pub model: String,
    /// Whether frames leave the local machine
    pub remote: bool,
}
