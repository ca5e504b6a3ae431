//! Extraction of the JSON payload from free-form model replies.
//!
//! Vision models often wrap the requested object in commentary or code
//! fences. The parser locates the first balanced `{...}` span and decodes
//! only that.

use super::{AgentError, AnalysisResult};

/// Return the first balanced `{...}` span in `text`.
///
/// Braces inside JSON string literals are ignored. Returns `None` when there
/// is no `{` or the first one is never closed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Decode an [`AnalysisResult`] from a raw model reply.
///
/// `error` is reserved for failed requests, so any `error` key the model
/// emits is dropped.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AgentError> {
    let json = extract_json_object(text).ok_or_else(|| {
        AgentError::MalformedResponse("no JSON object found in model reply".to_string())
    })?;

    let mut result: AnalysisResult = serde_json::from_str(json)
        .map_err(|e| AgentError::MalformedResponse(format!("failed to decode analysis: {}", e)))?;
    result.error = None;
    Ok(result)
}
