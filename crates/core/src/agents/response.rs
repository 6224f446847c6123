//! Helpers for turning model output into usable text.

use crate::agents::base::AgentError;
use serde::de::DeserializeOwned;

/// Removes a surrounding Markdown code fence, with or without a language
/// tag (```` ```mermaid ````, ```` ```json ````). Unfenced text is returned
/// trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string on the opening fence line
    let body = match after_open.find('\n') {
        Some(idx) => &after_open[idx + 1..],
        None => after_open,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parses a JSON object out of a model response, tolerating a code fence
/// around it.
pub fn parse_json_response<T: DeserializeOwned>(content: &str) -> Result<T, AgentError> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| AgentError::ResponseParse(format!("invalid JSON from model: {e}")))
}
