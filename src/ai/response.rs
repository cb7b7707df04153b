//! Post-processing of raw model replies

use serde::de::DeserializeOwned;

/// Remove every asterisk and collapse whitespace runs to single spaces
pub fn clean_response_text(text: &str) -> String {
    text.replace('*', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove every Markdown code fence and a leading `json` language tag
pub fn strip_json_fences(text: &str) -> String {
    let unfenced = text.replace("```json", "").replace("```", "");
    let unfenced = unfenced.trim();
    unfenced.strip_prefix("json").unwrap_or(unfenced).trim().to_string()
}

/// Decode a JSON reply after fence stripping and cleaning
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let cleaned = clean_response_text(&strip_json_fences(text));
    serde_json::from_str(&cleaned)
}
