//! Structured study aids produced by the model or by the fallbacks
//!
//! The model's JSON is decoded into these types; a reply that does not fit
//! them is treated as a failed generation.

use serde::{Deserialize, Deserializer, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizContent {
    pub questions: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fallback_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardDraft {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardContent {
    pub flashcards: Vec<FlashcardDraft>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fallback_mode: bool,
}

/// Models return ids as `"3"` or `3`
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(text) => text,
        Repr::Int(value) => value.to_string(),
        Repr::Float(value) => value.to_string(),
    })
}

/// Scores arrive as integers, floats or numeric strings; anything else is 0
fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Int(value) => value,
        Repr::Float(value) => value.round() as i64,
        Repr::Text(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|v| v.round() as i64))
                .unwrap_or(0)
        }
        Repr::Other(_) => 0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(deserialize_with = "lenient_id")]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub relevance_score: i64,
    /// Link to the document page, set by the search endpoint
    #[serde(default)]
    pub document_url: Option<String>,
}

impl SearchHit {
    /// `/documents/<id>/` when the id is an integer
    pub fn link_document(&mut self) {
        self.document_url = self
            .document_id
            .trim()
            .parse::<i64>()
            .ok()
            .map(|id| format!("/documents/{}/", id));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub total_found: usize,
    #[serde(default)]
    pub search_summary: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct SuggestionReply {
    #[serde(default)]
    pub suggestions: Vec<String>,
}
