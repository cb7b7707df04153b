//! Study assistant: prompts, model calls, reply parsing and fallbacks
//!
//! Every operation degrades to its deterministic fallback when no model is
//! configured. Only summaries surface model errors, and only when the
//! provider is not merely overloaded.

use super::client::{GenerationError, GenerativeModel};
use super::content::{FlashcardContent, QuizContent, SearchResults, SuggestionReply};
use super::fallback;
use super::health::ProviderHealth;
use super::prompts::{self, DocumentExcerpt};
use super::response::{clean_response_text, parse_json_payload};
use crate::config::{AiConfig, GenerationProfile};
use crate::metrics::{Metrics, Operation, Outcome};
use std::sync::Arc;
use std::time::Instant;

const MIN_SUGGESTION_PARTIAL_CHARS: usize = 2;
const MAX_SUGGESTIONS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Failed to generate summary: {0}")]
    Generation(#[from] GenerationError),
}

impl AssistantError {
    pub fn is_overloaded(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_overloaded(),
        }
    }
}

pub struct StudyAssistant {
    model: Option<Arc<dyn GenerativeModel>>,
    standard: GenerationProfile,
    brief: GenerationProfile,
    health: ProviderHealth,
    metrics: Arc<Metrics>,
}

impl StudyAssistant {
    pub fn new(
        model: Option<Arc<dyn GenerativeModel>>,
        config: &AiConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        match &model {
            Some(model) => tracing::info!(model = model.model_name(), "AI features enabled"),
            None => tracing::warn!(
                api_key_env = %config.api_key_env,
                "No model API key configured; AI features will use fallback methods"
            ),
        }

        Self {
            model,
            standard: config.standard,
            brief: config.brief,
            health: ProviderHealth::new(),
            metrics,
        }
    }

    /// Whether a model client is available
    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    pub fn health(&self) -> &ProviderHealth {
        &self.health
    }

    /// Run one model call, recording latency and provider health
    ///
    /// `None` when no model is configured.
    async fn call(
        &self,
        operation: Operation,
        prompt: &str,
        profile: &GenerationProfile,
    ) -> Option<Result<String, GenerationError>> {
        let model = self.model.as_ref()?;

        let started = Instant::now();
        let result = model.generate(prompt, profile).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Err(e) = self.metrics.record_ai_duration(operation, elapsed_ms) {
            tracing::warn!(error = %e, "Failed to record AI duration");
        }

        match &result {
            Ok(_) => self.health.mark_success().await,
            Err(e) => {
                tracing::warn!(
                    operation = operation.as_str(),
                    error = %e,
                    overloaded = e.is_overloaded(),
                    "Model call failed"
                );
                self.health.mark_failure().await;
            }
        }
        Some(result)
    }

    fn used_fallback(&self, operation: Operation) {
        self.metrics.record_ai_outcome(operation, Outcome::Fallback);
    }

    fn used_model(&self, operation: Operation) {
        self.metrics.record_ai_outcome(operation, Outcome::Ai);
    }

    pub async fn summarize(&self, text: &str) -> Result<String, AssistantError> {
        let op = Operation::Summary;
        match self.call(op, &prompts::summary(text), &self.brief).await {
            Some(Ok(reply)) => {
                self.used_model(op);
                Ok(clean_response_text(&reply))
            }
            Some(Err(e)) if e.is_overloaded() => {
                tracing::info!("Model is overloaded, returning fallback summary");
                self.used_fallback(op);
                Ok(fallback::summary(text))
            }
            Some(Err(e)) => {
                self.metrics.record_ai_outcome(op, Outcome::Error);
                Err(e.into())
            }
            None => {
                self.used_fallback(op);
                Ok(fallback::summary(text))
            }
        }
    }

    pub async fn quiz(&self, text: &str) -> QuizContent {
        let op = Operation::Quiz;
        if let Some(Ok(reply)) = self.call(op, &prompts::quiz(text), &self.standard).await {
            match parse_json_payload::<QuizContent>(&reply) {
                Ok(quiz) => {
                    self.used_model(op);
                    return quiz;
                }
                Err(e) => tracing::warn!(error = %e, "Quiz reply was not valid quiz JSON"),
            }
        }
        self.used_fallback(op);
        fallback::quiz(text)
    }

    pub async fn flashcards(&self, text: &str) -> FlashcardContent {
        let op = Operation::Flashcards;
        if let Some(Ok(reply)) = self.call(op, &prompts::flashcards(text), &self.standard).await {
            match parse_json_payload::<FlashcardContent>(&reply) {
                Ok(cards) => {
                    self.used_model(op);
                    return cards;
                }
                Err(e) => tracing::warn!(error = %e, "Flashcards reply was not valid flashcards JSON"),
            }
        }
        self.used_fallback(op);
        fallback::flashcards(text)
    }

    pub async fn answer(&self, context: &str, question: &str) -> String {
        let op = Operation::Answer;
        match self.call(op, &prompts::answer(context, question), &self.standard).await {
            Some(Ok(reply)) => {
                self.used_model(op);
                clean_response_text(reply.trim())
            }
            _ => {
                self.used_fallback(op);
                fallback::answer(context, question)
            }
        }
    }

    pub async fn search(&self, documents: &[DocumentExcerpt], query: &str) -> SearchResults {
        let op = Operation::Search;
        if let Some(Ok(reply)) = self.call(op, &prompts::search(documents, query), &self.standard).await {
            match parse_json_payload::<SearchResults>(&reply) {
                Ok(results) => {
                    self.used_model(op);
                    return results;
                }
                Err(e) => tracing::warn!(error = %e, "Search reply was not valid search JSON"),
            }
        }
        self.used_fallback(op);
        fallback::text_search(documents, query)
    }

    pub async fn suggestions(&self, documents: &[DocumentExcerpt], partial_query: &str) -> Vec<String> {
        let op = Operation::Suggestions;
        if partial_query.chars().count() < MIN_SUGGESTION_PARTIAL_CHARS {
            return Vec::new();
        }

        let reply = match self
            .call(op, &prompts::suggestions(documents, partial_query), &self.standard)
            .await
        {
            Some(Ok(reply)) => reply,
            Some(Err(GenerationError::EmptyResponse)) => {
                self.used_model(op);
                return Vec::new();
            }
            Some(Err(_)) | None => {
                self.used_fallback(op);
                return fallback::suggestions(documents, partial_query);
            }
        };

        match parse_json_payload::<SuggestionReply>(&reply) {
            Ok(parsed) => {
                self.used_model(op);
                let partial_lower = partial_query.to_lowercase();
                parsed
                    .suggestions
                    .iter()
                    .map(|s| clean_response_text(s))
                    .filter(|s| s.to_lowercase().contains(&partial_lower))
                    .take(MAX_SUGGESTIONS)
                    .collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Suggestions reply was not valid JSON");
                self.used_fallback(op);
                fallback::suggestions(documents, partial_query)
            }
        }
    }
}
