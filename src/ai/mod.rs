//! AI-assisted study aids
//!
//! - [`client`]: the [`GenerativeModel`] seam and the Gemini REST client
//! - [`prompts`]: prompt builders and input limits
//! - [`response`]: cleaning and JSON decoding of model replies
//! - [`fallback`]: deterministic generators used when the model is unavailable
//! - [`assistant`]: the operations handlers call

pub mod assistant;
pub mod client;
pub mod content;
pub mod fallback;
pub mod health;
pub mod prompts;
pub mod response;

pub use assistant::{AssistantError, StudyAssistant};
pub use client::{GeminiClient, GenerationError, GenerativeModel};
pub use content::{FlashcardContent, FlashcardDraft, QuizContent, QuizQuestion, SearchHit, SearchResults};
pub use health::{HealthState, ProviderHealth};
pub use prompts::DocumentExcerpt;
