//! Document-scoped study aids: summaries, quizzes, flashcards and Q&A
//!
//! Every handler follows the same sequence: ownership and text checks,
//! cache lookup, per-key generation lock, generation, persistence. The lock
//! guard is released when the handler returns, whatever the outcome.

use crate::ai::AssistantError;
use crate::error::{AppError, AppResult};
use crate::handlers::{ApiJson, AppState};
use crate::metrics::Operation;
use crate::middleware::AuthUser;
use crate::store::documents::{self, TextState};
use crate::store::study::{self, FlashcardSet, Quiz};
use crate::store::caches;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

pub(crate) const DOCUMENT_NOT_FOUND: &str = "Document not found.";
const TEXT_NOT_EXTRACTED: &str = "Text not extracted from document.";

/// A document's title and usable text
pub(crate) struct ReadyDocument {
    pub id: i64,
    pub title: String,
    pub text: String,
}

/// Load the caller's document and make sure its text can be used
///
/// `action` completes the sentence "Cannot <action>." when extraction failed.
pub(crate) async fn ready_document(
    state: &AppState,
    document_id: i64,
    user_id: i64,
    action: &str,
) -> AppResult<ReadyDocument> {
    let document = state
        .store()
        .run(move |conn| documents::get_for_user(conn, document_id, user_id))
        .await?
        .ok_or_else(|| AppError::NotFound(DOCUMENT_NOT_FOUND.to_string()))?;

    let text = match document.text_state() {
        TextState::Missing => return Err(AppError::Validation(TEXT_NOT_EXTRACTED.to_string())),
        TextState::Failed(marker) => {
            return Err(AppError::Validation(format!("Cannot {}. {}", action, marker)));
        }
        TextState::Ready(text) => text.to_string(),
    };

    Ok(ReadyDocument {
        id: document.id,
        title: document.title,
        text,
    })
}

/// Lowercase hex SHA-256 of `input`
pub(crate) fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

pub(crate) fn lock_ttl(state: &AppState) -> Duration {
    Duration::from_secs(state.config().cache.generation_lock_seconds)
}

fn busy(state: &AppState, operation: Operation, message: &str) -> AppError {
    state.metrics().lock_contended(operation);
    AppError::Busy(message.to_string())
}

/// Map a surfaced model error to 503 (overloaded) or 500
fn generation_failure(err: AssistantError, thing: &str) -> AppError {
    if err.is_overloaded() {
        AppError::AiUnavailable {
            message: format!("AI {} is temporarily unavailable due to high demand.", thing),
            details: format!(
                "We're using a basic {} instead. Please try again in a few minutes for AI-powered {}.",
                thing, thing
            ),
        }
    } else {
        AppError::GenerationFailed(format!("Failed to generate {}. Please try again later.", thing))
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

pub async fn summarize(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<SummaryResponse>> {
    let document = ready_document(&state, id, user.id, "generate summary").await?;
    let cache_key = format!("summary_doc_{}", document.id);

    if let Some(summary) = state.caches().summaries.get(&cache_key) {
        state.metrics().cache_hit(Operation::Summary);
        return Ok(Json(SummaryResponse { summary }));
    }

    let lock_key = format!("summary_lock_{}", document.id);
    let Some(_guard) = state.caches().locks.try_acquire(&lock_key, lock_ttl(&state)) else {
        return Err(busy(
            &state,
            Operation::Summary,
            "Summary is already being generated. Please wait a moment and try again.",
        ));
    };

    let summary = state
        .assistant()
        .summarize(&document.text)
        .await
        .map_err(|e| {
            tracing::error!(document_id = document.id, error = %e, "Summary generation failed");
            generation_failure(e, "summary")
        })?;

    let ttl = Duration::from_secs(state.config().cache.summary_ttl_seconds);
    state.caches().summaries.insert(cache_key, summary.clone(), ttl);
    Ok(Json(SummaryResponse { summary }))
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<Quiz>)> {
    let document = ready_document(&state, id, user.id, "generate quiz").await?;
    let document_id = document.id;

    if let Some(existing) = state
        .store()
        .run(move |conn| study::first_quiz_for_document(conn, document_id))
        .await?
    {
        state.metrics().cache_hit(Operation::Quiz);
        return Ok((StatusCode::OK, Json(existing)));
    }

    let lock_key = format!("quiz_lock_{}", document_id);
    let Some(_guard) = state.caches().locks.try_acquire(&lock_key, lock_ttl(&state)) else {
        return Err(busy(
            &state,
            Operation::Quiz,
            "Quiz is already being generated. Please wait a moment and try again.",
        ));
    };

    let content = state.assistant().quiz(&document.text).await;
    let questions = serde_json::to_value(&content)
        .map_err(|e| AppError::Internal(format!("Failed to encode quiz: {}", e)))?;
    let title = format!("Quiz for {}", document.title);

    let quiz = state
        .store()
        .run(move |conn| study::create_quiz(conn, document_id, &title, &questions))
        .await?;
    tracing::info!(
        document_id,
        quiz_id = quiz.id,
        questions = content.questions.len(),
        fallback = content.fallback_mode,
        "Quiz created"
    );
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn generate_flashcards(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<FlashcardSet>)> {
    let document = ready_document(&state, id, user.id, "generate flashcards").await?;
    let document_id = document.id;

    if let Some(existing) = state
        .store()
        .run(move |conn| study::first_set_for_document(conn, document_id))
        .await?
    {
        state.metrics().cache_hit(Operation::Flashcards);
        return Ok((StatusCode::OK, Json(existing)));
    }

    let lock_key = format!("flashcards_lock_{}", document_id);
    let Some(_guard) = state.caches().locks.try_acquire(&lock_key, lock_ttl(&state)) else {
        return Err(busy(
            &state,
            Operation::Flashcards,
            "Flashcards are already being generated. Please wait a moment and try again.",
        ));
    };

    let content = state.assistant().flashcards(&document.text).await;
    let cards: Vec<(String, String)> = content
        .flashcards
        .into_iter()
        .map(|card| (card.front, card.back))
        .collect();
    let title = format!("Flashcards for {}", document.title);

    let set = state
        .store()
        .run(move |conn| study::create_set_with_cards(conn, document_id, &title, &cards))
        .await?;
    tracing::info!(
        document_id,
        flashcard_set_id = set.id,
        cards = set.flashcards.len(),
        "Flashcard set created"
    );
    Ok((StatusCode::CREATED, Json(set)))
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: String,
}

/// Reject missing or over-long questions before touching the document
fn validate_question(question: Option<String>, max_chars: usize) -> AppResult<String> {
    let question = question
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("Question not provided.".to_string()))?;
    if question.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "Question is too long. Please keep it under {} characters.",
            max_chars
        )));
    }
    Ok(question)
}

pub async fn answer_question(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<QuestionRequest>,
) -> AppResult<Json<AnswerResponse>> {
    let question = validate_question(request.question, state.config().limits.max_question_chars)?;
    let document = ready_document(&state, id, user.id, "answer questions").await?;
    let document_id = document.id;

    let question_hash = sha256_hex(&question.trim().to_lowercase());
    let lookup_hash = question_hash.clone();
    if let Some(answer) = state
        .store()
        .run(move |conn| caches::get_answer(conn, document_id, &lookup_hash))
        .await?
    {
        state.metrics().cache_hit(Operation::Answer);
        return Ok(Json(AnswerResponse { question, answer }));
    }

    let lock_key = format!("qa_lock_{}_{}", document_id, &question_hash[..16]);
    let Some(_guard) = state.caches().locks.try_acquire(&lock_key, lock_ttl(&state)) else {
        return Err(busy(
            &state,
            Operation::Answer,
            "This question is already being processed. Please wait a moment and try again.",
        ));
    };

    let answer = state.assistant().answer(&document.text, &question).await;

    let (stored_question, stored_answer) = (question.clone(), answer.clone());
    state
        .store()
        .run(move |conn| {
            caches::insert_answer(
                conn,
                document_id,
                &question_hash,
                &stored_question,
                &stored_answer,
            )
        })
        .await?;

    Ok(Json(AnswerResponse { question, answer }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerationError;

    #[test]
    fn test_sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_question_validation() {
        assert!(matches!(
            validate_question(None, 1000),
            Err(AppError::Validation(msg)) if msg == "Question not provided."
        ));
        assert!(validate_question(Some(String::new()), 1000).is_err());
        assert!(validate_question(Some("é".repeat(1000)), 1000).is_ok());
        assert!(matches!(
            validate_question(Some("x".repeat(1001)), 1000),
            Err(AppError::Validation(msg)) if msg.starts_with("Question is too long.")
        ));
    }

    #[test]
    fn test_generation_failure_mapping() {
        let overloaded = AssistantError::Generation(GenerationError::Status {
            status: 503,
            message: "The model is overloaded.".to_string(),
        });
        match generation_failure(overloaded, "summary") {
            AppError::AiUnavailable { message, details } => {
                assert_eq!(message, "AI summary is temporarily unavailable due to high demand.");
                assert_eq!(
                    details,
                    "We're using a basic summary instead. Please try again in a few minutes for AI-powered summary."
                );
            }
            other => panic!("expected AiUnavailable, got {:?}", other),
        }

        let rejected = AssistantError::Generation(GenerationError::Status {
            status: 400,
            message: "API key not valid.".to_string(),
        });
        assert!(matches!(
            generation_failure(rejected, "summary"),
            AppError::GenerationFailed(msg) if msg == "Failed to generate summary. Please try again later."
        ));
    }
}
