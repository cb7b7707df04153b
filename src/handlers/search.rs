//! Search across the caller's documents, and query suggestions

use crate::ai::{DocumentExcerpt, SearchResults, prompts::head_chars};
use crate::error::{AppError, AppResult};
use crate::handlers::{ApiJson, AppState};
use crate::handlers::study::{lock_ttl, sha256_hex};
use crate::metrics::Operation;
use crate::middleware::AuthUser;
use crate::store::documents::{self, Document};
use crate::store::caches;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NO_DOCUMENTS: &str = "No documents found to search through.";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// Search results echoed with the caller's query
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub results: SearchResults,
    pub query: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

fn excerpts(documents: Vec<Document>, max_chars: usize) -> Vec<DocumentExcerpt> {
    documents
        .into_iter()
        .map(|doc| {
            let content = doc
                .extracted_text
                .as_deref()
                .map(|text| head_chars(text, max_chars).to_string())
                .unwrap_or_default();
            DocumentExcerpt::new(doc.id, doc.title, content)
        })
        .collect()
}

/// Trimmed search query within the configured length bounds
fn validate_query(query: Option<String>, min_chars: usize, max_chars: usize) -> AppResult<String> {
    let query = query.unwrap_or_default().trim().to_string();
    if query.is_empty() {
        return Err(AppError::Validation("Search query is required.".to_string()));
    }
    let chars = query.chars().count();
    if chars < min_chars {
        return Err(AppError::Validation(format!(
            "Search query must be at least {} characters long.",
            min_chars
        )));
    }
    if chars > max_chars {
        return Err(AppError::Validation(format!(
            "Search query is too long. Please keep it under {} characters.",
            max_chars
        )));
    }
    Ok(query)
}

fn encode(response: &SearchResponse) -> AppResult<serde_json::Value> {
    serde_json::to_value(response)
        .map_err(|e| AppError::Internal(format!("Failed to encode search results: {}", e)))
}

pub async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<QueryRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let limits = &state.config().limits;
    let query = validate_query(
        request.query,
        limits.min_search_query_chars,
        limits.max_search_query_chars,
    )?;
    let query_hash = sha256_hex(&query.to_lowercase());
    let user_id = user.id;

    let lookup_hash = query_hash.clone();
    let cached = state
        .store()
        .run(move |conn| caches::get_search(conn, user_id, &lookup_hash))
        .await?;
    let max_age = chrono::Duration::seconds(state.config().cache.search_fresh_seconds as i64);
    if let Some(cached) = cached.filter(|c| c.is_fresh(max_age)) {
        state.metrics().cache_hit(Operation::Search);
        let mut results = cached.results;
        if let Some(object) = results.as_object_mut() {
            object.insert("query".to_string(), serde_json::Value::String(query));
        }
        return Ok(Json(results));
    }

    let document_limit = limits.search_document_limit;
    let documents = state
        .store()
        .run(move |conn| documents::searchable_for_user(conn, user_id, document_limit))
        .await?;
    if documents.is_empty() {
        let empty = SearchResponse {
            results: SearchResults {
                results: Vec::new(),
                total_found: 0,
                search_summary: NO_DOCUMENTS.to_string(),
            },
            query,
        };
        return Ok(Json(encode(&empty)?));
    }

    let lock_key = format!("search_lock_{}_{}", user_id, &query_hash[..16]);
    let Some(_guard) = state.caches().locks.try_acquire(&lock_key, lock_ttl(&state)) else {
        state.metrics().lock_contended(Operation::Search);
        return Err(AppError::Busy(
            "This search is already being processed. Please wait a moment and try again."
                .to_string(),
        ));
    };

    let excerpts = excerpts(documents, limits.search_content_chars);
    let mut results = state.assistant().search(&excerpts, &query).await;
    for hit in &mut results.results {
        hit.link_document();
    }
    tracing::info!(
        user_id,
        documents = excerpts.len(),
        total_found = results.total_found,
        "Search completed"
    );

    let response = encode(&SearchResponse {
        results,
        query: query.clone(),
    })?;
    let stored = response.clone();
    state
        .store()
        .run(move |conn| caches::upsert_search(conn, user_id, &query_hash, &query, &stored))
        .await?;

    Ok(Json(response))
}

/// Suggestions never fail: every problem degrades to an empty list
pub async fn suggestions(
    State(state): State<AppState>,
    user: AuthUser,
    request: Result<Json<QueryRequest>, JsonRejection>,
) -> Json<SuggestionsResponse> {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable suggestions body");
            return Json(SuggestionsResponse::default());
        }
    };
    let partial = request.query.unwrap_or_default().trim().to_string();
    let limits = &state.config().limits;
    let chars = partial.chars().count();
    if chars < limits.min_suggestion_query_chars || chars > limits.max_suggestion_query_chars {
        return Json(SuggestionsResponse::default());
    }

    let user_id = user.id;
    let hash = sha256_hex(&partial.to_lowercase());
    let cache_key = format!("suggestions_{}_{}", user_id, &hash[..16]);
    if let Some(cached) = state.caches().suggestions.get(&cache_key)
        && !cached.is_empty()
    {
        state.metrics().cache_hit(Operation::Suggestions);
        return Json(SuggestionsResponse { suggestions: cached });
    }

    let document_limit = limits.suggestion_document_limit;
    let documents = match state
        .store()
        .run(move |conn| documents::searchable_for_user(conn, user_id, document_limit))
        .await
    {
        Ok(documents) if !documents.is_empty() => documents,
        Ok(_) => return Json(SuggestionsResponse::default()),
        Err(e) => {
            tracing::error!(user_id, error = %e, "Search suggestions failed");
            return Json(SuggestionsResponse::default());
        }
    };

    let lock_key = format!("suggestions_lock_{}", user_id);
    let Some(_guard) = state.caches().locks.try_acquire(&lock_key, lock_ttl(&state)) else {
        state.metrics().lock_contended(Operation::Suggestions);
        return Json(SuggestionsResponse::default());
    };

    let excerpts = excerpts(documents, limits.suggestion_content_chars);
    let suggestions = state.assistant().suggestions(&excerpts, &partial).await;

    let ttl = Duration::from_secs(state.config().cache.suggestions_ttl_seconds);
    state
        .caches()
        .suggestions
        .insert(cache_key, suggestions.clone(), ttl);
    Json(SuggestionsResponse { suggestions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_validation_messages() {
        let check = |q: Option<&str>| validate_query(q.map(str::to_string), 3, 500);

        assert!(matches!(
            check(None),
            Err(AppError::Validation(m)) if m == "Search query is required."
        ));
        assert!(matches!(
            check(Some("   ")),
            Err(AppError::Validation(m)) if m == "Search query is required."
        ));
        assert!(matches!(
            check(Some(" ab ")),
            Err(AppError::Validation(m)) if m == "Search query must be at least 3 characters long."
        ));
        assert!(matches!(
            check(Some(&"q".repeat(501))),
            Err(AppError::Validation(m)) if m.starts_with("Search query is too long.")
        ));
        assert_eq!(check(Some("  cell biology ")).unwrap(), "cell biology");
    }

    #[test]
    fn test_excerpts_truncate_by_characters() {
        let doc = Document {
            id: 4,
            user_id: 1,
            title: "Notes".to_string(),
            file: "documents/n.txt".to_string(),
            document_type_id: None,
            extracted_text: Some("ééééé".to_string()),
            uploaded_at: chrono::Utc::now(),
        };
        let excerpts = excerpts(vec![doc], 3);
        assert_eq!(excerpts[0].content, "ééé");
        assert_eq!(excerpts[0].id, 4);
    }

    #[test]
    fn test_search_response_flattens_results() {
        let response = SearchResponse {
            results: SearchResults {
                results: Vec::new(),
                total_found: 0,
                search_summary: NO_DOCUMENTS.to_string(),
            },
            query: "cells".to_string(),
        };
        let value = encode(&response).unwrap();
        assert_eq!(value["query"], "cells");
        assert_eq!(value["total_found"], 0);
        assert_eq!(value["search_summary"], NO_DOCUMENTS);
        assert!(value["results"].as_array().unwrap().is_empty());
    }
}
