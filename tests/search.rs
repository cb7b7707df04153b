//! Integration tests for document search and query suggestions (fallback mode)

mod common;

use axum::http::StatusCode;
use common::{BIOLOGY_TEXT, TestApp};
use study_companion::metrics::Operation;
use study_companion::store::documents::extraction_failure_marker;

const HISTORY_TEXT: &str = "The Industrial Revolution began in Britain. Steam engines changed \
manufacturing and transport across Europe.";

#[tokio::test]
async fn test_search_query_validation() {
    let app = TestApp::new();

    let (status, body) = app.post_json("/api/documents/search/", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Search query is required.");

    let (status, body) = app
        .post_json("/api/documents/search/", serde_json::json!({"query": " ab "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Search query must be at least 3 characters long.");

    let (status, body) = app
        .post_json(
            "/api/documents/search/",
            serde_json::json!({"query": "q".repeat(501)}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Search query is too long. Please keep it under 500 characters."
    );
}

#[tokio::test]
async fn test_search_without_documents() {
    let app = TestApp::new();
    app.seed_document("Unreadable", Some(&extraction_failure_marker("corrupt")));

    let (status, body) = app
        .post_json("/api/documents/search/", serde_json::json!({"query": "corrupt"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], serde_json::json!([]));
    assert_eq!(body["total_found"], 0);
    assert_eq!(body["search_summary"], "No documents found to search through.");
    assert_eq!(body["query"], "corrupt");
}

#[tokio::test]
async fn test_fallback_search_ranks_and_links_documents() {
    let app = TestApp::new();
    let biology = app.seed_document("Biology", Some(BIOLOGY_TEXT));
    app.seed_document("History", Some(HISTORY_TEXT));

    let (status, body) = app
        .post_json("/api/documents/search/", serde_json::json!({"query": "Chloroplasts"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "Chloroplasts");
    assert_eq!(body["total_found"], 1);

    let hit = &body["results"][0];
    assert_eq!(hit["document_id"], biology.to_string());
    assert_eq!(hit["title"], "Biology");
    assert_eq!(hit["relevance_score"], 3);
    assert_eq!(hit["document_url"], format!("/documents/{}/", biology));
    assert!(hit["snippet"].as_str().unwrap().contains("chloroplasts"));
}

#[tokio::test]
async fn test_search_results_are_cached_per_user_and_query() {
    let app = TestApp::new();
    app.seed_document("Biology", Some(BIOLOGY_TEXT));

    let (_, first) = app
        .post_json("/api/documents/search/", serde_json::json!({"query": "glucose"}))
        .await;
    assert_eq!(app.state.metrics().cache_hits_count(Operation::Search), 0);

    let (status, cached) = app
        .post_json("/api/documents/search/", serde_json::json!({"query": "GLUCOSE"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.state.metrics().cache_hits_count(Operation::Search), 1);
    assert_eq!(cached["query"], "GLUCOSE");
    assert_eq!(cached["results"], first["results"]);
}

#[tokio::test]
async fn test_search_lock_contention() {
    let app = TestApp::new();
    app.seed_document("Biology", Some(BIOLOGY_TEXT));

    let hash = {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(b"glucose"))
    };
    let _held = app
        .state
        .caches()
        .locks
        .try_acquire(
            &format!("search_lock_{}_{}", app.user_id, &hash[..16]),
            std::time::Duration::from_secs(30),
        )
        .unwrap();

    let (status, body) = app
        .post_json("/api/documents/search/", serde_json::json!({"query": "Glucose"}))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["error"],
        "This search is already being processed. Please wait a moment and try again."
    );
}

#[tokio::test]
async fn test_suggestions_from_document_vocabulary() {
    let app = TestApp::new();
    app.seed_document("Biology", Some(BIOLOGY_TEXT));

    let (status, body) = app
        .post_json(
            "/api/documents/search/suggestions/",
            serde_json::json!({"query": "photo"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["suggestions"],
        serde_json::json!([
            "photosynthesis",
            "photo concepts",
            "photo examples",
            "photo methods",
            "photo techniques"
        ])
    );

    let (_, again) = app
        .post_json(
            "/api/documents/search/suggestions/",
            serde_json::json!({"query": "PHOTO"}),
        )
        .await;
    assert_eq!(again, body);
    assert_eq!(app.state.metrics().cache_hits_count(Operation::Suggestions), 1);
}

#[tokio::test]
async fn test_suggestions_degrade_to_empty_list() {
    let app = TestApp::new();

    for query in [
        serde_json::json!({}),
        serde_json::json!({"query": "p"}),
        serde_json::json!({"query": "x".repeat(101)}),
        // no searchable documents yet
        serde_json::json!({"query": "photo"}),
    ] {
        let (status, body) = app
            .post_json("/api/documents/search/suggestions/", query)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"suggestions": []}));
    }

    app.seed_document("Biology", Some(BIOLOGY_TEXT));
    let _held = app
        .state
        .caches()
        .locks
        .try_acquire(
            &format!("suggestions_lock_{}", app.user_id),
            std::time::Duration::from_secs(30),
        )
        .unwrap();
    let (_, body) = app
        .post_json(
            "/api/documents/search/suggestions/",
            serde_json::json!({"query": "photo"}),
        )
        .await;
    assert_eq!(body, serde_json::json!({"suggestions": []}));

    for (content_type, raw) in [
        ("application/json", "{not json"),
        ("application/json", r#"{"query": 42}"#),
        ("text/plain", "photo"),
    ] {
        let (status, body) = app
            .post_raw("/api/documents/search/suggestions/", content_type, raw)
            .await;
        assert_eq!(status, StatusCode::OK, "body {:?} ({})", raw, content_type);
        assert_eq!(body, serde_json::json!({"suggestions": []}));
    }
}

#[tokio::test]
async fn test_malformed_search_body_is_json_error() {
    let app = TestApp::new();

    let (status, body) = app
        .post_raw("/api/documents/search/", "application/json", "{not json")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("JSON"));

    let (status, body) = app
        .post_raw("/api/documents/search/", "text/plain", "cells")
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());
}
