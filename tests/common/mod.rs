//! Shared helpers for the HTTP integration tests
//!
//! Each test builds its own app over an in-memory database and a temporary
//! media directory, so tests never share state.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use study_companion::{
    ai::GenerativeModel,
    config::Config,
    handlers::{self, AppState},
    store::{Store, documents, users},
};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub token: String,
    pub user_id: i64,
    pub media: TempDir,
}

pub fn test_config(media: &TempDir) -> Config {
    let mut config: Config = r#"
[server]
host = "127.0.0.1"
port = 3000

[extraction]
ocr_enabled = false
"#
    .parse()
    .expect("test config should parse");
    config.ai.enabled = false;
    config.storage.media_root = media.path().to_path_buf();
    config
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(None, |_| {})
    }

    pub fn with_model(model: Arc<dyn GenerativeModel>) -> Self {
        Self::with(Some(model), |_| {})
    }

    /// Build an app, letting the caller adjust the configuration first
    pub fn with(model: Option<Arc<dyn GenerativeModel>>, adjust: impl FnOnce(&mut Config)) -> Self {
        let media = tempfile::tempdir().expect("temp media dir");
        let mut config = test_config(&media);
        adjust(&mut config);

        let store = Store::open_in_memory().expect("in-memory store");
        let (user, token) = store
            .with_conn(|conn| users::create_user(conn, "student", "student@example.com"))
            .expect("test user");
        let state = AppState::new(Arc::new(config), store, model).expect("app state");

        Self {
            router: handlers::router(state.clone()),
            state,
            token,
            user_id: user.id,
            media,
        }
    }

    /// Another user with their own token
    pub fn add_user(&self, username: &str) -> (i64, String) {
        let (user, token) = self
            .state
            .store()
            .with_conn(|conn| users::create_user(conn, username, ""))
            .expect("second user");
        (user.id, token)
    }

    /// Insert a document directly, bypassing upload and extraction
    pub fn seed_document(&self, title: &str, text: Option<&str>) -> i64 {
        self.seed_document_for(self.user_id, title, text)
    }

    pub fn seed_document_for(&self, user_id: i64, title: &str, text: Option<&str>) -> i64 {
        let text = text.map(str::to_string);
        self.state
            .store()
            .with_conn(|conn| {
                let doc = documents::create(conn, user_id, title, "documents/seeded.txt")?;
                if let Some(text) = &text {
                    documents::set_extracted_text(conn, doc.id, text)?;
                }
                Ok(doc.id)
            })
            .expect("seeded document")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(self.request("GET", uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.json("POST", uri, body).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = self
            .request(method, uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// POST a raw body with an arbitrary content type
    pub async fn post_raw(
        &self,
        uri: &str,
        content_type: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str) -> StatusCode {
        let request = self.request("DELETE", uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap().status()
    }

    /// Authenticated request builder
    pub fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Token {}", self.token))
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}

pub const BOUNDARY: &str = "study-companion-test-boundary";

/// Hand-built `multipart/form-data` body: text fields plus an optional file
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, contents)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub const BIOLOGY_TEXT: &str = "Photosynthesis is the process plants use to convert light into chemical energy. \
It takes place in the chloroplasts of plant cells. Chlorophyll absorbs mostly red and blue light. \
The light reactions produce oxygen as a by-product of splitting water molecules. \
The Calvin cycle uses carbon dioxide to build glucose for the cell. \
Cellular respiration later releases the stored energy for the organism to use.";
