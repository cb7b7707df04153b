//! Document upload, listing, deletion and text extraction retries

use crate::doctype;
use crate::error::{AppError, AppResult};
use crate::extract::{self, ExtractionError};
use crate::handlers::AppState;
use crate::handlers::study::DOCUMENT_NOT_FOUND;
use crate::middleware::AuthUser;
use crate::store::document_types;
use crate::store::documents::{self, DocumentView, TextState};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::path::{Path as FsPath, PathBuf};

const UPLOAD_DIR: &str = "documents";
const MAX_TITLE_CHARS: usize = 255;

/// Fields of a multipart upload
#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    file_name: Option<String>,
    file_bytes: Option<Vec<u8>>,
    document_type_id: Option<i64>,
}

/// Parse `document_type_id`; blank and zero mean "not chosen"
fn parse_type_id(raw: &str) -> AppResult<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let id: i64 = raw.parse().map_err(|_| {
        AppError::Validation("document_type_id: A valid integer is required.".to_string())
    })?;
    Ok((id != 0).then_some(id))
}

/// Parse the `document_type` list filter; only an empty value means "no filter"
fn parse_filter_id(raw: &str) -> AppResult<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| {
        AppError::Validation("document_type: A valid integer is required.".to_string())
    })
}

/// Keep only the final path component, replacing unsafe characters
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

async fn read_upload(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    let invalid = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Malformed multipart body: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(invalid)?),
            "document_type_id" => {
                form.document_type_id = parse_type_id(&field.text().await.map_err(invalid)?)?;
            }
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.file_bytes = Some(field.bytes().await.map_err(invalid)?.to_vec());
            }
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }
    Ok(form)
}

fn media_path(state: &AppState, relative: &str) -> PathBuf {
    state.config().storage.media_root.join(relative)
}

/// Remove a stored upload; a file that is already gone is fine
async fn remove_stored_file(path: &FsPath) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove stored file"),
    }
}

/// Extract text from a stored file, recording the outcome per format
async fn extract_stored_file(
    state: &AppState,
    path: &FsPath,
) -> Result<String, ExtractionError> {
    let format = extract::format_label(path);
    let result =
        extract::extract_text_async(path.to_path_buf(), state.config().extraction.clone()).await;
    state.metrics().record_extraction(format, result.is_ok());
    if let Err(e) = &result {
        tracing::warn!(path = %path.display(), format, error = %e, "Text extraction failed");
    }
    result
}

pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentView>)> {
    let form = read_upload(multipart).await?;

    let title = form.title.map(|t| t.trim().to_string()).unwrap_or_default();
    if title.is_empty() {
        return Err(AppError::Validation("title: This field is required.".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "title: Ensure this field has no more than {} characters.",
            MAX_TITLE_CHARS
        )));
    }
    let Some(bytes) = form.file_bytes else {
        return Err(AppError::Validation("file: No file was submitted.".to_string()));
    };
    if bytes.is_empty() {
        return Err(AppError::Validation("file: The submitted file is empty.".to_string()));
    }

    let file_name = sanitize_file_name(form.file_name.as_deref().unwrap_or("upload"));
    let relative = format!("{}/{}_{}", UPLOAD_DIR, uuid::Uuid::new_v4().simple(), file_name);
    let path = media_path(&state, &relative);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &bytes).await?;

    let user_id = user.id;
    let requested_type = form.document_type_id;
    let created = state
        .store()
        .run(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let document = documents::create(&tx, user_id, &title, &relative)?;
            let type_id = match requested_type {
                Some(id) => {
                    let found = document_types::get(&tx, id)?.map(|t| t.id);
                    if found.is_none() {
                        tracing::warn!(document_type_id = id, "Requested document type not found");
                    }
                    found
                }
                None => {
                    let extension = document.file_extension().unwrap_or_default();
                    Some(doctype::resolve_for_extension(&tx, &extension)?.id)
                }
            };
            documents::set_document_type(&tx, document.id, type_id)?;
            tx.commit()?;
            Ok(document)
        })
        .await;
    let document = match created {
        Ok(document) => document,
        Err(e) => {
            remove_stored_file(&path).await;
            return Err(e.into());
        }
    };

    let stored_text = match extract_stored_file(&state, &path).await {
        Ok(text) => text,
        Err(e) => documents::extraction_failure_marker(&e.to_string()),
    };
    let document_id = document.id;
    let saved = state
        .store()
        .run(move |conn| {
            documents::set_extracted_text(conn, document_id, &stored_text)?;
            documents::view_for_user(conn, document_id, user_id)
        })
        .await;
    let view = match saved {
        Ok(Some(view)) => view,
        Ok(None) => return Err(AppError::NotFound(DOCUMENT_NOT_FOUND.to_string())),
        Err(e) => {
            tracing::error!(document_id, error = %e, "Failed to save extracted text, removing upload");
            if let Err(cleanup) = state
                .store()
                .run(move |conn| documents::delete(conn, document_id, user_id))
                .await
            {
                tracing::error!(document_id, error = %cleanup, "Failed to remove document row");
            }
            remove_stored_file(&path).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        document_id,
        user_id,
        document_type = view.document_type.as_ref().map(|t| t.name.as_str()),
        "Document uploaded"
    );
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub document_type: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<DocumentView>>> {
    let document_type = match params.document_type.as_deref() {
        Some(raw) => parse_filter_id(raw)?,
        None => None,
    };
    let user_id = user.id;
    let views = state
        .store()
        .run(move |conn| documents::list_for_user(conn, user_id, document_type))
        .await?;
    Ok(Json(views))
}

pub async fn retrieve(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DocumentView>> {
    let user_id = user.id;
    state
        .store()
        .run(move |conn| documents::view_for_user(conn, id, user_id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(DOCUMENT_NOT_FOUND.to_string()))
}

/// Delete the document row and its stored file
pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let user_id = user.id;
    let document = state
        .store()
        .run(move |conn| documents::delete(conn, id, user_id))
        .await?
        .ok_or_else(|| AppError::NotFound(DOCUMENT_NOT_FOUND.to_string()))?;

    remove_stored_file(&media_path(&state, &document.file)).await;
    tracing::info!(document_id = id, user_id, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

pub async fn retry_extraction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RetryResponse>> {
    let user_id = user.id;
    let document = state
        .store()
        .run(move |conn| documents::get_for_user(conn, id, user_id))
        .await?
        .ok_or_else(|| AppError::NotFound(DOCUMENT_NOT_FOUND.to_string()))?;

    if let TextState::Ready(text) = document.text_state() {
        return Ok(Json(RetryResponse {
            message: "Text extraction already successful",
            extracted_text_length: Some(text.chars().count()),
            error: None,
            success: None,
        }));
    }

    tracing::info!(document_id = id, "Retrying text extraction");
    let path = media_path(&state, &document.file);
    let (stored_text, response) = match extract_stored_file(&state, &path).await {
        Ok(text) => {
            let response = RetryResponse {
                message: "Text extraction successful! AI features are now available.",
                extracted_text_length: Some(text.chars().count()),
                error: None,
                success: Some(true),
            };
            (text, response)
        }
        Err(e) => {
            let reason = e.to_string();
            let response = RetryResponse {
                message: "Text extraction failed again. The file might be corrupted or unsupported.",
                extracted_text_length: None,
                error: Some(reason.clone()),
                success: Some(false),
            };
            (documents::extraction_failure_marker(&reason), response)
        }
    };

    state
        .store()
        .run(move |conn| documents::set_extracted_text(conn, id, &stored_text))
        .await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_parsing() {
        assert_eq!(parse_type_id("").unwrap(), None);
        assert_eq!(parse_type_id(" null ").unwrap(), None);
        assert_eq!(parse_type_id("0").unwrap(), None);
        assert_eq!(parse_type_id(" 7 ").unwrap(), Some(7));
        assert!(matches!(parse_type_id("seven"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_list_filter_keeps_zero() {
        assert_eq!(parse_filter_id("").unwrap(), None);
        assert_eq!(parse_filter_id("0").unwrap(), Some(0));
        assert_eq!(parse_filter_id(" 12 ").unwrap(), Some(12));
        assert!(matches!(parse_filter_id("null"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\my notes.docx"), "my_notes.docx");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(".."), "upload");
    }
}
