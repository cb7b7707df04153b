//! Document type catalogue endpoints

use crate::doctype::is_valid_color;
use crate::error::{AppError, AppResult};
use crate::handlers::{ApiJson, AppState};
use crate::middleware::AuthUser;
use crate::store::document_types::{self, DocumentType, DocumentTypeChanges, NewDocumentType};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

const NOT_FOUND: &str = "Document type not found.";
const MAX_NAME_CHARS: usize = 100;
const MAX_ICON_CHARS: usize = 50;

/// Body for create, PUT and PATCH
#[derive(Debug, Default, Deserialize)]
pub struct DocumentTypePayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl DocumentTypePayload {
    /// Validate present fields; `require_name` for create and full update
    fn validate(self, require_name: bool) -> AppResult<DocumentTypeChanges> {
        let name = match self.name.map(|n| n.trim().to_string()) {
            Some(name) if name.is_empty() => {
                return Err(AppError::Validation("name: This field may not be blank.".into()));
            }
            Some(name) if name.chars().count() > MAX_NAME_CHARS => {
                return Err(AppError::Validation(format!(
                    "name: Ensure this field has no more than {} characters.",
                    MAX_NAME_CHARS
                )));
            }
            None if require_name => {
                return Err(AppError::Validation("name: This field is required.".into()));
            }
            name => name,
        };

        if let Some(color) = &self.color
            && !is_valid_color(color)
        {
            return Err(AppError::Validation(format!(
                "color: '{}' is not a #RRGGBB hex color.",
                color
            )));
        }
        if let Some(icon) = &self.icon
            && icon.chars().count() > MAX_ICON_CHARS
        {
            return Err(AppError::Validation(format!(
                "icon: Ensure this field has no more than {} characters.",
                MAX_ICON_CHARS
            )));
        }

        Ok(DocumentTypeChanges {
            name,
            description: self.description,
            icon: self.icon,
            color: self.color,
        })
    }
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<DocumentType>>> {
    let types = state.store().run(document_types::list).await?;
    Ok(Json(types))
}

pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(payload): ApiJson<DocumentTypePayload>,
) -> AppResult<(StatusCode, Json<DocumentType>)> {
    let changes = payload.validate(true)?;
    let new = NewDocumentType {
        name: changes.name.unwrap_or_default(),
        description: changes.description.unwrap_or_default(),
        icon: changes.icon,
        color: changes.color,
    };

    let created = state
        .store()
        .run(move |conn| document_types::create(conn, &new))
        .await?;
    tracing::info!(document_type_id = created.id, name = %created.name, "Document type created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DocumentType>> {
    state
        .store()
        .run(move |conn| document_types::get(conn, id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

async fn apply_update(
    state: &AppState,
    id: i64,
    payload: DocumentTypePayload,
    require_name: bool,
) -> AppResult<Json<DocumentType>> {
    let changes = payload.validate(require_name)?;
    state
        .store()
        .run(move |conn| document_types::update(conn, id, &changes))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

/// PUT: `name` is required, omitted optional fields are left unchanged
pub async fn replace(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<DocumentTypePayload>,
) -> AppResult<Json<DocumentType>> {
    apply_update(&state, id, payload, true).await
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<DocumentTypePayload>,
) -> AppResult<Json<DocumentType>> {
    apply_update(&state, id, payload, false).await
}

pub async fn destroy(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store()
        .run(move |conn| document_types::delete(conn, id))
        .await?;
    if !deleted {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    tracing::info!(document_type_id = id, "Document type deleted");
    Ok(StatusCode::NO_CONTENT)
}
