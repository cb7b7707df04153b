//! Uploaded documents

use super::StoreError;
use super::document_types::DocumentType;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

/// Prefix stored in `extracted_text` when extraction failed
pub const EXTRACTION_FAILED_PREFIX: &str = "Text extraction failed:";

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    /// Path relative to the media root, e.g. `documents/<uuid>_notes.pdf`
    pub file: String,
    pub document_type_id: Option<i64>,
    pub extracted_text: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Readiness of a document's text for AI features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextState<'a> {
    /// Nothing was extracted
    Missing,
    /// Extraction failed; holds the stored failure marker
    Failed(&'a str),
    Ready(&'a str),
}

impl Document {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            file: row.get("file")?,
            document_type_id: row.get("document_type_id")?,
            extracted_text: row.get("extracted_text")?,
            uploaded_at: row.get("uploaded_at")?,
        })
    }

    pub fn text_state(&self) -> TextState<'_> {
        match self.extracted_text.as_deref() {
            None => TextState::Missing,
            Some(text) if text.is_empty() => TextState::Missing,
            Some(text) if text.starts_with(EXTRACTION_FAILED_PREFIX) => TextState::Failed(text),
            Some(text) => TextState::Ready(text),
        }
    }

    /// Whether the text can be searched and fed to the model
    pub fn is_searchable(&self) -> bool {
        matches!(self.text_state(), TextState::Ready(_))
    }

    /// Lowercase extension of the stored file, if any
    pub fn file_extension(&self) -> Option<String> {
        std::path::Path::new(&self.file)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

/// Failure marker for a failed extraction
pub fn extraction_failure_marker(reason: &str) -> String {
    format!("{} {}", EXTRACTION_FAILED_PREFIX, reason)
}

/// API representation: the document with its type expanded
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub id: i64,
    pub user: i64,
    pub title: String,
    /// URL path of the stored file under `/media/`
    pub file: String,
    pub document_type: Option<DocumentType>,
    pub extracted_text: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl DocumentView {
    pub fn new(document: Document, document_type: Option<DocumentType>) -> Self {
        Self {
            id: document.id,
            user: document.user_id,
            title: document.title,
            file: format!("/media/{}", document.file),
            document_type,
            extracted_text: document.extracted_text,
            uploaded_at: document.uploaded_at,
        }
    }
}

const COLUMNS: &str =
    "d.id, d.user_id, d.title, d.file, d.document_type_id, d.extracted_text, d.uploaded_at";

const VIEW_QUERY: &str = "SELECT d.id, d.user_id, d.title, d.file, d.document_type_id, \
     d.extracted_text, d.uploaded_at, \
     t.id AS type_id, t.name AS type_name, t.description AS type_description, \
     t.icon AS type_icon, t.color AS type_color, t.created_at AS type_created_at \
     FROM documents d LEFT JOIN document_types t ON t.id = d.document_type_id";

fn view_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentView> {
    let document = Document::from_row(row)?;
    let type_id: Option<i64> = row.get("type_id")?;
    let document_type = match type_id {
        Some(id) => Some(DocumentType {
            id,
            name: row.get("type_name")?,
            description: row.get("type_description")?,
            icon: row.get("type_icon")?,
            color: row.get("type_color")?,
            created_at: row.get("type_created_at")?,
        }),
        None => None,
    };
    Ok(DocumentView::new(document, document_type))
}

pub fn create(
    conn: &Connection,
    user_id: i64,
    title: &str,
    file: &str,
) -> Result<Document, StoreError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO documents (user_id, title, file, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, title, file, &now],
    )?;
    Ok(Document {
        id: conn.last_insert_rowid(),
        user_id,
        title: title.to_string(),
        file: file.to_string(),
        document_type_id: None,
        extracted_text: None,
        uploaded_at: now,
    })
}

/// Fetch a document only if it belongs to `user_id`
pub fn get_for_user(conn: &Connection, id: i64, user_id: i64) -> Result<Option<Document>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM documents d WHERE d.id = ?1 AND d.user_id = ?2", COLUMNS),
            params![id, user_id],
            Document::from_row,
        )
        .optional()?)
}

pub fn view_for_user(
    conn: &Connection,
    id: i64,
    user_id: i64,
) -> Result<Option<DocumentView>, StoreError> {
    Ok(conn
        .query_row(
            &format!("{} WHERE d.id = ?1 AND d.user_id = ?2", VIEW_QUERY),
            params![id, user_id],
            view_from_row,
        )
        .optional()?)
}

/// The user's documents, newest first, optionally restricted to one type
pub fn list_for_user(
    conn: &Connection,
    user_id: i64,
    document_type: Option<i64>,
) -> Result<Vec<DocumentView>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE d.user_id = ?1 AND (?2 IS NULL OR d.document_type_id = ?2) \
         ORDER BY d.uploaded_at DESC, d.id DESC",
        VIEW_QUERY
    ))?;
    let views = stmt
        .query_map(params![user_id, document_type], view_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(views)
}

pub fn set_document_type(
    conn: &Connection,
    id: i64,
    document_type_id: Option<i64>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE documents SET document_type_id = ?1 WHERE id = ?2",
        params![document_type_id, id],
    )?;
    Ok(())
}

pub fn set_extracted_text(conn: &Connection, id: i64, text: &str) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE documents SET extracted_text = ?1 WHERE id = ?2",
        params![text, id],
    )?;
    Ok(())
}

/// Delete the row (and, by cascade, its study aids); returns the removed document
pub fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<Option<Document>, StoreError> {
    let Some(document) = get_for_user(conn, id, user_id)? else {
        return Ok(None);
    };
    conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
    Ok(Some(document))
}

/// Up to `limit` of the user's documents with usable text, newest first
pub fn searchable_for_user(
    conn: &Connection,
    user_id: i64,
    limit: usize,
) -> Result<Vec<Document>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM documents d \
         WHERE d.user_id = ?1 AND d.extracted_text IS NOT NULL AND d.extracted_text != '' \
         AND substr(d.extracted_text, 1, ?3) != ?2 \
         ORDER BY d.uploaded_at DESC, d.id DESC LIMIT ?4",
        COLUMNS
    ))?;
    // Case-sensitive, matching `Document::text_state`
    let prefix_chars = EXTRACTION_FAILED_PREFIX.chars().count() as i64;
    let documents = stmt
        .query_map(
            params![user_id, EXTRACTION_FAILED_PREFIX, prefix_chars, limit as i64],
            Document::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(documents)
}
