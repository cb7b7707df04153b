//! Document type catalogue

use super::StoreError;
use crate::doctype::{DEFAULT_COLOR, DEFAULT_ICON, DEFAULT_TYPES};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentType {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentType {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            icon: row.get("icon")?,
            color: row.get("color")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Fields for a new type; unset icon and color take the column defaults
#[derive(Debug, Clone, Default)]
pub struct NewDocumentType {
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct DocumentTypeChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

const COLUMNS: &str = "id, name, description, icon, color, created_at";

fn duplicate_name(name: &str) -> String {
    format!("document type with this name already exists: {}", name)
}

pub fn list(conn: &Connection) -> Result<Vec<DocumentType>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM document_types ORDER BY name",
        COLUMNS
    ))?;
    let types = stmt
        .query_map([], DocumentType::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(types)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<DocumentType>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM document_types WHERE id = ?1", COLUMNS),
            params![id],
            DocumentType::from_row,
        )
        .optional()?)
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<DocumentType>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM document_types WHERE name = ?1", COLUMNS),
            params![name],
            DocumentType::from_row,
        )
        .optional()?)
}

pub fn create(conn: &Connection, new: &NewDocumentType) -> Result<DocumentType, StoreError> {
    let now = Utc::now();
    let icon = new.icon.as_deref().unwrap_or(DEFAULT_ICON);
    let color = new.color.as_deref().unwrap_or(DEFAULT_COLOR);

    conn.execute(
        "INSERT INTO document_types (name, description, icon, color, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&new.name, &new.description, icon, color, &now],
    )
    .map_err(|e| StoreError::from_unique_violation(e, duplicate_name(&new.name)))?;

    Ok(DocumentType {
        id: conn.last_insert_rowid(),
        name: new.name.clone(),
        description: new.description.clone(),
        icon: icon.to_string(),
        color: color.to_string(),
        created_at: now,
    })
}

/// Apply `changes`, returning the updated row or `None` for an unknown id
pub fn update(
    conn: &Connection,
    id: i64,
    changes: &DocumentTypeChanges,
) -> Result<Option<DocumentType>, StoreError> {
    let Some(mut current) = get(conn, id)? else {
        return Ok(None);
    };

    if let Some(name) = &changes.name {
        current.name = name.clone();
    }
    if let Some(description) = &changes.description {
        current.description = description.clone();
    }
    if let Some(icon) = &changes.icon {
        current.icon = icon.clone();
    }
    if let Some(color) = &changes.color {
        current.color = color.clone();
    }

    conn.execute(
        "UPDATE document_types SET name = ?1, description = ?2, icon = ?3, color = ?4 \
         WHERE id = ?5",
        params![
            &current.name,
            &current.description,
            &current.icon,
            &current.color,
            id
        ],
    )
    .map_err(|e| StoreError::from_unique_violation(e, duplicate_name(&current.name)))?;

    Ok(Some(current))
}

/// Delete a type; documents of that type keep existing without one
pub fn delete(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let deleted = conn.execute("DELETE FROM document_types WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Fetch the named type, creating it with `description` when absent
pub fn get_or_create_by_name(
    conn: &Connection,
    name: &str,
    description: &str,
) -> Result<DocumentType, StoreError> {
    if let Some(existing) = get_by_name(conn, name)? {
        return Ok(existing);
    }

    match create(
        conn,
        &NewDocumentType {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        },
    ) {
        Ok(created) => {
            tracing::info!(document_type = %created.name, "Created document type on demand");
            Ok(created)
        }
        // Lost a race with a concurrent upload
        Err(StoreError::Conflict(_)) => get_by_name(conn, name)?
            .ok_or_else(|| StoreError::Conflict(duplicate_name(name))),
        Err(e) => Err(e),
    }
}

/// Insert the built-in catalogue entries that are missing, returning how many were created
pub fn seed_defaults(conn: &Connection) -> Result<usize, StoreError> {
    let mut created = 0;
    for default in DEFAULT_TYPES {
        if get_by_name(conn, default.name)?.is_some() {
            tracing::debug!(document_type = default.name, "Document type already exists");
            continue;
        }
        create(
            conn,
            &NewDocumentType {
                name: default.name.to_string(),
                description: default.description.to_string(),
                icon: Some(default.icon.to_string()),
                color: Some(default.color.to_string()),
            },
        )?;
        created += 1;
    }
    Ok(created)
}
