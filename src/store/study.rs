//! Quizzes and flashcard sets generated for a document

use super::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quiz {
    pub id: i64,
    #[serde(rename = "document")]
    pub document_id: i64,
    pub title: String,
    /// `{"questions": [...], "fallback_mode"?: bool}` as generated
    pub questions: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flashcard {
    pub id: i64,
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlashcardSet {
    pub id: i64,
    #[serde(rename = "document")]
    pub document_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub flashcards: Vec<Flashcard>,
}

/// Oldest quiz stored for the document
pub fn first_quiz_for_document(
    conn: &Connection,
    document_id: i64,
) -> Result<Option<Quiz>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, document_id, title, questions, created_at FROM quizzes \
             WHERE document_id = ?1 ORDER BY id LIMIT 1",
            params![document_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, DateTime<Utc>>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, document_id, title, questions, created_at)| {
        Ok(Quiz {
            id,
            document_id,
            title,
            questions: serde_json::from_str(&questions)?,
            created_at,
        })
    })
    .transpose()
}

pub fn create_quiz(
    conn: &Connection,
    document_id: i64,
    title: &str,
    questions: &serde_json::Value,
) -> Result<Quiz, StoreError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO quizzes (document_id, title, questions, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![document_id, title, serde_json::to_string(questions)?, &now],
    )?;
    Ok(Quiz {
        id: conn.last_insert_rowid(),
        document_id,
        title: title.to_string(),
        questions: questions.clone(),
        created_at: now,
    })
}

fn cards_for_set(conn: &Connection, set_id: i64) -> Result<Vec<Flashcard>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, front, back FROM flashcards WHERE flashcard_set_id = ?1 ORDER BY id",
    )?;
    let cards = stmt
        .query_map(params![set_id], |row| {
            Ok(Flashcard {
                id: row.get(0)?,
                front: row.get(1)?,
                back: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cards)
}

/// Oldest flashcard set stored for the document, with its cards
pub fn first_set_for_document(
    conn: &Connection,
    document_id: i64,
) -> Result<Option<FlashcardSet>, StoreError> {
    let header = conn
        .query_row(
            "SELECT id, title, created_at FROM flashcard_sets \
             WHERE document_id = ?1 ORDER BY id LIMIT 1",
            params![document_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((id, title, created_at)) = header else {
        return Ok(None);
    };

    Ok(Some(FlashcardSet {
        id,
        document_id,
        title,
        created_at,
        flashcards: cards_for_set(conn, id)?,
    }))
}

/// Store a set and all of its cards in one transaction
pub fn create_set_with_cards(
    conn: &Connection,
    document_id: i64,
    title: &str,
    cards: &[(String, String)],
) -> Result<FlashcardSet, StoreError> {
    let now = Utc::now();
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO flashcard_sets (document_id, title, created_at) VALUES (?1, ?2, ?3)",
        params![document_id, title, &now],
    )?;
    let set_id = tx.last_insert_rowid();

    let mut flashcards = Vec::with_capacity(cards.len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO flashcards (flashcard_set_id, front, back) VALUES (?1, ?2, ?3)",
        )?;
        for (front, back) in cards {
            stmt.execute(params![set_id, front, back])?;
            flashcards.push(Flashcard {
                id: tx.last_insert_rowid(),
                front: front.clone(),
                back: back.clone(),
            });
        }
    }
    tx.commit()?;

    Ok(FlashcardSet {
        id: set_id,
        document_id,
        title: title.to_string(),
        created_at: now,
        flashcards,
    })
}
