//! Persisted answer and search caches

use super::StoreError;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};

/// A stored search response and when it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSearch {
    pub query: String,
    pub results: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CachedSearch {
    /// Whether the entry is younger than `max_age` at `now`
    pub fn is_fresh_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at < max_age
    }

    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.is_fresh_at(max_age, Utc::now())
    }
}

pub fn get_answer(
    conn: &Connection,
    document_id: i64,
    question_hash: &str,
) -> Result<Option<String>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT answer FROM question_answers WHERE document_id = ?1 AND question_hash = ?2",
            params![document_id, question_hash],
            |row| row.get(0),
        )
        .optional()?)
}

/// Remember an answer; an existing answer for the same question wins
pub fn insert_answer(
    conn: &Connection,
    document_id: i64,
    question_hash: &str,
    question: &str,
    answer: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO question_answers (document_id, question_hash, question, answer, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT (document_id, question_hash) DO NOTHING",
        params![document_id, question_hash, question, answer, Utc::now()],
    )?;
    Ok(())
}

pub fn get_search(
    conn: &Connection,
    user_id: i64,
    query_hash: &str,
) -> Result<Option<CachedSearch>, StoreError> {
    let row = conn
        .query_row(
            "SELECT query, results, created_at FROM search_caches \
             WHERE user_id = ?1 AND query_hash = ?2",
            params![user_id, query_hash],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(query, results, created_at)| {
        Ok(CachedSearch {
            query,
            results: serde_json::from_str(&results)?,
            created_at,
        })
    })
    .transpose()
}

/// Insert or refresh the cached response for `(user, query_hash)`
pub fn upsert_search(
    conn: &Connection,
    user_id: i64,
    query_hash: &str,
    query: &str,
    results: &serde_json::Value,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO search_caches (user_id, query_hash, query, results, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (user_id, query_hash) DO UPDATE SET \
         query = excluded.query, results = excluded.results, created_at = excluded.created_at",
        params![
            user_id,
            query_hash,
            query,
            serde_json::to_string(results)?,
            Utc::now()
        ],
    )?;
    Ok(())
}
