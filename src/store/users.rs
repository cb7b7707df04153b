//! Users and their API tokens

use super::StoreError;
use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// 40 lowercase hex characters
fn generate_token_key() -> String {
    let mut bytes = [0u8; 20];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Create a user together with their API token
pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
) -> Result<(User, String), StoreError> {
    let now = Utc::now();
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO users (username, email, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
        params![username, email, &now],
    )
    .map_err(|e| {
        StoreError::from_unique_violation(e, format!("A user named '{}' already exists.", username))
    })?;
    let id = tx.last_insert_rowid();

    let key = generate_token_key();
    tx.execute(
        "INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![&key, id, &now],
    )?;
    tx.commit()?;

    Ok((
        User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            is_active: true,
            created_at: now,
        },
        key,
    ))
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, username, email, is_active, created_at FROM users WHERE id = ?1",
            params![id],
            User::from_row,
        )
        .optional()?)
}

pub fn get_by_username(conn: &Connection, username: &str) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, username, email, is_active, created_at FROM users WHERE username = ?1",
            params![username],
            User::from_row,
        )
        .optional()?)
}

/// Resolve a token key to its owner, whether active or not
pub fn user_for_token(conn: &Connection, key: &str) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT u.id, u.username, u.email, u.is_active, u.created_at \
             FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = ?1",
            params![key],
            User::from_row,
        )
        .optional()?)
}

pub fn set_active(conn: &Connection, id: i64, active: bool) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE users SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_create_user_issues_hex_token() {
        let store = Store::open_in_memory().unwrap();
        let (user, key) = store
            .with_conn(|conn| create_user(conn, "alice", "alice@example.com"))
            .unwrap();

        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(user.is_active);

        let resolved = store
            .with_conn(|conn| user_for_token(conn, &key))
            .unwrap()
            .expect("token should resolve");
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.email, "alice@example.com");
    }

    #[test]
    fn test_duplicate_username_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| create_user(conn, "alice", "a@example.com"))
            .unwrap();
        let err = store
            .with_conn(|conn| create_user(conn, "alice", "other@example.com"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_unknown_token_resolves_to_none() {
        let store = Store::open_in_memory().unwrap();
        let found = store.with_conn(|conn| user_for_token(conn, "nope")).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_set_active_is_visible_through_token() {
        let store = Store::open_in_memory().unwrap();
        let (user, key) = store
            .with_conn(|conn| create_user(conn, "carol", ""))
            .unwrap();
        assert!(store.with_conn(|conn| set_active(conn, user.id, false)).unwrap());

        let resolved = store
            .with_conn(|conn| user_for_token(conn, &key))
            .unwrap()
            .unwrap();
        assert!(!resolved.is_active);
        assert_eq!(store.with_conn(|conn| get(conn, user.id)).unwrap(), Some(resolved));
    }
}
