//! SQLite persistence
//!
//! One submodule per table group, each exposing free functions over a
//! `rusqlite::Connection`. [`Store`] owns the connection pool and runs
//! those functions on the blocking thread pool.

pub mod caches;
pub mod document_types;
pub mod documents;
pub mod migrations;
pub mod study;
pub mod users;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// The shared database pool type
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors raised by store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Pool(#[from] r2d2::Error),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Migration(#[from] rusqlite_migration::Error),
    #[error("Stored JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    /// A unique constraint rejected the write
    #[error("{0}")]
    Conflict(String),
    #[error("Database task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Map a UNIQUE constraint violation to [`StoreError::Conflict`]
    pub(crate) fn from_unique_violation(err: rusqlite::Error, message: impl Into<String>) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::Conflict(message.into())
            }
            _ => StoreError::Db(err),
        }
    }
}

fn init_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

/// Handle to the database pool
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    /// Open (creating if needed) the database file and migrate it to the latest schema
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(init_connection);
        let pool = Pool::builder().max_size(8).build(manager)?;
        Self::from_pool(pool)
    }

    /// Open a private in-memory database
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::from_pool(pool)
    }

    fn from_pool(pool: DbPool) -> Result<Self, StoreError> {
        {
            let mut conn = pool.get()?;
            migrations::runner().to_latest(&mut conn)?;
        }
        tracing::debug!(
            schema_version = migrations::latest_version(),
            "Database schema is up to date"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run `f` on a pooled connection on the current thread
    ///
    /// For CLI commands and tests; async code uses [`Store::run`].
    pub fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Run `f` on a pooled connection on tokio's blocking thread pool
    pub async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
