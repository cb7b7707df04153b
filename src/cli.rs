//! Command-line interface for Study Companion
//!
//! Provides argument parsing and the non-server subcommands.

use crate::error::{AppError, AppResult};
use crate::store::{Store, document_types, users};
use clap::{Parser, Subcommand};

/// Study backend: document text extraction and AI study aids
#[derive(Parser)]
#[command(name = "study-companion")]
#[command(version)]
#[command(about = "Document study backend with AI summaries, quizzes, flashcards and search")]
#[command(
    long_about = "Study Companion stores uploaded study documents, extracts their text and \
    generates summaries, quizzes, flashcards, answers and search results with a hosted \
    language model, falling back to rule-based generation when the model is unavailable."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Insert the built-in document types that are missing
    SeedTypes,
    /// Create a user and print their API token
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
    },
}

/// Seed the document type catalogue, returning how many types were added
pub fn seed_types(store: &Store) -> AppResult<usize> {
    let created = store.with_conn(document_types::seed_defaults)?;
    tracing::info!(created, "Seeded default document types");
    Ok(created)
}

/// Create a user, returning the API token key
pub fn create_user(store: &Store, username: &str, email: &str) -> AppResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username cannot be empty".to_string()));
    }
    let (user, key) = store.with_conn(|conn| users::create_user(conn, username, email.trim()))?;
    tracing::info!(user_id = user.id, username = %user.username, "Created user");
    Ok(key)
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Study Companion Configuration
# ============================
#
# Only [server] is required. Every other section shows its defaults and may be
# removed entirely.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "127.0.0.1"

# Port to listen on
port = 8000

# Whole-request timeout in seconds (text extraction and model calls included)
request_timeout_seconds = 30

# Largest accepted upload, in megabytes (at most 1024)
max_upload_mb = 25

# ─────────────────────────────────────────────────────────────────────────────
# STORAGE
# ─────────────────────────────────────────────────────────────────────────────

[storage]
# SQLite database file (created and migrated on startup)
database_path = "study_companion.sqlite3"

# Uploaded files are stored under <media_root>/documents/
media_root = "media"

# Serve media_root under /media (development only; use a web server in production)
serve_media = false

# ─────────────────────────────────────────────────────────────────────────────
# AI PROVIDER
# ─────────────────────────────────────────────────────────────────────────────
#
# Without an API key every feature still works using rule-based fallbacks.

[ai]
enabled = true
base_url = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-1.5-flash"

# Environment variable holding the API key
api_key_env = "GOOGLE_API_KEY"
timeout_seconds = 30

# Quizzes, flashcards, answers and search
[ai.standard]
temperature = 0.3
top_p = 0.8
top_k = 40
max_output_tokens = 1024

# Summaries
[ai.brief]
temperature = 0.2
top_p = 0.8
top_k = 40
max_output_tokens = 512

# ─────────────────────────────────────────────────────────────────────────────
# LIMITS
# ─────────────────────────────────────────────────────────────────────────────

[limits]
# Hourly AI request budget per user, applied to paths containing these fragments
ai_requests_per_hour = 50
rate_limited_paths = [
    "/api/documents/",
    "/summarize/",
    "/generate-quiz/",
    "/generate-flashcards/",
    "/qna/",
    "/search/",
    "/search/suggestions/",
]

max_question_chars = 1000
min_search_query_chars = 3
max_search_query_chars = 500
min_suggestion_query_chars = 2
max_suggestion_query_chars = 100

# Documents (and characters of each) sent to the model
search_document_limit = 10
search_content_chars = 1000
suggestion_document_limit = 5
suggestion_content_chars = 300

# ─────────────────────────────────────────────────────────────────────────────
# CACHES AND LOCKS (seconds)
# ─────────────────────────────────────────────────────────────────────────────

[cache]
generation_lock_seconds = 30
summary_ttl_seconds = 86400
suggestions_ttl_seconds = 600
search_fresh_seconds = 3600
sweep_interval_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# TEXT EXTRACTION
# ─────────────────────────────────────────────────────────────────────────────
#
# Images and scanned PDFs need Tesseract; scanned PDFs also need Poppler.
#   macOS: brew install tesseract poppler
#   Linux: sudo apt-get install tesseract-ocr poppler-utils

[extraction]
ocr_enabled = true
tesseract_command = "tesseract"
pdftoppm_command = "pdftoppm"
ocr_dpi = 200

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
