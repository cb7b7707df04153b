//! Configuration management for Study Companion
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Only `[server]` is mandatory; every other section falls back to the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Placeholder shipped in sample `.env` files; treated as "no key".
const API_KEY_PLACEHOLDER: &str = "your_api_key_here";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_request_timeout() -> u64 {
    30
}

/// Upper bound for `server.max_upload_mb`
pub const MAX_UPLOAD_MB: usize = 1024;

fn default_max_upload_mb() -> usize {
    25
}

/// Database and uploaded-file locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub media_root: PathBuf,
    /// Serve `media_root` under `/media` (development convenience)
    pub serve_media: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("study_companion.sqlite3"),
            media_root: PathBuf::from("media"),
            serve_media: false,
        }
    }
}

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GenerationProfile {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl GenerationProfile {
    /// Profile for quizzes, flashcards, answers and search
    pub fn standard() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }

    /// Shorter, more focused profile used for summaries
    pub fn brief() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 512,
        }
    }
}

/// Model provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiConfig {
    /// When false every AI operation uses its deterministic fallback
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_seconds: u64,
    #[serde(default = "GenerationProfile::standard")]
    pub standard: GenerationProfile,
    #[serde(default = "GenerationProfile::brief")]
    pub brief: GenerationProfile,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeout_seconds: 30,
            standard: GenerationProfile::standard(),
            brief: GenerationProfile::brief(),
        }
    }
}

impl AiConfig {
    /// Resolve the API key from the process environment
    ///
    /// Returns `None` when AI is disabled, the variable is unset or empty,
    /// or it still holds the sample placeholder.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    /// Resolve the API key through an arbitrary lookup function
    pub fn api_key_from<F>(&self, lookup: F) -> Option<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if !self.enabled {
            return None;
        }
        lookup(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != API_KEY_PLACEHOLDER)
    }
}

/// Request validation and rate limiting limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// AI endpoint calls allowed per user per clock hour
    pub ai_requests_per_hour: u32,
    /// Path fragments that count towards the hourly AI limit
    pub rate_limited_paths: Vec<String>,
    pub max_question_chars: usize,
    pub min_search_query_chars: usize,
    pub max_search_query_chars: usize,
    pub min_suggestion_query_chars: usize,
    pub max_suggestion_query_chars: usize,
    /// Documents considered per search request
    pub search_document_limit: usize,
    /// Characters of each document sent to search
    pub search_content_chars: usize,
    pub suggestion_document_limit: usize,
    pub suggestion_content_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            ai_requests_per_hour: 50,
            rate_limited_paths: [
                "/api/documents/",
                "/summarize/",
                "/generate-quiz/",
                "/generate-flashcards/",
                "/qna/",
                "/search/",
                "/search/suggestions/",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            max_question_chars: 1000,
            min_search_query_chars: 3,
            max_search_query_chars: 500,
            min_suggestion_query_chars: 2,
            max_suggestion_query_chars: 100,
            search_document_limit: 10,
            search_content_chars: 1000,
            suggestion_document_limit: 5,
            suggestion_content_chars: 300,
        }
    }
}

/// TTLs for in-memory caches and generation locks (seconds)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub generation_lock_seconds: u64,
    pub summary_ttl_seconds: u64,
    pub suggestions_ttl_seconds: u64,
    /// Persisted search results younger than this are served as-is
    pub search_fresh_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            generation_lock_seconds: 30,
            summary_ttl_seconds: 86_400,
            suggestions_ttl_seconds: 600,
            search_fresh_seconds: 3_600,
            sweep_interval_seconds: 60,
        }
    }
}

/// External OCR tooling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub ocr_enabled: bool,
    pub tesseract_command: String,
    pub pdftoppm_command: String,
    pub ocr_dpi: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: true,
            tesseract_command: "tesseract".to_string(),
            pdftoppm_command: "pdftoppm".to_string(),
            ocr_dpi: 200,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when
    /// building a `Config` by hand.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::AppError;

        if self.server.host.trim().is_empty() {
            return Err(AppError::Config("server.host cannot be empty".to_string()));
        }

        if self.server.request_timeout_seconds == 0 || self.server.request_timeout_seconds > 300 {
            return Err(AppError::Config(format!(
                "server.request_timeout_seconds must be in (0, 300], got {}",
                self.server.request_timeout_seconds
            )));
        }

        if self.server.max_upload_mb == 0 || self.server.max_upload_mb > MAX_UPLOAD_MB {
            return Err(AppError::Config(format!(
                "server.max_upload_mb must be in (0, {}], got {}",
                MAX_UPLOAD_MB, self.server.max_upload_mb
            )));
        }

        if !self.ai.base_url.starts_with("http://") && !self.ai.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "ai.base_url '{}' must start with 'http://' or 'https://'",
                self.ai.base_url
            )));
        }

        if self.ai.model.trim().is_empty() {
            return Err(AppError::Config("ai.model cannot be empty".to_string()));
        }

        if self.ai.timeout_seconds == 0 || self.ai.timeout_seconds > 300 {
            return Err(AppError::Config(format!(
                "ai.timeout_seconds must be in (0, 300], got {}",
                self.ai.timeout_seconds
            )));
        }

        for (name, profile) in [("standard", &self.ai.standard), ("brief", &self.ai.brief)] {
            if !profile.temperature.is_finite() || !(0.0..=2.0).contains(&profile.temperature) {
                return Err(AppError::Config(format!(
                    "ai.{}.temperature must be a finite number between 0.0 and 2.0, got {}",
                    name, profile.temperature
                )));
            }
            if !profile.top_p.is_finite() || profile.top_p <= 0.0 || profile.top_p > 1.0 {
                return Err(AppError::Config(format!(
                    "ai.{}.top_p must be in (0.0, 1.0], got {}",
                    name, profile.top_p
                )));
            }
            if profile.max_output_tokens == 0 {
                return Err(AppError::Config(format!(
                    "ai.{}.max_output_tokens must be greater than 0",
                    name
                )));
            }
        }

        if self.limits.ai_requests_per_hour == 0 {
            return Err(AppError::Config(
                "limits.ai_requests_per_hour must be greater than 0".to_string(),
            ));
        }

        if self.limits.min_search_query_chars > self.limits.max_search_query_chars {
            return Err(AppError::Config(format!(
                "limits.min_search_query_chars ({}) exceeds limits.max_search_query_chars ({})",
                self.limits.min_search_query_chars, self.limits.max_search_query_chars
            )));
        }

        if self.limits.min_suggestion_query_chars > self.limits.max_suggestion_query_chars {
            return Err(AppError::Config(format!(
                "limits.min_suggestion_query_chars ({}) exceeds limits.max_suggestion_query_chars ({})",
                self.limits.min_suggestion_query_chars, self.limits.max_suggestion_query_chars
            )));
        }

        if self.limits.search_document_limit == 0 || self.limits.suggestion_document_limit == 0 {
            return Err(AppError::Config(
                "limits.search_document_limit and limits.suggestion_document_limit must be greater than 0"
                    .to_string(),
            ));
        }

        if self.cache.generation_lock_seconds == 0 {
            return Err(AppError::Config(
                "cache.generation_lock_seconds must be greater than 0".to_string(),
            ));
        }

        if self.cache.sweep_interval_seconds == 0 {
            return Err(AppError::Config(
                "cache.sweep_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.extraction.ocr_dpi == 0 {
            return Err(AppError::Config(
                "extraction.ocr_dpi must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = crate::error::AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8000
"#;

    const FULL_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 9000
request_timeout_seconds = 45
max_upload_mb = 10

[storage]
database_path = "/var/lib/study/db.sqlite3"
media_root = "/var/lib/study/media"
serve_media = true

[ai]
enabled = true
base_url = "http://localhost:8089/v1beta"
model = "gemini-test"
api_key_env = "STUDY_KEY"
timeout_seconds = 20

[ai.brief]
temperature = 0.1
top_p = 0.5
top_k = 10
max_output_tokens = 128

[limits]
ai_requests_per_hour = 5

[cache]
summary_ttl_seconds = 60

[extraction]
ocr_enabled = false

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str(MINIMAL_CONFIG).expect("should parse config");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(config.ai.model, "gemini-1.5-flash");
        assert_eq!(config.ai.standard, GenerationProfile::standard());
        assert_eq!(config.ai.brief, GenerationProfile::brief());
        assert_eq!(config.limits.ai_requests_per_hour, 50);
        assert_eq!(config.limits.rate_limited_paths.len(), 7);
        assert_eq!(config.cache.generation_lock_seconds, 30);
        assert_eq!(config.cache.summary_ttl_seconds, 86_400);
        assert_eq!(config.extraction.ocr_dpi, 200);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.storage.serve_media);
    }

    #[test]
    fn test_full_config_overrides_defaults() {
        let config = Config::from_str(FULL_CONFIG).expect("should parse config");
        assert_eq!(config.server.max_upload_mb, 10);
        assert_eq!(
            config.storage.database_path,
            PathBuf::from("/var/lib/study/db.sqlite3")
        );
        assert!(config.storage.serve_media);
        assert_eq!(config.ai.model, "gemini-test");
        assert_eq!(config.ai.brief.max_output_tokens, 128);
        // Unspecified profile keeps its own default
        assert_eq!(config.ai.standard, GenerationProfile::standard());
        assert_eq!(config.limits.ai_requests_per_hour, 5);
        // Partially specified section keeps the remaining defaults
        assert_eq!(config.limits.max_question_chars, 1000);
        assert_eq!(config.cache.summary_ttl_seconds, 60);
        assert_eq!(config.cache.suggestions_ttl_seconds, 600);
        assert!(!config.extraction.ocr_enabled);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_missing_server_section_fails() {
        let result = Config::from_str("[ai]\nenabled = false\n");
        assert!(matches!(
            result,
            Err(crate::error::AppError::ConfigParseFailed { .. })
        ));
    }

    #[test]
    fn test_invalid_base_url_fails() {
        let toml = format!("{}\n[ai]\nbase_url = \"ftp://example.com\"\n", MINIMAL_CONFIG);
        let err = Config::from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("ai.base_url"));
    }

    #[test]
    fn test_zero_rate_limit_fails() {
        let toml = format!("{}\n[limits]\nai_requests_per_hour = 0\n", MINIMAL_CONFIG);
        let err = Config::from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("ai_requests_per_hour"));
    }

    #[test]
    fn test_upload_limit_is_bounded() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8000
max_upload_mb = 9223372036854775807
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("server.max_upload_mb"));

        let toml = "[server]\nhost = \"127.0.0.1\"\nport = 8000\nmax_upload_mb = 0\n";
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_excessive_request_timeout_fails() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8000
request_timeout_seconds = 301
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("request_timeout_seconds"));
    }

    #[test]
    fn test_temperature_out_of_range_fails() {
        let toml = format!(
            "{}\n[ai.standard]\ntemperature = 2.5\ntop_p = 0.8\ntop_k = 40\nmax_output_tokens = 1024\n",
            MINIMAL_CONFIG
        );
        let err = Config::from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_zero_lock_ttl_fails() {
        let toml = format!("{}\n[cache]\ngeneration_lock_seconds = 0\n", MINIMAL_CONFIG);
        assert!(Config::from_str(&toml).is_err());
    }

    #[test]
    fn test_search_bounds_must_be_ordered() {
        let toml = format!(
            "{}\n[limits]\nmin_search_query_chars = 10\nmax_search_query_chars = 5\n",
            MINIMAL_CONFIG
        );
        assert!(Config::from_str(&toml).is_err());
    }

    #[test]
    fn test_api_key_lookup_reads_named_variable() {
        let ai = AiConfig::default();
        let key = ai.api_key_from(|name| {
            assert_eq!(name, "GOOGLE_API_KEY");
            Some("  secret-key  ".to_string())
        });
        assert_eq!(key.as_deref(), Some("secret-key"));
    }

    #[test]
    fn test_api_key_placeholder_is_rejected() {
        let ai = AiConfig::default();
        assert!(ai
            .api_key_from(|_| Some("your_api_key_here".to_string()))
            .is_none());
        assert!(ai.api_key_from(|_| Some("   ".to_string())).is_none());
        assert!(ai.api_key_from(|_| None).is_none());
    }

    #[test]
    fn test_api_key_ignored_when_disabled() {
        let ai = AiConfig {
            enabled: false,
            ..AiConfig::default()
        };
        assert!(ai.api_key_from(|_| Some("real-key".to_string())).is_none());
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::ConfigFileRead { ref path, .. } if path.contains("not/here")
        ));
    }

    #[test]
    fn test_from_file_reads_valid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL_CONFIG).expect("write config");
        let config = Config::from_file(&path).expect("should load");
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
