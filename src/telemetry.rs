//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing subscriber for structured logging
///
/// Only the first call per process has any effect.
///
/// `RUST_LOG` wins over `default_level` (the `observability.log_level`
/// setting) when it is set and parses.
///
/// # Examples
///
/// ```no_run
/// study_companion::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("study_companion={},tower_http=debug", default_level))
        });

        // A host application (or test harness) may already own the global subscriber
        if tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .is_err()
        {
            eprintln!("tracing subscriber already installed; keeping the existing one");
        }
    });
}
