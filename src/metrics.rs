//! Prometheus metrics collection for Study Companion
//!
//! Tracks:
//! - AI calls by operation and outcome (model answer, fallback, error)
//! - AI call latency
//! - cache hits, lock contention and rate-limit rejections
//! - text extractions by file format and outcome
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// AI-backed operation, used as a bounded metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Summary,
    Quiz,
    Flashcards,
    Answer,
    Search,
    Suggestions,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Summary => "summary",
            Operation::Quiz => "quiz",
            Operation::Flashcards => "flashcards",
            Operation::Answer => "answer",
            Operation::Search => "search",
            Operation::Suggestions => "suggestions",
        }
    }
}

/// How an AI operation was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The model produced the result
    Ai,
    /// The deterministic generator produced the result
    Fallback,
    /// Neither produced a result
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ai => "ai",
            Outcome::Fallback => "fallback",
            Outcome::Error => "error",
        }
    }
}

/// Metrics collector
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    ai_requests: IntCounterVec,
    ai_duration: HistogramVec,
    cache_hits: IntCounterVec,
    lock_contention: IntCounterVec,
    rate_limit_rejections: IntCounter,
    extractions: IntCounterVec,
    background_task_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 6 operations × 3 outcomes
        let ai_requests = IntCounterVec::new(
            Opts::new(
                "study_companion_ai_requests_total",
                "AI operations by operation and outcome (ai, fallback, error)",
            ),
            &["operation", "outcome"],
        )?;

        let ai_duration = HistogramVec::new(
            HistogramOpts::new(
                "study_companion_ai_duration_ms",
                "Model provider call latency in milliseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            ]),
            &["operation"],
        )?;

        let cache_hits = IntCounterVec::new(
            Opts::new(
                "study_companion_cache_hits_total",
                "Results served from a cache or an existing stored study aid",
            ),
            &["operation"],
        )?;

        let lock_contention = IntCounterVec::new(
            Opts::new(
                "study_companion_lock_contention_total",
                "Requests turned away because a generation lock was already held",
            ),
            &["operation"],
        )?;

        let rate_limit_rejections = IntCounter::with_opts(Opts::new(
            "study_companion_rate_limit_rejections_total",
            "Requests rejected by the hourly AI rate limit",
        ))?;

        // Format label comes from a fixed extension list, see extract::format_label
        let extractions = IntCounterVec::new(
            Opts::new(
                "study_companion_extractions_total",
                "Text extractions by file format and outcome",
            ),
            &["format", "outcome"],
        )?;

        let background_task_failures = IntCounterVec::new(
            Opts::new(
                "study_companion_background_task_failures_total",
                "Background task terminations by task. Alert on ANY increment.",
            ),
            &["task"],
        )?;

        registry.register(Box::new(ai_requests.clone()))?;
        registry.register(Box::new(ai_duration.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(lock_contention.clone()))?;
        registry.register(Box::new(rate_limit_rejections.clone()))?;
        registry.register(Box::new(extractions.clone()))?;
        registry.register(Box::new(background_task_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            ai_requests,
            ai_duration,
            cache_hits,
            lock_contention,
            rate_limit_rejections,
            extractions,
            background_task_failures,
        })
    }

    /// Record how an AI operation was satisfied
    pub fn record_ai_outcome(&self, operation: Operation, outcome: Outcome) {
        self.ai_requests
            .with_label_values(&[operation.as_str(), outcome.as_str()])
            .inc();
    }

    /// Number of recorded outcomes for one operation/outcome pair
    pub fn ai_outcome_count(&self, operation: Operation, outcome: Outcome) -> u64 {
        self.ai_requests
            .with_label_values(&[operation.as_str(), outcome.as_str()])
            .get()
    }

    /// Record model call latency
    ///
    /// # Errors
    ///
    /// NaN, infinite and negative durations are rejected; they would corrupt
    /// every percentile of the histogram.
    pub fn record_ai_duration(
        &self,
        operation: Operation,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }

        self.ai_duration
            .get_metric_with_label_values(&[operation.as_str()])?
            .observe(duration_ms);
        Ok(())
    }

    pub fn cache_hit(&self, operation: Operation) {
        self.cache_hits.with_label_values(&[operation.as_str()]).inc();
    }

    pub fn cache_hits_count(&self, operation: Operation) -> u64 {
        self.cache_hits.with_label_values(&[operation.as_str()]).get()
    }

    pub fn lock_contended(&self, operation: Operation) {
        self.lock_contention
            .with_label_values(&[operation.as_str()])
            .inc();
    }

    pub fn lock_contention_count(&self, operation: Operation) -> u64 {
        self.lock_contention
            .with_label_values(&[operation.as_str()])
            .get()
    }

    pub fn rate_limited(&self) {
        self.rate_limit_rejections.inc();
    }

    pub fn rate_limited_count(&self) -> u64 {
        self.rate_limit_rejections.get()
    }

    /// Record a text extraction attempt
    ///
    /// `format` must be a bounded label such as `pdf` or `other`.
    pub fn record_extraction(&self, format: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.extractions
            .with_label_values(&[format, outcome])
            .inc();
    }

    pub fn extraction_count(&self, format: &str, success: bool) -> u64 {
        let outcome = if success { "success" } else { "failure" };
        self.extractions.with_label_values(&[format, outcome]).get()
    }

    /// Record the termination of a background task that should run forever
    pub fn background_task_failure(&self, task: &str) {
        self.background_task_failures
            .with_label_values(&[task])
            .inc();
    }

    pub fn background_task_failures_count(&self, task: &str) -> u64 {
        self.background_task_failures
            .with_label_values(&[task])
            .get()
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_count,
                    "Prometheus text encoder failed"
                );
                prometheus::Error::Msg(format!(
                    "Failed to encode {} metric families: {}",
                    metric_count, e
                ))
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
