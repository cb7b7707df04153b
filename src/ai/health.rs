//! Health tracking for the model provider
//!
//! Generation outcomes feed a small state machine:
//! - 3 consecutive failures → degraded
//! - 1 success → operational

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

const DEGRADED_AFTER_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Operational,
    Degraded,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Degraded => "degraded",
        }
    }
}

/// Snapshot of the provider's health
///
/// Fields are private so the state can only change through
/// [`ProviderHealth::mark_success`] and [`ProviderHealth::mark_failure`].
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    state: HealthState,
    consecutive_failures: u32,
    last_update: Instant,
}

impl HealthSnapshot {
    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }
}

#[derive(Debug, Clone)]
pub struct ProviderHealth {
    inner: Arc<RwLock<HealthSnapshot>>,
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderHealth {
    /// Start in the operational state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthSnapshot {
                state: HealthState::Operational,
                consecutive_failures: 0,
                last_update: Instant::now(),
            })),
        }
    }

    pub async fn state(&self) -> HealthState {
        self.inner.read().await.state
    }

    pub async fn snapshot(&self) -> HealthSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn mark_failure(&self) {
        let mut health = self.inner.write().await;
        health.consecutive_failures += 1;
        health.last_update = Instant::now();

        if health.consecutive_failures >= DEGRADED_AFTER_FAILURES {
            if health.state == HealthState::Operational {
                // Log only on transition
                tracing::warn!(
                    consecutive_failures = health.consecutive_failures,
                    "Model provider marked as degraded after consecutive failures"
                );
            }
            health.state = HealthState::Degraded;
        } else {
            tracing::debug!(
                consecutive_failures = health.consecutive_failures,
                "Model provider failure recorded (still operational)"
            );
        }
    }

    pub async fn mark_success(&self) {
        let mut health = self.inner.write().await;
        let was_degraded = health.state == HealthState::Degraded;

        health.consecutive_failures = 0;
        health.state = HealthState::Operational;
        health.last_update = Instant::now();

        if was_degraded {
            tracing::info!("Model provider recovered to operational state");
        }
    }
}
