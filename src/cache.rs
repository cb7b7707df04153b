//! In-process caches, generation locks and usage counters
//!
//! Everything here lives in memory and expires by TTL. Expired entries are
//! never returned; they are dropped lazily on access and eagerly by the
//! background sweeper started with [`Caches::start_sweeper`].

use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Lock a std mutex, recovering the data if a previous holder panicked
///
/// Every critical section below leaves the map consistent, so a poisoned
/// lock carries no broken invariant.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Key/value cache where every entry carries its own TTL
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get a live entry, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        lock(&self.entries).insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        lock(&self.entries).remove(key).map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, including ones that expired but were not purged yet
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct LockSlot {
    token: u64,
    expires_at: Instant,
}

/// Advisory locks that stop two requests generating the same study aid
///
/// Acquisition is an atomic set-if-absent. A lock whose TTL has passed is
/// free again, so a crashed holder can never wedge a resource.
pub struct GenerationLocks {
    slots: Arc<Mutex<HashMap<String, LockSlot>>>,
    next_token: AtomicU64,
}

impl GenerationLocks {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(1),
        }
    }

    /// Take the lock for `key` unless a live holder exists
    ///
    /// The returned guard releases the lock when dropped.
    pub fn try_acquire(&self, key: &str, ttl: Duration) -> Option<LockGuard> {
        let now = Instant::now();
        let mut slots = lock(&self.slots);

        if let Some(slot) = slots.get(key) {
            if slot.expires_at > now {
                tracing::debug!(lock_key = %key, "Generation lock already held");
                return None;
            }
            tracing::debug!(lock_key = %key, "Reclaiming expired generation lock");
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        slots.insert(
            key.to_string(),
            LockSlot {
                token,
                expires_at: now + ttl,
            },
        );

        Some(LockGuard {
            slots: Arc::clone(&self.slots),
            key: key.to_string(),
            token,
        })
    }

    /// Whether a live holder exists for `key`
    pub fn is_held(&self, key: &str) -> bool {
        lock(&self.slots)
            .get(key)
            .is_some_and(|slot| slot.expires_at > Instant::now())
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = lock(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| slot.expires_at > now);
        before - slots.len()
    }
}

impl Default for GenerationLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Held generation lock; released on drop
///
/// If the TTL ran out and another request took the lock over, dropping this
/// guard leaves the new holder's lock untouched.
pub struct LockGuard {
    slots: Arc<Mutex<HashMap<String, LockSlot>>>,
    key: String,
    token: u64,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut slots = lock(&self.slots);
        if slots.get(&self.key).is_some_and(|slot| slot.token == self.token) {
            slots.remove(&self.key);
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

/// Returned by [`UsageCounter::hit`] when the caller is over the limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitExceeded {
    pub count: u32,
    pub limit: u32,
}

/// Per-user request counter bucketed by UTC clock hour
pub struct UsageCounter {
    counts: Mutex<HashMap<String, Entry<u32>>>,
}

impl UsageCounter {
    const WINDOW: Duration = Duration::from_secs(3600);

    pub fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `user_id` in the current hour
    pub fn hit(&self, user_id: i64, limit: u32) -> Result<u32, LimitExceeded> {
        self.hit_at(user_id, limit, Utc::now())
    }

    /// Count one request for `user_id` in the hour containing `now`
    ///
    /// A request at the limit is rejected and not counted.
    pub fn hit_at(&self, user_id: i64, limit: u32, now: DateTime<Utc>) -> Result<u32, LimitExceeded> {
        let key = Self::bucket_key(user_id, now);
        let instant = Instant::now();
        let mut counts = lock(&self.counts);

        let current = counts
            .get(&key)
            .filter(|entry| entry.expires_at > instant)
            .map(|entry| entry.value)
            .unwrap_or(0);

        if current >= limit {
            return Err(LimitExceeded {
                count: current,
                limit,
            });
        }

        let count = current + 1;
        counts.insert(
            key,
            Entry {
                value: count,
                expires_at: instant + Self::WINDOW,
            },
        );
        Ok(count)
    }

    /// Cache key of the bucket `now` falls in, e.g. `api_usage_7_2024031514`
    pub fn bucket_key(user_id: i64, now: DateTime<Utc>) -> String {
        format!("api_usage_{}_{}", user_id, now.format("%Y%m%d%H"))
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut counts = lock(&self.counts);
        let before = counts.len();
        counts.retain(|_, entry| entry.expires_at > now);
        before - counts.len()
    }
}

impl Default for UsageCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// All in-memory state shared by the handlers
#[derive(Default)]
pub struct Caches {
    /// `summary_doc_{id}` → summary text
    pub summaries: TtlCache<String>,
    /// `suggestions_{user}_{hash16}` → suggestion list
    pub suggestions: TtlCache<Vec<String>>,
    pub locks: GenerationLocks,
    pub usage: UsageCounter,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Purge expired entries from every cache, returning the total removed
    pub fn purge_expired(&self) -> usize {
        self.summaries.purge_expired()
            + self.suggestions.purge_expired()
            + self.locks.purge_expired()
            + self.usage.purge_expired()
    }

    /// Start the background sweeper
    ///
    /// Spawns a task that purges expired entries every `interval`, plus a
    /// monitoring task that reports if the sweeper ever stops.
    pub fn start_sweeper(self: Arc<Self>, interval: Duration, metrics: Arc<Metrics>) {
        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_seconds = interval.as_secs(),
                "Starting background cache sweeper"
            );

            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = self.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired cache entries");
                }
            }
        });

        tokio::spawn(async move {
            match handle.await {
                Ok(_) => {
                    metrics.background_task_failure("cache_sweeper");
                    tracing::error!(
                        "Background cache sweeper terminated unexpectedly. \
                        Expired entries will only be dropped on access until restart."
                    );
                }
                Err(e) => {
                    metrics.background_task_failure("cache_sweeper");
                    tracing::error!(
                        error = %e,
                        "Background cache sweeper panicked. \
                        Expired entries will only be dropped on access until restart."
                    );
                }
            }
        });
    }
}
