//! Generic resolve-or-fetch cache with a freshness window and a bounded
//! reload budget.
//!
//! Every bulk resolver in the crate sits on one of these. The contents are an
//! immutable snapshot behind a `watch` channel, swapped wholesale on each
//! successful reload — readers never observe a half-replaced generation.
//! Reads are lock-free and never perform I/O; stale entries keep being served
//! as last-known-good while a refresh is attempted.
//!
//! `ensure_loaded` is single-flight: concurrent callers on a cold or stale
//! cache collapse into one outbound fetch, and every caller that queued
//! behind it observes that fetch's outcome. After `MAX_LOAD_ATTEMPTS`
//! consecutive failures the cache stops fetching entirely until an explicit
//! `invalidate`, so a misbehaving or absent endpoint cannot cause a retry
//! storm.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

/// How long a successful bulk load stays fresh.
pub(crate) const FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Consecutive reload failures tolerated before backing off until an
/// explicit `invalidate`.
pub(crate) const MAX_LOAD_ATTEMPTS: u32 = 3;

/// Reload-attempt accounting since the last successful bulk load.
#[derive(Debug, Default)]
pub struct LoadBudget {
    /// Consecutive failures since the last success.
    pub attempts: u32,
    /// When the most recent reload attempt started, successful or not.
    pub last_attempt_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct LoadState {
    /// When the last successful bulk load finished. `None` means never
    /// loaded (or invalidated), which always fails the freshness check.
    loaded_at: Option<Instant>,
    budget: LoadBudget,
}

/// Keyed snapshot cache with TTL freshness and a bounded reload budget.
pub struct TtlCache<V> {
    /// Current snapshot, swapped wholesale on successful reloads.
    rx: watch::Receiver<Arc<HashMap<String, V>>>,
    tx: watch::Sender<Arc<HashMap<String, V>>>,
    /// Guards the load path. Holding it across the fetch is what collapses
    /// concurrent `ensure_loaded` calls into a single request.
    state: Mutex<LoadState>,
    /// Bumped after every completed fetch attempt, so callers that queued
    /// behind an in-flight load can tell it finished while they waited.
    generation: AtomicU64,
    freshness_window: Duration,
    max_attempts: u32,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_policy(FRESHNESS_WINDOW, MAX_LOAD_ATTEMPTS)
    }

    pub fn with_policy(freshness_window: Duration, max_attempts: u32) -> Self {
        let (tx, rx) = watch::channel(Arc::new(HashMap::new()));
        Self {
            rx,
            tx,
            state: Mutex::new(LoadState::default()),
            generation: AtomicU64::new(0),
            freshness_window,
            max_attempts,
        }
    }

    /// Fetch-free lookup. Stale entries are still returned: last-known-good
    /// beats absent while a refresh is pending.
    pub fn get(&self, key: &str) -> Option<V> {
        self.rx.borrow().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.borrow().len()
    }

    /// Clone out every cached value.
    pub fn values(&self) -> Vec<V> {
        self.rx.borrow().values().cloned().collect()
    }

    /// Insert a single entry outside the bulk path. Leaves the freshness
    /// stamp and the load budget untouched.
    pub fn upsert(&self, key: impl Into<String>, value: V) {
        self.tx.send_modify(|snapshot| {
            Arc::make_mut(snapshot).insert(key.into(), value);
        });
    }

    /// Reload the cache through `fetch` unless it is fresh and non-empty,
    /// the reload budget is exhausted, or another caller's fetch completed
    /// while this one waited its turn.
    ///
    /// On success the entire contents are replaced and the budget resets; on
    /// failure the previous contents stay untouched and `attempts` grows.
    /// Errors are absorbed here; callers re-check the cache afterwards.
    pub async fn ensure_loaded<F, Fut>(&self, fetch: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Vec<(String, V)>>>,
    {
        let entered_at = self.generation.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        // A fetch completed while we queued for the lock; its outcome is ours.
        if self.generation.load(Ordering::Acquire) != entered_at {
            return;
        }

        let fresh = state
            .loaded_at
            .is_some_and(|at| at.elapsed() < self.freshness_window);
        if fresh && !self.is_empty() {
            return;
        }

        if state.budget.attempts >= self.max_attempts {
            debug!(
                attempts = state.budget.attempts,
                "reload budget exhausted, skipping fetch"
            );
            return;
        }

        state.budget.last_attempt_at = Some(Instant::now());
        match fetch().await {
            Ok(items) => {
                let count = items.len();
                self.tx.send_replace(Arc::new(items.into_iter().collect()));
                state.loaded_at = Some(Instant::now());
                state.budget.attempts = 0;
                debug!(entries = count, "cache reloaded");
            }
            Err(e) => {
                state.budget.attempts += 1;
                warn!(
                    error = %e,
                    attempts = state.budget.attempts,
                    "cache reload failed, keeping previous contents"
                );
            }
        }
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Drop everything, forget the freshness stamp and reset the budget,
    /// forcing the next `ensure_loaded` to fetch.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        self.tx.send_replace(Arc::new(HashMap::new()));
        state.loaded_at = None;
        state.budget = LoadBudget::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn seeded(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn loads_on_first_call_and_serves_from_snapshot() {
        let cache = TtlCache::<String>::new();
        let calls = AtomicUsize::new(0);

        cache
            .ensure_loaded(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(seeded(&[("east", "East Campus")])) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("east").as_deref(), Some("East Campus"));
        assert_eq!(cache.get("west"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn freshness_window_gates_reloads() {
        let cache = TtlCache::<String>::new();
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(seeded(&[("east", "East Campus")])) }
        };

        cache.ensure_loaded(load).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Within the window: no new fetch.
        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        cache.ensure_loaded(load).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Past the window: one more fetch.
        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        cache.ensure_loaded(load).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_keep_being_served() {
        let cache = TtlCache::<String>::new();
        cache
            .ensure_loaded(|| async { Ok(seeded(&[("east", "East Campus")])) })
            .await;

        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        assert_eq!(cache.get("east").as_deref(), Some("East Campus"));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_reload_replaces_wholesale() {
        let cache = TtlCache::<String>::new();
        cache
            .ensure_loaded(|| async { Ok(seeded(&[("east", "East Campus"), ("west", "West")])) })
            .await;

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        cache
            .ensure_loaded(|| async { Ok(seeded(&[("east", "East Campus")])) })
            .await;

        // "west" vanished from the new response, so it must be dropped.
        assert_eq!(cache.get("west"), None);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reload_keeps_previous_contents() {
        let cache = TtlCache::<String>::new();
        cache
            .ensure_loaded(|| async { Ok(seeded(&[("east", "East Campus")])) })
            .await;

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        cache
            .ensure_loaded(|| async { Err(anyhow::anyhow!("controller unreachable")) })
            .await;

        assert_eq!(cache.get("east").as_deref(), Some("East Campus"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_stops_fetching_until_invalidate() {
        let cache = TtlCache::<String>::new();
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("controller unreachable")) }
        };

        for _ in 0..3 {
            cache.ensure_loaded(load).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Budget exhausted: the fourth call performs zero outbound requests.
        cache.ensure_loaded(load).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Explicit invalidation re-arms the budget.
        cache.invalidate().await;
        cache.ensure_loaded(load).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(cache.state.lock().await.budget.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_successful_response_is_not_a_failure() {
        let cache = TtlCache::<String>::new();
        cache.ensure_loaded(|| async { Ok(Vec::new()) }).await;

        let state = cache.state.lock().await;
        assert_eq!(state.budget.attempts, 0);
        assert!(state.loaded_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_cold_calls_collapse_to_one_fetch() {
        let cache = Arc::new(TtlCache::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .ensure_loaded(|| {
                            let calls = calls.clone();
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(25)).await;
                                Ok(seeded(&[("east", "East Campus")]))
                            }
                        })
                        .await;
                    cache.get("east")
                })
            })
            .collect();

        for task in tasks {
            // Every caller observes the one fetch's resulting state.
            assert_eq!(task.await.unwrap().as_deref(), Some("East Campus"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_a_failed_fetch_outcome() {
        let cache = Arc::new(TtlCache::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .ensure_loaded(|| {
                            let calls = calls.clone();
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(25)).await;
                                Err(anyhow::anyhow!("controller unreachable"))
                            }
                        })
                        .await;
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        // One shared failure and one budget increment, not four.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state.lock().await.budget.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn upsert_does_not_touch_budget_or_freshness() {
        let cache = TtlCache::<String>::new();
        let calls = AtomicUsize::new(0);

        cache.upsert("north", "North Annex".to_string());
        assert_eq!(cache.get("north").as_deref(), Some("North Annex"));

        // The upsert did not stamp the cache as loaded: ensure_loaded still
        // fetches (the one-off entry survives only until the bulk replace).
        cache
            .ensure_loaded(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(seeded(&[("east", "East Campus")])) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("north"), None);
        assert_eq!(cache.state.lock().await.budget.attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_refetch_despite_freshness() {
        let cache = TtlCache::<String>::new();
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(seeded(&[("east", "East Campus")])) }
        };

        cache.ensure_loaded(load).await;
        cache.invalidate().await;
        assert_eq!(cache.get("east"), None);

        cache.ensure_loaded(load).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
