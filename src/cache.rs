//! Read-through cache with request coalescing and stale-on-error fallback.
//!
//! One entry per key (e.g. per year). A fresh entry short-circuits the
//! upstream call; concurrent callers during a refresh coalesce onto the same
//! fetch through a per-key async gate; a failed refresh silently serves the
//! previous payload while it is younger than the stale TTL.
//!
//! The clock and the fetch function are both injected so tests control time
//! and failure without real network calls.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// Time source for TTL math.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock backed [`Clock`].
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<T> {
    payload: Arc<T>,
    fetched_at: Instant,
}

/// Keyed read-through cache. Entries are replaced on refresh and never
/// evicted — the key space is a handful of years/datasets, bounded by
/// process lifetime.
pub struct ValueCache<T> {
    fresh_ttl: Duration,
    stale_ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry<T>>>,
    // Per-key fetch gates: whoever holds the gate is the one upstream call
    // in flight for that key.
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<T: Send + Sync + 'static> ValueCache<T> {
    pub fn new(fresh_ttl: Duration, stale_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            fresh_ttl,
            stale_ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttls_ms(fresh_ttl_ms: u64, stale_ttl_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(fresh_ttl_ms),
            Duration::from_millis(stale_ttl_ms),
            Arc::new(SystemClock),
        )
    }

    /// Look up `key`, calling `fetch` at most once across all concurrent
    /// callers when the entry is missing or expired.
    ///
    /// `force` skips the fresh short-circuit (a real upstream attempt is
    /// made) but still coalesces with an in-flight fetch and still falls
    /// back to a stale entry on failure.
    pub async fn get_with<E, F, Fut>(&self, key: &str, force: bool, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = self.clock.now();

        if !force {
            if let Some(hit) = self.fresh_entry(key, started) {
                return Ok(hit);
            }
        }

        let gate = self.gate(key);
        let _in_flight = gate.lock().await;

        // Re-check under the gate: another caller may have refreshed while we
        // waited. A forced caller only accepts an entry written after it
        // began waiting (it coalesced onto that fetch); a normal caller also
        // accepts anything still inside the fresh window.
        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(key) {
                let refreshed_while_waiting = entry.fetched_at >= started;
                let still_fresh =
                    self.clock.now().duration_since(entry.fetched_at) < self.fresh_ttl;
                if refreshed_while_waiting || (!force && still_fresh) {
                    return Ok(entry.payload.clone());
                }
            }
        }

        match fetch().await {
            Ok(value) => {
                let payload = Arc::new(value);
                self.entries.lock().insert(
                    key.to_string(),
                    Entry {
                        payload: payload.clone(),
                        fetched_at: self.clock.now(),
                    },
                );
                Ok(payload)
            }
            Err(err) => {
                let entries = self.entries.lock();
                if let Some(entry) = entries.get(key) {
                    if self.clock.now().duration_since(entry.fetched_at) < self.stale_ttl {
                        log::warn!("cache: upstream fetch for '{}' failed, serving stale entry", key);
                        return Ok(entry.payload.clone());
                    }
                }
                Err(err)
            }
        }
    }

    fn fresh_entry(&self, key: &str, now: Instant) -> Option<Arc<T>> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if now.duration_since(entry.fetched_at) < self.fresh_ttl {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    fn gate(&self, key: &str) -> Arc<AsyncMutex<()>> {
        self.gates
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Clock advanced by hand from tests.
    struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock()
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn cache_with_clock(clock: Arc<ManualClock>) -> ValueCache<u32> {
        ValueCache::new(secs(60), secs(600), clock)
    }

    #[tokio::test]
    async fn fresh_entry_short_circuits_upstream() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = calls.clone();
            let got = cache
                .get_with::<String, _, _>("2025", false, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(*got, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        cache
            .get_with::<String, _, _>("2025", false, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();

        clock.advance(secs(120));
        let counter = calls.clone();
        let got = cache
            .get_with::<String, _, _>("2025", false, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(*got, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_coalesce_into_one_fetch() {
        let cache = Arc::new(ValueCache::<u32>::with_ttls_ms(60_000, 600_000));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_with::<String, _, _>("2025", false, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // hold the fetch open long enough for the others to queue
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut payloads = Vec::new();
        for handle in handles {
            payloads.push(handle.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(payloads.iter().all(|p| **p == 42));
        // all callers share the one stored payload
        assert!(payloads.iter().all(|p| Arc::ptr_eq(p, &payloads[0])));
    }

    #[tokio::test]
    async fn failed_refresh_serves_stale_within_stale_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock.clone());

        cache
            .get_with::<String, _, _>("2025", false, || async { Ok(11) })
            .await
            .unwrap();

        // past fresh TTL, inside stale TTL
        clock.advance(secs(120));
        let got = cache
            .get_with("2025", false, || async { Err("quota".to_string()) })
            .await
            .unwrap();
        assert_eq!(*got, 11);
    }

    #[tokio::test]
    async fn failed_refresh_past_stale_ttl_propagates() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock.clone());

        cache
            .get_with::<String, _, _>("2025", false, || async { Ok(11) })
            .await
            .unwrap();

        clock.advance(secs(700));
        let err = cache
            .get_with::<String, _, _>("2025", false, || async { Err("quota".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "quota");
    }

    #[tokio::test]
    async fn failure_with_no_entry_propagates() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock);
        let err = cache
            .get_with::<String, _, _>("2026", false, || async { Err("down".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "down");
    }

    #[tokio::test]
    async fn force_bypasses_fresh_entry_but_keeps_stale_fallback() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        cache
            .get_with::<String, _, _>("2025", false, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();

        // entry is fresh, but force makes a real attempt anyway
        let counter = calls.clone();
        let got = cache
            .get_with::<String, _, _>("2025", true, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(*got, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // forced attempt that fails still degrades to the cached payload
        let got = cache
            .get_with("2025", true, || async { Err("down".to_string()) })
            .await
            .unwrap();
        assert_eq!(*got, 2);
    }

    #[tokio::test]
    async fn failed_fetch_releases_the_gate_for_the_next_caller() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock);

        let _ = cache
            .get_with::<String, _, _>("2025", false, || async { Err("down".to_string()) })
            .await;

        let got = cache
            .get_with::<String, _, _>("2025", false, || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(*got, 5);
    }

    #[tokio::test]
    async fn keys_fetch_independently() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with_clock(clock);
        let calls = Arc::new(AtomicUsize::new(0));

        for key in ["2025", "2026"] {
            let counter = calls.clone();
            cache
                .get_with::<String, _, _>(key, false, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
