use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::mirror::PgMirror;
use crate::ttl::{TtlClass, TtlPolicy};

/// A cached payload and its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub ttl_class: TtlClass,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub entry_count: usize,
    pub backing_store_available: bool,
}

/// In-memory TTL store shared by every run in the process.
///
/// Reads and writes are synchronous and never touch the network. When a
/// [`PgMirror`] is attached, each `put` is copied to Postgres on a spawned task;
/// mirror failures are logged and only flip `backing_store_available`.
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    policy: TtlPolicy,
    clock: Arc<dyn Clock>,
    mirror: Option<PgMirror>,
    mirror_healthy: Arc<AtomicBool>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    #[must_use]
    pub fn new(policy: TtlPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock: Arc::new(SystemClock),
            mirror: None,
            mirror_healthy: Arc::new(AtomicBool::new(false)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: PgMirror) -> Self {
        self.mirror = Some(mirror);
        self.mirror_healthy.store(true, Ordering::Relaxed);
        self
    }

    /// Look up a live entry. Expired entries are evicted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let found = match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) if occupied.get().is_expired(now) => {
                occupied.remove();
                tracing::debug!(key, "evicted expired cache entry");
                None
            }
            Entry::Occupied(occupied) => Some(occupied.get().value.clone()),
            Entry::Vacant(_) => None,
        };

        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `value` under `key`, replacing any existing entry.
    pub fn put(&self, key: &str, value: Value, ttl_class: TtlClass) {
        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(self.policy.duration(ttl_class))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheEntry {
            value,
            ttl_class,
            created_at,
            expires_at,
        };

        if let Some(mirror) = &self.mirror {
            self.spawn_mirror_write(mirror.clone(), key.to_string(), entry.clone());
        }

        self.entries.insert(key.to_string(), entry);
    }

    /// Typed lookup. A payload that no longer deserializes into `T` is a miss.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(key, error = %e, "cached payload has unexpected shape");
                None
            }
        }
    }

    /// Typed store. Values that fail to serialize are not cached.
    pub fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl_class: TtlClass) {
        match serde_json::to_value(value) {
            Ok(json) => self.put(key, json, ttl_class),
            Err(e) => tracing::warn!(key, error = %e, "failed to serialize cache payload"),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entry_count = self.entries.len();
        CacheStats {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            entry_count,
            backing_store_available: self.mirror.is_some()
                && self.mirror_healthy.load(Ordering::Relaxed),
        }
    }

    /// Load live entries from the mirror into memory. Keys already present in
    /// memory are left untouched. Returns the number of entries loaded.
    pub async fn hydrate(&self) -> usize {
        let Some(mirror) = &self.mirror else {
            return 0;
        };
        let now = self.clock.now();
        match mirror.load_live(now).await {
            Ok(rows) => {
                let mut loaded = 0;
                for (key, entry) in rows {
                    if entry.is_expired(now) {
                        continue;
                    }
                    if let Entry::Vacant(vacant) = self.entries.entry(key) {
                        vacant.insert(entry);
                        loaded += 1;
                    }
                }
                tracing::info!(loaded, "cache hydrated from durable mirror");
                loaded
            }
            Err(e) => {
                self.mirror_healthy.store(false, Ordering::Relaxed);
                tracing::warn!(error = %e, "cache hydration failed; continuing with a cold cache");
                0
            }
        }
    }

    /// Drop expired in-memory entries and ask the mirror to do the same.
    /// Returns the number of in-memory entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());

        if let Some(mirror) = &self.mirror {
            match mirror.purge(now).await {
                Ok(rows) => tracing::debug!(rows, "purged expired mirror rows"),
                Err(e) => {
                    self.mirror_healthy.store(false, Ordering::Relaxed);
                    tracing::warn!(error = %e, "failed to purge expired mirror rows");
                }
            }
        }

        removed
    }

    fn spawn_mirror_write(&self, mirror: PgMirror, key: String, entry: CacheEntry) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(key = %key, "no async runtime; skipping mirror write");
            return;
        };
        let healthy = Arc::clone(&self.mirror_healthy);
        handle.spawn(async move {
            match mirror.store(&key, &entry).await {
                Ok(()) => healthy.store(true, Ordering::Relaxed),
                Err(e) => {
                    healthy.store(false, Ordering::Relaxed);
                    tracing::warn!(key = %key, error = %e, "cache mirror write failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock() -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = CacheStore::new(TtlPolicy::default()).with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (store, _) = store_with_clock();
        store.put("trend:abc", json!({"mean": 42.5}), TtlClass::Volatile);
        assert_eq!(store.get("trend:abc"), Some(json!({"mean": 42.5})));
        let stats = store.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 0);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn missing_key_counts_a_miss() {
        let (store, _) = store_with_clock();
        assert_eq!(store.get("nope"), None);
        assert_eq!(store.stats().miss_count, 1);
    }

    #[test]
    fn entry_is_served_until_exactly_its_expiry() {
        let (store, clock) = store_with_clock();
        store.put("k", json!(1), TtlClass::Volatile);
        clock.advance(TimeDelta::minutes(30));
        assert_eq!(store.get("k"), Some(json!(1)));
    }

    #[test]
    fn expired_entry_is_a_miss_and_is_evicted() {
        let (store, clock) = store_with_clock();
        store.put("k", json!(1), TtlClass::Volatile);
        clock.advance(TimeDelta::minutes(31));
        assert_eq!(store.get("k"), None);
        let stats = store.stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[test]
    fn concurrent_readers_and_writers_share_one_store() {
        let (store, clock) = store_with_clock();
        store.put("shared", json!(0), TtlClass::Volatile);
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..50 {
                        store.put(&format!("k{worker}:{i}"), json!(i), TtlClass::Stable);
                        assert!(store.get("shared").is_some());
                    }
                });
            }
        });
        let stats = store.stats();
        assert_eq!(stats.entry_count, 401);
        assert_eq!(stats.hit_count, 400);

        clock.advance(TimeDelta::minutes(31));
        assert!(store.get("shared").is_none());
        assert_eq!(store.stats().entry_count, 400);
    }

    #[test]
    fn ttl_classes_expire_independently() {
        let (store, clock) = store_with_clock();
        store.put("volatile", json!("v"), TtlClass::Volatile);
        store.put("stable", json!("s"), TtlClass::Stable);
        store.put("seasonal", json!("z"), TtlClass::Seasonal);

        clock.advance(TimeDelta::hours(2));
        assert!(store.get("volatile").is_none());
        assert!(store.get("stable").is_some());

        clock.advance(TimeDelta::days(2));
        assert!(store.get("stable").is_none());
        assert!(store.get("seasonal").is_some());

        clock.advance(TimeDelta::days(6));
        assert!(store.get("seasonal").is_none());
    }

    #[test]
    fn put_overwrites_and_resets_expiry() {
        let (store, clock) = store_with_clock();
        store.put("k", json!("old"), TtlClass::Volatile);
        clock.advance(TimeDelta::minutes(20));
        store.put("k", json!("new"), TtlClass::Volatile);
        clock.advance(TimeDelta::minutes(20));
        assert_eq!(store.get("k"), Some(json!("new")));
    }

    #[test]
    fn typed_helpers_round_trip() {
        let (store, _) = store_with_clock();
        store.put_json("suggest:x", &vec!["a".to_string(), "b".to_string()], TtlClass::Volatile);
        let got: Option<Vec<String>> = store.get_json("suggest:x");
        assert_eq!(got, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn typed_get_with_wrong_shape_is_none() {
        let (store, _) = store_with_clock();
        store.put("k", json!({"not": "a number"}), TtlClass::Stable);
        let got: Option<f64> = store.get_json("k");
        assert!(got.is_none());
    }

    #[test]
    fn backing_store_unavailable_without_mirror() {
        let (store, _) = store_with_clock();
        assert!(!store.stats().backing_store_available);
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let (store, clock) = store_with_clock();
        store.put("short", json!(1), TtlClass::Volatile);
        store.put("long", json!(2), TtlClass::Seasonal);
        clock.advance(TimeDelta::hours(1));
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.stats().entry_count, 1);
        assert!(store.get("long").is_some());
    }

    #[tokio::test]
    async fn hydrate_without_mirror_loads_nothing() {
        let (store, _) = store_with_clock();
        assert_eq!(store.hydrate().await, 0);
    }
}
