//! Bounded-TTL memoization shared by the engines.
//!
//! Each key owns a slot with its own lock. The first caller for a key holds
//! the slot lock while computing; concurrent callers for the same key block
//! on that lock and then read the stored value, so a key is never computed
//! twice at once. The map lock is only held long enough to find or create a
//! slot. A slot whose computation fails is removed again.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::CacheConfig;
use crate::AnalystResult;

/// Hash a serialisable input into a cache key. The namespace keeps equal
/// inputs to different operations apart.
pub fn cache_key<T: Serialize>(namespace: &str, input: &T) -> AnalystResult<u64> {
    let bytes = serde_json::to_vec(input)?;
    let mut hasher = DefaultHasher::new();
    namespace.hash(&mut hasher);
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Stored<V> {
    cached_at: Instant,
    value: Arc<V>,
}

struct Slot<V> {
    created_at: Instant,
    value: Mutex<Option<Stored<V>>>,
}

pub struct ComputationCache<V> {
    enabled: bool,
    ttl: Duration,
    max_entries: usize,
    slots: Mutex<HashMap<u64, Arc<Slot<V>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> ComputationCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the live value for `key`, or compute, store and return it.
    ///
    /// Errors from `compute` are propagated and nothing is stored.
    pub fn get_or_try_insert_with<F>(&self, key: u64, compute: F) -> AnalystResult<Arc<V>>
    where
        F: FnOnce() -> AnalystResult<V>,
    {
        if !self.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute().map(Arc::new);
        }

        let slot = {
            let mut slots = lock(&self.slots);
            if !slots.contains_key(&key) {
                self.evict(&mut slots);
            }
            Arc::clone(slots.entry(key).or_insert_with(|| {
                Arc::new(Slot {
                    created_at: Instant::now(),
                    value: Mutex::new(None),
                })
            }))
        };

        let mut stored = lock(&slot.value);
        if let Some(entry) = stored.as_ref() {
            if entry.cached_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key, "cache hit");
                return Ok(Arc::clone(&entry.value));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(key, "cache miss");
        let value = match compute() {
            Ok(value) => Arc::new(value),
            Err(e) => {
                drop(stored);
                self.discard_empty(key, &slot);
                return Err(e);
            }
        };
        *stored = Some(Stored {
            cached_at: Instant::now(),
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: lock(&self.slots).len(),
        }
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Remove `slot` from the map if it is still the entry for `key` and
    /// holds no value, so failed inputs do not accumulate.
    fn discard_empty(&self, key: u64, slot: &Arc<Slot<V>>) {
        let mut slots = lock(&self.slots);
        let abandoned = slots.get(&key).is_some_and(|current| {
            Arc::ptr_eq(current, slot)
                && current
                    .value
                    .try_lock()
                    .is_ok_and(|stored| stored.is_none())
        });
        if abandoned {
            slots.remove(&key);
        }
    }

    /// Drop expired and empty entries, then the oldest filled entries while at
    /// capacity. Slots whose lock is held are mid-computation and are
    /// never touched; the map may briefly exceed capacity because of them.
    fn evict(&self, slots: &mut HashMap<u64, Arc<Slot<V>>>) {
        let ttl = self.ttl;
        slots.retain(|_, slot| match slot.value.try_lock() {
            Ok(stored) => stored
                .as_ref()
                .is_some_and(|entry| entry.cached_at.elapsed() < ttl),
            Err(_) => true,
        });

        while slots.len() >= self.max_entries {
            let oldest = slots
                .iter()
                .filter(|(_, slot)| {
                    slot.value
                        .try_lock()
                        .map(|stored| stored.is_some())
                        .unwrap_or(false)
                })
                .min_by_key(|(_, slot)| slot.created_at)
                .map(|(key, _)| *key);
            match oldest {
                Some(key) => {
                    slots.remove(&key);
                }
                None => break,
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
