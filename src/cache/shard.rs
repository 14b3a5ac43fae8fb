//! Cache Shard Module
//!
//! A bounded key-value store with a pluggable eviction policy. All state of a
//! shard sits behind one mutex, so every public operation (including the
//! eviction it may trigger) runs as a single atomic unit.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStats, EvictionPolicy, EvictionState};
use crate::config::ShardConfig;
use crate::error::{CacheError, Result};

// == Shard State ==
/// Everything guarded by the shard lock.
#[derive(Debug)]
struct ShardState {
    /// Key-value storage
    entries: HashMap<String, String>,
    /// Policy metadata, keyed by a subset of `entries`
    eviction: EvictionState,
    /// Performance statistics
    stats: CacheStats,
    /// Logical clock, advanced once per read or write
    clock: u64,
}

impl ShardState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.eviction.forget(key);
            true
        } else {
            false
        }
    }

    /// Drops whatever the policy nominates. May remove nothing on a TTL shard.
    fn evict_one(&mut self, now: Instant) -> usize {
        let victims = self.eviction.select_victims(now);
        for key in &victims {
            self.remove(key);
        }
        self.stats.record_evictions(victims.len());
        victims.len()
    }

    fn sync_len(&mut self) {
        let len = self.entries.len();
        self.stats.set_total_entries(len);
    }
}

// == Cache Shard ==
/// One bounded-capacity cache node.
#[derive(Debug)]
pub struct CacheShard {
    id: String,
    capacity: usize,
    state: Mutex<ShardState>,
}

impl CacheShard {
    // == Constructor ==
    /// Creates an empty shard.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidCapacity`] when `config.capacity` is zero.
    pub fn new(id: impl Into<String>, config: ShardConfig) -> Result<Self> {
        let id = id.into();
        if config.capacity == 0 {
            return Err(CacheError::InvalidCapacity(id));
        }

        Ok(Self {
            id,
            capacity: config.capacity,
            state: Mutex::new(ShardState {
                entries: HashMap::new(),
                eviction: EvictionState::new(config.policy, config.ttl_fallback),
                stats: CacheStats::new(),
                clock: 0,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.state.lock().eviction.policy()
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// On a TTL shard an expired entry is removed and reported as absent.
    /// A hit refreshes LRU recency or bumps the LFU counter; it never
    /// extends a TTL.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut state = self.state.lock();

        if !state.entries.contains_key(key) {
            state.stats.record_miss();
            return None;
        }

        if state.eviction.is_expired(key, now) {
            state.remove(key);
            state.stats.record_expirations(1);
            state.stats.record_miss();
            state.sync_len();
            debug!("Shard {}: key '{}' expired on read", self.id, key);
            return None;
        }

        let tick = state.tick();
        state.eviction.record_access(key, tick);
        state.stats.record_hit();
        state.entries.get(key).cloned()
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// Inserting a new key into a full shard first evicts according to the
    /// policy. Overwriting an existing key never evicts. `ttl` is honoured
    /// only by TTL shards; without one the entry never expires.
    ///
    /// A TTL shard whose fallback is [`TtlFallback::None`](crate::cache::TtlFallback::None)
    /// may exceed its capacity when nothing has expired yet. Each such insert
    /// is logged and counted in [`CacheStats::overflows`].
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let key = key.into();
        let value = value.into();
        let now = Instant::now();
        let mut state = self.state.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let evicted = state.evict_one(now);
            if evicted > 0 {
                debug!("Shard {}: evicted {} entries to admit '{}'", self.id, evicted, key);
            }
            if state.entries.len() >= self.capacity {
                state.stats.record_overflow();
                warn!(
                    "Shard {}: nothing evictable, growing to {} entries (capacity {})",
                    self.id,
                    state.entries.len() + 1,
                    self.capacity
                );
            }
        }

        let expires_at = match state.eviction.policy() {
            EvictionPolicy::Ttl => ttl.and_then(|ttl| now.checked_add(ttl)),
            EvictionPolicy::Lru | EvictionPolicy::Lfu => None,
        };

        let tick = state.tick();
        state.eviction.record_insert(&key, tick, expires_at);
        state.entries.insert(key, value);
        state.sync_len();
    }

    // == Invalidate ==
    /// Removes a key and its metadata.
    ///
    /// Returns whether an entry was removed; invalidating an absent key is a
    /// no-op.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.remove(key);
        if removed {
            state.sync_len();
            debug!("Shard {}: invalidated '{}'", self.id, key);
        }
        removed
    }

    // == Purge Expired ==
    /// Removes all expired entries from the shard.
    ///
    /// Returns the number of entries removed. Always 0 for LRU and LFU shards.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();

        let expired = state.eviction.expired_keys(now);
        for key in &expired {
            state.remove(key);
        }

        state.stats.record_expirations(expired.len());
        state.sync_len();
        expired.len()
    }

    /// Returns true if the key is present and not expired. Leaves policy
    /// metadata untouched.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        let state = self.state.lock();
        state.entries.contains_key(key) && !state.eviction.is_expired(key, now)
    }

    /// Returns the current number of entries, expired ones included until
    /// they are observed.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    // == Stats ==
    /// Returns current shard statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    // == Check Invariants ==
    /// Verifies that policy metadata only names stored keys and that every
    /// shard except a TTL shard without fallback stays within capacity.
    pub fn check_invariants(&self) -> Result<()> {
        let state = self.state.lock();

        if let Some(orphan) = state
            .eviction
            .tracked_keys()
            .into_iter()
            .find(|key| !state.entries.contains_key(*key))
        {
            return Err(CacheError::InvariantViolation(format!(
                "shard '{}' tracks metadata for missing key '{}'",
                self.id, orphan
            )));
        }

        if state.eviction.is_bounded() && state.entries.len() > self.capacity {
            return Err(CacheError::InvariantViolation(format!(
                "shard '{}' holds {} entries, capacity is {}",
                self.id,
                state.entries.len(),
                self.capacity
            )));
        }

        Ok(())
    }
}
