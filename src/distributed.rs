//! Distributed Cache Module
//!
//! Routes every key through the hash ring to the one shard that owns it.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheShard, CacheStats};
use crate::config::Config;
use crate::error::Result;
use crate::ring::{HashFunction, HashRing};

// == Distributed Cache ==
/// Façade over a fixed set of shards and the ring that places keys on them.
///
/// Holds no mutable state of its own; each shard does its own locking.
#[derive(Debug)]
pub struct DistributedCache {
    ring: HashRing,
    shards: Vec<Arc<CacheShard>>,
}

impl DistributedCache {
    // == Constructor ==
    /// Builds the ring over `shards`, in the given order.
    ///
    /// # Errors
    /// Fails if `shards` is empty or `virtual_nodes` is zero.
    pub fn new(
        shards: Vec<Arc<CacheShard>>,
        virtual_nodes: usize,
        hash_function: HashFunction,
    ) -> Result<Self> {
        let ids: Vec<&str> = shards.iter().map(|shard| shard.id()).collect();
        let ring = HashRing::build(ids.as_slice(), virtual_nodes, hash_function)?;
        debug!(
            "Hash ring built: {} shards, {} points",
            ring.shard_count(),
            ring.len()
        );

        Ok(Self { ring, shards })
    }

    /// Creates the shards described by `config` and the ring over them.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let shards = config
            .shard_configs()
            .into_iter()
            .map(|(id, shard_config)| CacheShard::new(id, shard_config).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Self::new(shards, config.virtual_nodes, config.hash_function)
    }

    // == Locate ==
    /// Returns the shard that owns `key`.
    pub fn locate(&self, key: &str) -> &Arc<CacheShard> {
        &self.shards[self.ring.locate(key)]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.locate(key).get(key)
    }

    pub fn set(&self, key: &str, value: impl Into<String>, ttl: Option<Duration>) {
        self.locate(key).set(key, value, ttl);
    }

    /// Removes `key` from its owning shard. Returns whether anything was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.locate(key).invalidate(key)
    }

    pub fn shards(&self) -> &[Arc<CacheShard>] {
        &self.shards
    }

    /// Looks up a shard by id.
    pub fn shard(&self, id: &str) -> Option<&Arc<CacheShard>> {
        self.shards.iter().find(|shard| shard.id() == id)
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    // == Purge Expired ==
    /// Sweeps expired entries from every shard. Returns the total removed.
    pub fn purge_expired(&self) -> usize {
        self.shards.iter().map(|shard| shard.purge_expired()).sum()
    }

    /// Total number of entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }

    // == Stats ==
    /// Returns statistics summed over all shards.
    pub fn stats(&self) -> CacheStats {
        let mut total = CacheStats::new();
        for shard in &self.shards {
            total += &shard.stats();
        }
        total
    }
}
