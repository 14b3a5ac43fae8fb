//! Shard Cache - an in-process sharded key-value cache
//!
//! Keys are placed on a fixed set of shards by a consistent-hashing ring.
//! Each shard bounds its size with its own LRU, LFU or TTL eviction policy,
//! and an invalidation bus fans out-of-band invalidations to subscribed shards.

pub mod cache;
pub mod config;
pub mod distributed;
pub mod error;
pub mod pubsub;
pub mod ring;
pub mod tasks;

pub use cache::{CacheShard, CacheStats, EvictionPolicy, TtlFallback};
pub use config::{Config, ShardConfig};
pub use distributed::DistributedCache;
pub use error::{CacheError, Result};
pub use pubsub::InvalidationBus;
pub use ring::{HashFunction, HashRing};
pub use tasks::spawn_expiry_sweeper;
