//! Cache Module
//!
//! Provides the bounded cache shard and its LRU, LFU and TTL eviction policies.

mod policy;
mod shard;
mod stats;


// Re-export public types
pub use policy::{EvictionPolicy, TtlFallback};
pub(crate) use policy::EvictionState;
pub use shard::CacheShard;
pub use stats::CacheStats;
