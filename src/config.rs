//! Configuration Module
//!
//! Handles loading and validating cache topology from environment variables.

use std::env;

use crate::cache::{EvictionPolicy, TtlFallback};
use crate::error::{CacheError, Result};
use crate::ring::HashFunction;

/// Default number of virtual ring points per physical shard.
pub const DEFAULT_VIRTUAL_NODES: usize = 3;

/// Default per-shard entry capacity.
pub const DEFAULT_SHARD_CAPACITY: usize = 10;

// == Shard Config ==
/// Construction parameters for a single cache shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardConfig {
    /// Maximum number of live entries
    pub capacity: usize,
    /// Eviction policy, fixed for the shard's lifetime
    pub policy: EvictionPolicy,
    /// What a TTL shard evicts when nothing has expired yet
    pub ttl_fallback: TtlFallback,
}

impl ShardConfig {
    /// Creates a shard config with no TTL fallback.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            capacity,
            policy,
            ttl_fallback: TtlFallback::None,
        }
    }

    /// Sets the TTL fallback strategy.
    pub fn with_ttl_fallback(mut self, ttl_fallback: TtlFallback) -> Self {
        self.ttl_fallback = ttl_fallback;
        self
    }
}

// == Cache Config ==
/// Cluster configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Eviction policy of each shard; the list length is the shard count
    pub shard_policies: Vec<EvictionPolicy>,
    /// Maximum number of entries per shard
    pub shard_capacity: usize,
    /// Virtual ring points per shard
    pub virtual_nodes: usize,
    /// Fallback used by TTL shards when nothing has expired
    pub ttl_fallback: TtlFallback,
    /// Digest used for ring placement
    pub hash_function: HashFunction,
    /// Background expiry sweep interval in seconds, 0 disables the sweeper
    pub sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SHARD_POLICIES` - Comma separated policies, one per shard (default: TTL,LRU,LFU)
    /// - `SHARD_CAPACITY` - Maximum entries per shard (default: 10)
    /// - `VIRTUAL_NODES` - Ring points per shard (default: 3)
    /// - `TTL_FALLBACK` - none, earliest-expiry or lru (default: none)
    /// - `HASH_FUNCTION` - sha256 or sha512 (default: sha256)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 0, disabled)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shard_policies: env::var("SHARD_POLICIES")
                .ok()
                .and_then(|v| parse_policy_list(&v))
                .unwrap_or(defaults.shard_policies),
            shard_capacity: env::var("SHARD_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.shard_capacity),
            virtual_nodes: env::var("VIRTUAL_NODES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.virtual_nodes),
            ttl_fallback: env::var("TTL_FALLBACK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl_fallback),
            hash_function: env::var("HASH_FUNCTION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.hash_function),
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
        }
    }

    // == Validate ==
    /// Rejects topologies that cannot be built.
    pub fn validate(&self) -> Result<()> {
        if self.shard_policies.is_empty() {
            return Err(CacheError::EmptyRing);
        }
        if self.shard_capacity == 0 {
            let first = self
                .shard_configs()
                .into_iter()
                .next()
                .map(|(id, _)| id)
                .unwrap_or_default();
            return Err(CacheError::InvalidCapacity(first));
        }
        if self.virtual_nodes == 0 {
            return Err(CacheError::InvalidVirtualNodes);
        }
        Ok(())
    }

    /// Returns `(shard_id, shard_config)` pairs in shard order.
    ///
    /// Shards are named `node1`, `node2`, ...
    pub fn shard_configs(&self) -> Vec<(String, ShardConfig)> {
        self.shard_policies
            .iter()
            .enumerate()
            .map(|(i, policy)| {
                (
                    format!("node{}", i + 1),
                    ShardConfig::new(self.shard_capacity, *policy)
                        .with_ttl_fallback(self.ttl_fallback),
                )
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_policies: vec![EvictionPolicy::Ttl, EvictionPolicy::Lru, EvictionPolicy::Lfu],
            shard_capacity: DEFAULT_SHARD_CAPACITY,
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            ttl_fallback: TtlFallback::None,
            hash_function: HashFunction::Sha256,
            sweep_interval: 0,
        }
    }
}

/// Parses `"TTL, lru,LFU"`; any unknown entry rejects the whole list.
fn parse_policy_list(raw: &str) -> Option<Vec<EvictionPolicy>> {
    let policies = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect::<Option<Vec<EvictionPolicy>>>()?;
    if policies.is_empty() {
        None
    } else {
        Some(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(
            config.shard_policies,
            vec![EvictionPolicy::Ttl, EvictionPolicy::Lru, EvictionPolicy::Lfu]
        );
        assert_eq!(config.shard_capacity, 10);
        assert_eq!(config.virtual_nodes, 3);
        assert_eq!(config.ttl_fallback, TtlFallback::None);
        assert_eq!(config.hash_function, HashFunction::Sha256);
        assert_eq!(config.sweep_interval, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SHARD_POLICIES");
        env::remove_var("SHARD_CAPACITY");
        env::remove_var("VIRTUAL_NODES");
        env::remove_var("TTL_FALLBACK");
        env::remove_var("HASH_FUNCTION");
        env::remove_var("SWEEP_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config.shard_policies.len(), 3);
        assert_eq!(config.shard_capacity, 10);
        assert_eq!(config.virtual_nodes, 3);
        assert_eq!(config.sweep_interval, 0);
    }

    #[test]
    fn test_parse_policy_list() {
        assert_eq!(
            parse_policy_list("lru, LFU ,ttl"),
            Some(vec![EvictionPolicy::Lru, EvictionPolicy::Lfu, EvictionPolicy::Ttl])
        );
        assert_eq!(parse_policy_list("lru,mru"), None);
        assert_eq!(parse_policy_list(" , "), None);
    }

    #[test]
    fn test_validate_rejects_bad_topology() {
        let config = Config {
            shard_capacity: 0,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(CacheError::InvalidCapacity("node1".to_string()))
        );
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Invalid capacity: shard 'node1' must hold at least one entry"
        );

        let config = Config {
            virtual_nodes: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(CacheError::InvalidVirtualNodes));

        let config = Config {
            shard_policies: Vec::new(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(CacheError::EmptyRing));
    }

    #[test]
    fn test_shard_configs_naming() {
        let config = Config {
            ttl_fallback: TtlFallback::Lru,
            ..Config::default()
        };
        let shards = config.shard_configs();
        assert_eq!(shards.len(), 3);
        assert_eq!(shards[0].0, "node1");
        assert_eq!(shards[0].1.policy, EvictionPolicy::Ttl);
        assert_eq!(shards[0].1.ttl_fallback, TtlFallback::Lru);
        assert_eq!(shards[2].0, "node3");
        assert_eq!(shards[2].1.capacity, 10);
    }
}
