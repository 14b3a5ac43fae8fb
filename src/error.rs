//! Error types for the sharded cache
//!
//! Provides unified error handling using thiserror. Cache misses and
//! invalidations of absent keys are not errors; only precondition failures
//! detected at construction time are reported here.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the sharded cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Shard built with a capacity of zero
    #[error("Invalid capacity: shard '{0}' must hold at least one entry")]
    InvalidCapacity(String),

    /// Ring built with zero virtual nodes per shard
    #[error("Invalid virtual node count: at least one virtual node per shard is required")]
    InvalidVirtualNodes,

    /// Ring built from an empty shard list
    #[error("Hash ring has no shards")]
    EmptyRing,

    /// Unrecognised configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal bookkeeping drifted out of sync
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

// == Result Type Alias ==
/// Convenience Result type for the sharded cache.
pub type Result<T> = std::result::Result<T, CacheError>;
