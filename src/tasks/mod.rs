//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Expiry sweep: purges expired entries from every TTL shard at a fixed
//!   interval, on top of the lazy expiry done by reads

mod sweeper;

pub use sweeper::spawn_expiry_sweeper;
