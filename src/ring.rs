//! Hash Ring Module
//!
//! Consistent-hashing placement of string keys onto a fixed set of shards.
//!
//! Each shard contributes `virtual_nodes` points to the ring, at the digest of
//! `"{shard_id}_{i}"`. A key belongs to the shard owning the first point at or
//! after the key's own digest, wrapping to the lowest point past the end.
//!
//! Digests are compared as fixed-width big-endian byte strings, which orders
//! them exactly like the unsigned integers they encode.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha512};

use crate::error::{CacheError, Result};

// == Hash Function ==
/// Cryptographic digest used to place shards and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashFunction {
    #[default]
    Sha256,
    Sha512,
}

impl HashFunction {
    /// Hashes `input` into a big-endian unsigned integer.
    pub fn digest(&self, input: &[u8]) -> Vec<u8> {
        match self {
            HashFunction::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(input);
                hasher.finalize().to_vec()
            }
            HashFunction::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(input);
                hasher.finalize().to_vec()
            }
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashFunction::Sha256 => f.write_str("sha256"),
            HashFunction::Sha512 => f.write_str("sha512"),
        }
    }
}

impl FromStr for HashFunction {
    type Err = CacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashFunction::Sha256),
            "sha512" => Ok(HashFunction::Sha512),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown hash function '{}'",
                other
            ))),
        }
    }
}

// == Ring Point ==
#[derive(Debug, Clone, PartialEq, Eq)]
struct RingPoint {
    hash: Vec<u8>,
    shard: usize,
}

// == Hash Ring ==
/// Immutable consistent-hashing ring over shard indices.
///
/// Lookups are pure reads; the ring can be shared between threads freely.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Sorted ascending by hash; equal hashes keep insertion order
    points: Vec<RingPoint>,
    hash_function: HashFunction,
    virtual_nodes: usize,
    shard_count: usize,
}

impl HashRing {
    // == Build ==
    /// Builds a ring for `shard_ids`, where shard `i` of the slice is reported
    /// by [`locate`](Self::locate) as index `i`.
    ///
    /// # Errors
    /// - [`CacheError::EmptyRing`] if `shard_ids` is empty
    /// - [`CacheError::InvalidVirtualNodes`] if `virtual_nodes` is zero
    pub fn build<S: AsRef<str>>(
        shard_ids: &[S],
        virtual_nodes: usize,
        hash_function: HashFunction,
    ) -> Result<Self> {
        if shard_ids.is_empty() {
            return Err(CacheError::EmptyRing);
        }
        if virtual_nodes == 0 {
            return Err(CacheError::InvalidVirtualNodes);
        }

        let mut points = Vec::with_capacity(shard_ids.len() * virtual_nodes);
        for (shard, id) in shard_ids.iter().enumerate() {
            for i in 0..virtual_nodes {
                let label = format!("{}_{}", id.as_ref(), i);
                points.push(RingPoint {
                    hash: hash_function.digest(label.as_bytes()),
                    shard,
                });
            }
        }
        // Stable sort: colliding points stay in build order
        points.sort_by(|a, b| a.hash.cmp(&b.hash));

        Ok(Self {
            points,
            hash_function,
            virtual_nodes,
            shard_count: shard_ids.len(),
        })
    }

    // == Locate ==
    /// Returns the index of the shard that owns `key`.
    pub fn locate(&self, key: &str) -> usize {
        let hash = self.hash_function.digest(key.as_bytes());
        self.successor(&hash)
    }

    /// Shard of the first point with hash >= `hash`, wrapping to the first point.
    fn successor(&self, hash: &[u8]) -> usize {
        let idx = self.points.partition_point(|point| point.hash.as_slice() < hash);
        let point = self.points.get(idx).unwrap_or(&self.points[0]);
        point.shard
    }

    /// Returns the number of points on the ring.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }
}
