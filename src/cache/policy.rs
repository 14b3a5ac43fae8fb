//! Eviction Policy Module
//!
//! Per-shard eviction metadata for the LRU, LFU and TTL policies, held in a
//! single tagged enum and dispatched by `match`.
//!
//! Recency is recorded as a logical tick handed out by the owning shard, one
//! per operation, so two keys never share a last-access time.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::CacheError;

// == Eviction Policy ==
/// Eviction policy of a shard, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionPolicy {
    /// Least recently used
    Lru,
    /// Least frequently used
    Lfu,
    /// Expiry based
    Ttl,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionPolicy::Lru => "LRU",
            EvictionPolicy::Lfu => "LFU",
            EvictionPolicy::Ttl => "TTL",
        };
        f.write_str(name)
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            "ttl" => Ok(EvictionPolicy::Ttl),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}

// == TTL Fallback ==
/// What a TTL shard evicts when it is full and no entry has expired yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TtlFallback {
    /// Evict nothing; the shard may grow past its capacity
    #[default]
    None,
    /// Evict the entry that expires soonest, or the least recently used
    /// entry when no entry carries an expiry
    EarliestExpiry,
    /// Evict the least recently used entry
    Lru,
}

impl fmt::Display for TtlFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TtlFallback::None => "none",
            TtlFallback::EarliestExpiry => "earliest-expiry",
            TtlFallback::Lru => "lru",
        };
        f.write_str(name)
    }
}

impl FromStr for TtlFallback {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(TtlFallback::None),
            "earliest-expiry" | "earliest_expiry" => Ok(TtlFallback::EarliestExpiry),
            "lru" => Ok(TtlFallback::Lru),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown ttl fallback '{}'",
                other
            ))),
        }
    }
}

// == Frequency ==
/// LFU counter plus the tick at which it was last reset, used to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Frequency {
    count: u64,
    since: u64,
}

// == Eviction State ==
/// Policy metadata for the keys of one shard.
///
/// Every key tracked here is also present in the shard's entry map.
#[derive(Debug)]
pub(crate) enum EvictionState {
    Lru {
        last_access: HashMap<String, u64>,
    },
    Lfu {
        counts: HashMap<String, Frequency>,
    },
    Ttl {
        /// Only keys set with a TTL appear here
        expires_at: HashMap<String, Instant>,
        /// Recency of every key, consulted by the fallback strategies
        last_access: HashMap<String, u64>,
        fallback: TtlFallback,
    },
}

impl EvictionState {
    // == Constructor ==
    /// Creates empty metadata for the given policy.
    ///
    /// `fallback` only matters for [`EvictionPolicy::Ttl`].
    pub fn new(policy: EvictionPolicy, fallback: TtlFallback) -> Self {
        match policy {
            EvictionPolicy::Lru => EvictionState::Lru {
                last_access: HashMap::new(),
            },
            EvictionPolicy::Lfu => EvictionState::Lfu {
                counts: HashMap::new(),
            },
            EvictionPolicy::Ttl => EvictionState::Ttl {
                expires_at: HashMap::new(),
                last_access: HashMap::new(),
                fallback,
            },
        }
    }

    /// Returns the policy this state implements.
    pub fn policy(&self) -> EvictionPolicy {
        match self {
            EvictionState::Lru { .. } => EvictionPolicy::Lru,
            EvictionState::Lfu { .. } => EvictionPolicy::Lfu,
            EvictionState::Ttl { .. } => EvictionPolicy::Ttl,
        }
    }

    /// Returns false only for a TTL state without a fallback, which may let
    /// its shard grow past capacity.
    pub fn is_bounded(&self) -> bool {
        !matches!(
            self,
            EvictionState::Ttl {
                fallback: TtlFallback::None,
                ..
            }
        )
    }

    // == Record Insert ==
    /// (Re)initializes metadata for a key that was just stored.
    ///
    /// An absent `expires_at` clears any expiry the key carried before.
    pub fn record_insert(&mut self, key: &str, tick: u64, expires_at: Option<Instant>) {
        match self {
            EvictionState::Lru { last_access } => {
                last_access.insert(key.to_string(), tick);
            }
            EvictionState::Lfu { counts } => {
                counts.insert(key.to_string(), Frequency { count: 1, since: tick });
            }
            EvictionState::Ttl {
                expires_at: expiries,
                last_access,
                ..
            } => {
                last_access.insert(key.to_string(), tick);
                match expires_at {
                    Some(at) => {
                        expiries.insert(key.to_string(), at);
                    }
                    None => {
                        expiries.remove(key);
                    }
                }
            }
        }
    }

    // == Record Access ==
    /// Updates metadata after a successful read. Reads never extend a TTL.
    pub fn record_access(&mut self, key: &str, tick: u64) {
        match self {
            EvictionState::Lru { last_access } | EvictionState::Ttl { last_access, .. } => {
                if let Some(last) = last_access.get_mut(key) {
                    *last = tick;
                }
            }
            EvictionState::Lfu { counts } => {
                if let Some(freq) = counts.get_mut(key) {
                    freq.count = freq.count.saturating_add(1);
                }
            }
        }
    }

    // == Forget ==
    /// Drops all metadata for a key.
    pub fn forget(&mut self, key: &str) {
        match self {
            EvictionState::Lru { last_access } => {
                last_access.remove(key);
            }
            EvictionState::Lfu { counts } => {
                counts.remove(key);
            }
            EvictionState::Ttl {
                expires_at,
                last_access,
                ..
            } => {
                expires_at.remove(key);
                last_access.remove(key);
            }
        }
    }

    // == Is Expired ==
    /// Returns true if the key carries an expiry at or before `now`.
    ///
    /// Always false outside the TTL policy.
    pub fn is_expired(&self, key: &str, now: Instant) -> bool {
        match self {
            EvictionState::Ttl { expires_at, .. } => {
                expires_at.get(key).is_some_and(|at| now >= *at)
            }
            _ => false,
        }
    }

    // == Expired Keys ==
    /// Returns every key whose expiry is at or before `now`.
    pub fn expired_keys(&self, now: Instant) -> Vec<String> {
        match self {
            EvictionState::Ttl { expires_at, .. } => expires_at
                .iter()
                .filter(|(_, at)| now >= **at)
                .map(|(key, _)| key.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    // == Select Victims ==
    /// Chooses the keys a full shard should drop to make room.
    ///
    /// LRU and LFU always name exactly one key when anything is tracked. TTL
    /// names every expired key, and otherwise defers to its fallback, which
    /// may name nothing.
    pub fn select_victims(&self, now: Instant) -> Vec<String> {
        match self {
            EvictionState::Lru { last_access } => least_recent(last_access).into_iter().collect(),
            EvictionState::Lfu { counts } => counts
                .iter()
                .min_by_key(|(_, freq)| **freq)
                .map(|(key, _)| key.clone())
                .into_iter()
                .collect(),
            EvictionState::Ttl {
                expires_at,
                last_access,
                fallback,
            } => {
                let expired = self.expired_keys(now);
                if !expired.is_empty() {
                    return expired;
                }
                let victim = match fallback {
                    TtlFallback::None => None,
                    TtlFallback::Lru => least_recent(last_access),
                    TtlFallback::EarliestExpiry => expires_at
                        .iter()
                        .min_by_key(|(key, at)| (**at, last_access.get(*key).copied()))
                        .map(|(key, _)| key.clone())
                        .or_else(|| least_recent(last_access)),
                };
                victim.into_iter().collect()
            }
        }
    }

    // == Tracked Keys ==
    /// Returns every key that has metadata, for invariant checks.
    pub fn tracked_keys(&self) -> Vec<&str> {
        match self {
            EvictionState::Lru { last_access } => last_access.keys().map(String::as_str).collect(),
            EvictionState::Lfu { counts } => counts.keys().map(String::as_str).collect(),
            EvictionState::Ttl {
                expires_at,
                last_access,
                ..
            } => last_access
                .keys()
                .chain(expires_at.keys())
                .map(String::as_str)
                .collect(),
        }
    }

    /// Returns the LFU access count of a key, if tracked.
    #[cfg(test)]
    pub fn access_count(&self, key: &str) -> Option<u64> {
        match self {
            EvictionState::Lfu { counts } => counts.get(key).map(|freq| freq.count),
            _ => None,
        }
    }
}

/// Key with the smallest tick.
fn least_recent(last_access: &HashMap<String, u64>) -> Option<String> {
    last_access
        .iter()
        .min_by_key(|(_, tick)| **tick)
        .map(|(key, _)| key.clone())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("lru".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert_eq!(" LFU ".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lfu);
        assert_eq!("Ttl".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Ttl);
        assert!("mru".parse::<EvictionPolicy>().is_err());
        assert_eq!(EvictionPolicy::Ttl.to_string(), "TTL");
    }

    #[test]
    fn test_fallback_parse_and_display() {
        assert_eq!("none".parse::<TtlFallback>().unwrap(), TtlFallback::None);
        assert_eq!(
            "earliest-expiry".parse::<TtlFallback>().unwrap(),
            TtlFallback::EarliestExpiry
        );
        assert_eq!("LRU".parse::<TtlFallback>().unwrap(), TtlFallback::Lru);
        assert!("random".parse::<TtlFallback>().is_err());
        assert_eq!(TtlFallback::EarliestExpiry.to_string(), "earliest-expiry");
        assert_eq!(TtlFallback::default(), TtlFallback::None);
    }

    #[test]
    fn test_lru_victim_is_least_recent() {
        let mut state = EvictionState::new(EvictionPolicy::Lru, TtlFallback::None);
        state.record_insert("a", 1, None);
        state.record_insert("b", 2, None);
        state.record_access("a", 3);

        assert_eq!(state.select_victims(Instant::now()), vec!["b".to_string()]);
    }

    #[test]
    fn test_lfu_victim_is_least_frequent() {
        let mut state = EvictionState::new(EvictionPolicy::Lfu, TtlFallback::None);
        state.record_insert("a", 1, None);
        state.record_insert("b", 2, None);
        state.record_access("a", 3);
        state.record_access("a", 4);

        assert_eq!(state.access_count("a"), Some(3));
        assert_eq!(state.select_victims(Instant::now()), vec!["b".to_string()]);
    }

    #[test]
    fn test_lfu_ties_break_by_oldest_reset() {
        let mut state = EvictionState::new(EvictionPolicy::Lfu, TtlFallback::None);
        state.record_insert("x", 5, None);
        state.record_insert("y", 6, None);

        assert_eq!(state.select_victims(Instant::now()), vec!["x".to_string()]);

        // Overwrite resets the counter and its tie-break position
        state.record_insert("x", 7, None);
        assert_eq!(state.access_count("x"), Some(1));
        assert_eq!(state.select_victims(Instant::now()), vec!["y".to_string()]);
    }

    #[test]
    fn test_ttl_expired_keys() {
        let now = Instant::now();
        let mut state = EvictionState::new(EvictionPolicy::Ttl, TtlFallback::None);
        state.record_insert("gone", 1, Some(now));
        state.record_insert("later", 2, Some(now + Duration::from_secs(60)));
        state.record_insert("forever", 3, None);

        assert!(state.is_expired("gone", now));
        assert!(!state.is_expired("later", now));
        assert!(!state.is_expired("forever", now));
        assert_eq!(state.expired_keys(now), vec!["gone".to_string()]);
        assert_eq!(state.select_victims(now), vec!["gone".to_string()]);
    }

    #[test]
    fn test_ttl_fallbacks_when_nothing_expired() {
        let now = Instant::now();
        let populate = |fallback| {
            let mut state = EvictionState::new(EvictionPolicy::Ttl, fallback);
            state.record_insert("old", 1, Some(now + Duration::from_secs(120)));
            state.record_insert("soon", 2, Some(now + Duration::from_secs(10)));
            state.record_insert("plain", 3, None);
            state
        };

        assert!(populate(TtlFallback::None).select_victims(now).is_empty());
        assert_eq!(
            populate(TtlFallback::EarliestExpiry).select_victims(now),
            vec!["soon".to_string()]
        );
        assert_eq!(
            populate(TtlFallback::Lru).select_victims(now),
            vec!["old".to_string()]
        );
    }

    #[test]
    fn test_only_ttl_without_fallback_is_unbounded() {
        assert!(EvictionState::new(EvictionPolicy::Lru, TtlFallback::None).is_bounded());
        assert!(EvictionState::new(EvictionPolicy::Lfu, TtlFallback::None).is_bounded());
        assert!(EvictionState::new(EvictionPolicy::Ttl, TtlFallback::Lru).is_bounded());
        assert!(EvictionState::new(EvictionPolicy::Ttl, TtlFallback::EarliestExpiry).is_bounded());
        assert!(!EvictionState::new(EvictionPolicy::Ttl, TtlFallback::None).is_bounded());
    }

    #[test]
    fn test_earliest_expiry_without_expiries_uses_recency() {
        let mut state = EvictionState::new(EvictionPolicy::Ttl, TtlFallback::EarliestExpiry);
        state.record_insert("first", 1, None);
        state.record_insert("second", 2, None);

        assert_eq!(state.select_victims(Instant::now()), vec!["first".to_string()]);
    }

    #[test]
    fn test_ttl_reads_do_not_extend_expiry() {
        let now = Instant::now();
        let mut state = EvictionState::new(EvictionPolicy::Ttl, TtlFallback::None);
        state.record_insert("k", 1, Some(now));
        state.record_access("k", 2);

        assert!(state.is_expired("k", now));
    }

    #[test]
    fn test_overwrite_without_ttl_clears_expiry() {
        let now = Instant::now();
        let mut state = EvictionState::new(EvictionPolicy::Ttl, TtlFallback::None);
        state.record_insert("k", 1, Some(now));
        state.record_insert("k", 2, None);

        assert!(!state.is_expired("k", now));
    }

    #[test]
    fn test_forget_drops_all_metadata() {
        let mut state = EvictionState::new(EvictionPolicy::Ttl, TtlFallback::Lru);
        state.record_insert("k", 1, Some(Instant::now()));
        state.forget("k");

        assert!(state.tracked_keys().is_empty());
        assert!(state.select_victims(Instant::now()).is_empty());
    }
}
