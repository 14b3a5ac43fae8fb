//! Invalidation Bus Module
//!
//! Channel-keyed publish/subscribe registry that forwards invalidation events
//! to every shard subscribed to a channel.
//!
//! The bus references shards weakly and never keeps one alive. It is
//! independent of the hash ring: publishing invalidates the key on every
//! subscriber, whether or not the ring would route that key there.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::CacheShard;

// == Invalidation Bus ==
/// Publish/subscribe registry for out-of-band invalidations.
#[derive(Debug, Default)]
pub struct InvalidationBus {
    /// Subscribers per channel, in subscription order; duplicates allowed
    subscribers: RwLock<HashMap<String, Vec<Weak<CacheShard>>>>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    // == Subscribe ==
    /// Appends `shard` to the subscribers of `channel`.
    ///
    /// Subscribing the same shard twice makes it receive every event twice.
    /// Subscriptions of shards that have since been dropped are pruned here.
    pub fn subscribe(&self, channel: &str, shard: &Arc<CacheShard>) {
        let mut subscribers = self.subscribers.write();
        let channel_subscribers = subscribers.entry(channel.to_string()).or_default();
        channel_subscribers.retain(|subscriber| subscriber.strong_count() > 0);
        channel_subscribers.push(Arc::downgrade(shard));
        drop(subscribers);
        debug!("Shard {} subscribed to '{}'", shard.id(), channel);
    }

    /// Subscribes every shard in `shards` to `channel`, in order.
    pub fn subscribe_all(&self, channel: &str, shards: &[Arc<CacheShard>]) {
        for shard in shards {
            self.subscribe(channel, shard);
        }
    }

    // == Publish ==
    /// Invalidates `key` on every shard subscribed to `channel`, synchronously
    /// and in subscription order.
    ///
    /// Returns the number of deliveries made. Shards that have been dropped are
    /// skipped. A channel without subscribers is a no-op.
    pub fn publish(&self, channel: &str, key: &str) -> usize {
        // Snapshot so shard locks are never taken under the registry lock
        let targets: Vec<Weak<CacheShard>> = match self.subscribers.read().get(channel) {
            Some(subscribers) => subscribers.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for shard in targets.iter().filter_map(Weak::upgrade) {
            shard.invalidate(key);
            delivered += 1;
        }

        debug!(
            "Published invalidation of '{}' on '{}' to {} shards",
            key, channel, delivered
        );
        delivered
    }

    /// Returns the number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.subscribers.read().get(channel).map_or(0, |subscribers| {
            subscribers
                .iter()
                .filter(|subscriber| subscriber.strong_count() > 0)
                .count()
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EvictionPolicy;
    use crate::config::ShardConfig;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn shard(id: &str) -> Arc<CacheShard> {
        Arc::new(CacheShard::new(id, ShardConfig::new(10, EvictionPolicy::Lru)).unwrap())
    }

    #[test]
    fn test_publish_fans_out() {
        let bus = InvalidationBus::new();
        let s1 = shard("s1");
        let s2 = shard("s2");
        bus.subscribe("inv", &s1);
        bus.subscribe("inv", &s2);

        s1.set("K", "v1", None);
        s2.set("K", "v2", None);

        assert_eq!(bus.publish("inv", "K"), 2);
        assert_eq!(s1.get("K"), None);
        assert_eq!(s2.get("K"), None);
    }

    #[test]
    fn test_publish_unknown_channel_is_noop() {
        let bus = InvalidationBus::new();
        let s1 = shard("s1");
        bus.subscribe("inv", &s1);
        s1.set("K", "v", None);

        assert_eq!(bus.publish("other", "K"), 0);
        assert_eq!(s1.get("K").as_deref(), Some("v"));
    }

    #[test]
    fn test_publish_only_touches_named_key() {
        let bus = InvalidationBus::new();
        let s1 = shard("s1");
        bus.subscribe("inv", &s1);
        s1.set("K", "v", None);
        s1.set("J", "w", None);

        bus.publish("inv", "K");
        assert_eq!(s1.get("J").as_deref(), Some("w"));
    }

    #[test]
    fn test_duplicate_subscription_delivers_twice() {
        let bus = InvalidationBus::new();
        let s1 = shard("s1");
        bus.subscribe("inv", &s1);
        bus.subscribe("inv", &s1);

        assert_eq!(bus.subscriber_count("inv"), 2);
        assert_eq!(bus.publish("inv", "absent"), 2);
    }

    #[test]
    fn test_dropped_shard_is_skipped() {
        let bus = InvalidationBus::new();
        let kept = shard("kept");
        bus.subscribe("inv", &kept);
        {
            let temporary = shard("temporary");
            bus.subscribe("inv", &temporary);
        }

        assert_eq!(bus.subscriber_count("inv"), 1);
        assert_eq!(bus.publish("inv", "K"), 1);
    }

    #[test]
    fn test_subscribe_prunes_dropped_shards() {
        let bus = InvalidationBus::new();
        for i in 0..5 {
            let temporary = shard(&format!("temporary_{}", i));
            bus.subscribe("inv", &temporary);
        }
        let kept = shard("kept");
        bus.subscribe("inv", &kept);

        let stored = bus.subscribers.read().get("inv").map_or(0, Vec::len);
        assert_eq!(stored, 1);
        assert_eq!(bus.subscriber_count("inv"), 1);
    }

    #[test]
    fn test_subscribe_while_publishing() {
        let bus = Arc::new(InvalidationBus::new());
        let shards: Vec<_> = (0..4).map(|i| shard(&format!("s{}", i))).collect();
        let publishing = AtomicBool::new(true);

        std::thread::scope(|scope| {
            let publisher = scope.spawn(|| {
                let mut rounds = 0usize;
                while publishing.load(Ordering::Acquire) {
                    bus.publish("inv", "K");
                    rounds += 1;
                }
                rounds
            });

            let subscribers: Vec<_> = shards
                .iter()
                .map(|s| {
                    let bus = Arc::clone(&bus);
                    scope.spawn(move || {
                        for _ in 0..50 {
                            s.set("K", "v", None);
                            bus.subscribe("inv", s);
                        }
                    })
                })
                .collect();
            for handle in subscribers {
                handle.join().unwrap();
            }

            publishing.store(false, Ordering::Release);
            assert!(publisher.join().unwrap() > 0);
        });

        assert_eq!(bus.subscriber_count("inv"), 4 * 50);
        assert_eq!(bus.publish("inv", "K"), 4 * 50);
        assert!(shards.iter().all(|s| s.is_empty()));
    }

    #[test]
    fn test_subscribe_all() {
        let bus = InvalidationBus::new();
        let shards = vec![shard("a"), shard("b"), shard("c")];
        bus.subscribe_all("cache_invalidation", &shards);

        for shard in &shards {
            shard.set("driver_1", "available", None);
        }
        assert_eq!(bus.publish("cache_invalidation", "driver_1"), 3);
        assert!(shards.iter().all(|shard| shard.is_empty()));
    }
}
