//! Expiry Sweeper Task
//!
//! Background task that periodically purges expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::distributed::DistributedCache;

/// Spawns a background task that purges expired entries from every shard.
///
/// The task sleeps for `interval_secs` between sweeps and runs until its
/// handle is aborted. Each sweep takes the shard locks one at a time, so
/// readers of other shards are never blocked.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(DistributedCache::from_config(&Config::default())?);
/// let sweeper = spawn_expiry_sweeper(cache.clone(), 1);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_expiry_sweeper(cache: Arc<DistributedCache>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweeper with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired();
            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
