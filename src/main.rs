//! Shard Cache demo
//!
//! Builds the configured cluster, subscribes every shard to the
//! invalidation channel and walks through set, get, invalidate and expiry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shard_cache::{spawn_expiry_sweeper, Config, DistributedCache, InvalidationBus};

/// Channel every shard listens on for invalidations.
const INVALIDATION_CHANNEL: &str = "cache_invalidation";

/// Main entry point for the Shard Cache demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build shards and the hash ring
/// 4. Subscribe every shard to the invalidation channel
/// 5. Start the expiry sweeper if `SWEEP_INTERVAL` is set
/// 6. Run the usage scenario, or stop early on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shard_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shard Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: shards={}, capacity={}, virtual_nodes={}, ttl_fallback={}, hash={}, sweep_interval={}s",
        config.shard_policies.len(),
        config.shard_capacity,
        config.virtual_nodes,
        config.ttl_fallback,
        config.hash_function,
        config.sweep_interval
    );

    let cache = Arc::new(
        DistributedCache::from_config(&config).context("failed to build cache cluster")?,
    );
    for shard in cache.shards() {
        info!(
            "Shard {} ready: policy={}, capacity={}",
            shard.id(),
            shard.policy(),
            shard.capacity()
        );
    }

    let bus = InvalidationBus::new();
    bus.subscribe_all(INVALIDATION_CHANNEL, cache.shards());

    let sweeper = (config.sweep_interval > 0)
        .then(|| spawn_expiry_sweeper(cache.clone(), config.sweep_interval));

    tokio::select! {
        _ = simulate_cache_usage(&cache, &bus) => {}
        _ = shutdown_signal() => {}
    }

    if let Some(handle) = sweeper {
        handle.abort();
        warn!("Expiry sweeper aborted");
    }

    let stats = serde_json::to_string(&cache.stats()).context("failed to encode stats")?;
    info!("Final stats: {}", stats);
    info!("Shutdown complete");
    Ok(())
}

/// Sets a few keys, reads them back, invalidates one over the bus and reads
/// it again once its TTL window has passed.
async fn simulate_cache_usage(cache: &DistributedCache, bus: &InvalidationBus) {
    cache.set("driver_1", "available", Some(Duration::from_secs(5)));
    cache.set("user_1", "profile_data", None);
    cache.set("route_1", "route_details", None);

    for key in ["driver_1", "user_1", "route_1"] {
        info!(
            "{} -> {:?} (shard {})",
            key,
            cache.get(key),
            cache.locate(key).id()
        );
    }

    let delivered = bus.publish(INVALIDATION_CHANNEL, "driver_1");
    info!(
        "driver_1 after invalidation ({} shards notified): {:?}",
        delivered,
        cache.get("driver_1")
    );

    tokio::time::sleep(Duration::from_secs(6)).await;
    info!("driver_1 after TTL window: {:?}", cache.get("driver_1"));
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
