//! hiscore: cache engine host
//!
//! Wires the services over the in-memory store, primes both caches for
//! every tracked user and then idles until interrupted.
//!
//! ## Configuration
//! - HISCORE_CONFIG: path to a YAML config file (optional)
//! - HISCORE__*: per-key overrides, e.g. `HISCORE__CACHE__REPRESENTATION=range`
//! - HISCORE_LOG: tracing filter (default: info)

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hiscore::cache::{build_snapshot_cache, DeltaCache};
use hiscore::config::Config;
use hiscore::services::{CachePrimer, DeltaService, SnapshotService};
use hiscore::storage::MemoryStore;
use hiscore::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    info!(
        representation = ?config.cache.representation,
        transactions = config.storage.transactions_enabled,
        "hiscore starting"
    );

    let store = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(SnapshotService::new(
        store.clone(),
        build_snapshot_cache(config.cache.representation),
        config.limits.clone(),
    ));
    let deltas = Arc::new(DeltaService::new(
        store.clone(),
        Arc::new(DeltaCache::new()),
        config.limits.clone(),
    ));

    let cancel = CancellationToken::new();
    let priming = if config.cache.prime_on_startup {
        let primer = CachePrimer::new(
            store.clone(),
            snapshots.clone(),
            deltas.clone(),
            config.cache.prime_batch_days,
        );
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = primer.prime_all(&cancel).await {
                warn!(error = %e, "Cache priming failed");
            }
        }))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel.cancel();
    if let Some(handle) = priming {
        handle.await?;
    }
    Ok(())
}
