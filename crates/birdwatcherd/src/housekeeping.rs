//! Periodic cache maintenance
//!
//! Expired entries are invisible to readers but stay in memory until swept.

use crate::cache::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Sweep `cache` every `interval`
///
/// With `expire_caches` false (caching disabled) the task only logs.
pub fn spawn(cache: Arc<dyn Cache>, interval: Duration, expire_caches: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!("Housekeeping started");
            if expire_caches {
                let expired = cache.expire().await;
                info!(expired, "Expired cache entries");
            }
        }
    })
}
