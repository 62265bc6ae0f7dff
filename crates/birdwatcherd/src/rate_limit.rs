//! Console command rate limiter
//!
//! A token bucket refilled to its maximum once per second by a background
//! task. Only commands that actually reach the daemon consume tokens; cache
//! hits are free.
//!
//! # NIST Controls
//! - SC-5: Denial of Service Protection - Bound load on the routing daemon

use crate::config::RateLimitConfig;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const REFILL_INTERVAL: Duration = Duration::from_secs(1);

/// Token bucket shared by all requests
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    max: i64,
    tokens: AtomicI64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            max: config.requests_per_window,
            tokens: AtomicI64::new(config.requests_per_window),
        }
    }

    /// Limiter that allows everything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max: 0,
            tokens: AtomicI64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Take one token; false when the window is exhausted
    pub fn try_acquire(&self) -> bool {
        if !self.enabled {
            return true;
        }
        self.tokens
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |tokens| {
                (tokens > 0).then(|| tokens - 1)
            })
            .is_ok()
    }

    /// Reset the bucket to its maximum
    pub fn refill(&self) {
        self.tokens.store(self.max, Ordering::Release);
    }

    /// Refill every second until the limiter is dropped
    pub fn spawn_refill(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REFILL_INTERVAL);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                match limiter.upgrade() {
                    Some(limiter) => limiter.refill(),
                    None => break,
                }
            }
            debug!("Rate limiter refill task stopped");
        })
    }
}
