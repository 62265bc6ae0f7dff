//! In-memory cache backend with TTL expiry and optional LRU bound

use super::{Cache, expiry, stamp};
use crate::document::Document;
use crate::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

struct Entry {
    doc: Arc<Document>,
    expires_at: DateTime<Utc>,
    /// Logical clock value of the last access
    last_access: AtomicU64,
}

/// Process-local cache
///
/// Lookups share a read lock and record their access with an atomic, so
/// concurrent readers never serialize on each other.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    max_keys: usize,
    clock: AtomicU64,
}

impl MemoryCache {
    /// `max_keys` of 0 disables the LRU bound
    pub fn new(max_keys: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_keys,
            clock: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn get_at(&self, key: &str, now: DateTime<Utc>) -> Result<Arc<Document>, CacheError> {
        let entries = self.entries.read();
        let entry = entries.get(key).ok_or_else(|| CacheError::not_found(key))?;
        entry.last_access.store(self.tick(), Ordering::Relaxed);

        if now >= entry.expires_at {
            return Err(CacheError::expired(key));
        }
        Ok(Arc::clone(&entry.doc))
    }

    pub(crate) fn set_at(
        &self,
        key: &str,
        doc: &mut Arc<Document>,
        ttl_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let Some(expires_at) = expiry(key, now, ttl_minutes)? else {
            return Ok(());
        };
        stamp(doc, now, expires_at);

        let mut entries = self.entries.write();
        if self.max_keys > 0 && !entries.contains_key(key) && entries.len() >= self.max_keys {
            evict_least_recently_used(&mut entries);
        }
        entries.insert(
            key.to_string(),
            Entry {
                doc: Arc::clone(doc),
                expires_at,
                last_access: AtomicU64::new(self.tick()),
            },
        );
        Ok(())
    }

    pub(crate) fn expire_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }
}

fn evict_least_recently_used(entries: &mut HashMap<String, Entry>) {
    let victim = entries
        .iter()
        .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
        .map(|(key, _)| key.clone());
    if let Some(key) = victim {
        debug!(key = %key, "Evicting least recently used cache entry");
        entries.remove(&key);
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Arc<Document>, CacheError> {
        self.get_at(key, Utc::now())
    }

    async fn set(&self, key: &str, doc: &mut Arc<Document>, ttl_minutes: i64) -> Result<(), CacheError> {
        self.set_at(key, doc, ttl_minutes, Utc::now())
    }

    async fn expire(&self) -> usize {
        self.expire_at(Utc::now())
    }
}
