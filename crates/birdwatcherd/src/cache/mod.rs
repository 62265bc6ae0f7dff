//! Result cache
//!
//! Parsed documents are cached under the exact console command that produced
//! them. Storing a document stamps it with `cached_at` and `ttl` (the expiry
//! instant), both RFC 3339 UTC strings, and the caller's copy sees the stamp.

mod memory;
mod redis_backend;

pub use self::memory::MemoryCache;
pub use self::redis_backend::RedisCache;

use crate::document::Document;
use crate::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

pub const CACHED_AT_FIELD: &str = "cached_at";
pub const TTL_FIELD: &str = "ttl";

/// Cache backend
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch an unexpired document
    async fn get(&self, key: &str) -> Result<Arc<Document>, CacheError>;

    /// Store `doc` for `ttl_minutes`; 0 stores nothing, negative is an error
    async fn set(&self, key: &str, doc: &mut Arc<Document>, ttl_minutes: i64) -> Result<(), CacheError>;

    /// Drop expired entries, returning how many were removed
    async fn expire(&self) -> usize;
}

/// Validate the TTL and compute the expiry instant; `None` means "do not store"
pub(crate) fn expiry(key: &str, now: DateTime<Utc>, ttl_minutes: i64) -> Result<Option<DateTime<Utc>>, CacheError> {
    match ttl_minutes {
        0 => Ok(None),
        ttl if ttl < 0 => Err(CacheError::NegativeTtl {
            key: key.to_string(),
            ttl,
        }),
        ttl => Ok(Some(now + chrono::Duration::minutes(ttl))),
    }
}

pub(crate) fn stamp(doc: &mut Arc<Document>, cached_at: DateTime<Utc>, expires_at: DateTime<Utc>) {
    let doc = Arc::make_mut(doc);
    doc.insert(CACHED_AT_FIELD, format_timestamp(cached_at));
    doc.insert(TTL_FIELD, format_timestamp(expires_at));
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
