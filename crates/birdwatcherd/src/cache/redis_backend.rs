//! Redis cache backend
//!
//! Documents are stored as JSON with native key expiry, so `expire` has
//! nothing to sweep. Keys are prefixed with the address family so IPv4 and
//! IPv6 instances can share one server.
//!
//! # NIST Controls
//! - SC-8: Transmission Confidentiality - Redis connection security
//! - IA-5: Authenticator Management - Redis authentication if configured

use super::{Cache, TTL_FIELD, expiry, parse_timestamp, stamp};
use crate::config::{CacheConfig, IpVersion};
use crate::document::Document;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Shared Redis cache
pub struct RedisCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connect using the `[cache]` settings
    #[instrument(skip_all, fields(server = %config.redis_server, db = config.redis_db))]
    pub async fn connect(config: &CacheConfig, ip_version: IpVersion) -> Result<Self> {
        let client = Client::open(redis_url(config))?;
        let conn = ConnectionManager::new(client).await?;
        debug!("Connected to Redis cache");
        Ok(Self {
            conn,
            key_prefix: key_prefix(ip_version),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn redis_url(config: &CacheConfig) -> String {
    if config.redis_password.is_empty() {
        format!("redis://{}/{}", config.redis_server, config.redis_db)
    } else {
        format!(
            "redis://:{}@{}/{}",
            config.redis_password, config.redis_server, config.redis_db
        )
    }
}

fn key_prefix(ip_version: IpVersion) -> String {
    format!("B{}_", ip_version)
}

/// Decode a stored payload, treating a passed `ttl` as expired
fn decode(key: &str, payload: &str) -> std::result::Result<Document, CacheError> {
    let doc: Document = serde_json::from_str(payload).map_err(|e| CacheError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    let expires_at = doc
        .get_str(TTL_FIELD)
        .ok()
        .and_then(parse_timestamp)
        .ok_or_else(|| CacheError::Malformed {
            key: key.to_string(),
            reason: "invalid TTL value".to_string(),
        })?;
    if Utc::now() >= expires_at {
        return Err(CacheError::expired(key));
    }
    Ok(doc)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> std::result::Result<Arc<Document>, CacheError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn
            .get(self.key(key))
            .await
            .map_err(|e| CacheError::backend("get", e))?;

        let payload = payload.ok_or_else(|| CacheError::not_found(key))?;
        decode(key, &payload).map(Arc::new)
    }

    async fn set(
        &self,
        key: &str,
        doc: &mut Arc<Document>,
        ttl_minutes: i64,
    ) -> std::result::Result<(), CacheError> {
        let now = Utc::now();
        let Some(expires_at) = expiry(key, now, ttl_minutes)? else {
            return Ok(());
        };
        stamp(doc, now, expires_at);

        let payload =
            serde_json::to_string(doc.as_ref()).map_err(|e| CacheError::backend("encode", e))?;
        let seconds = u64::try_from(ttl_minutes * 60).unwrap_or(u64::MAX);

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(key), payload, seconds)
            .await
            .map_err(|e| CacheError::backend("set", e))?;
        Ok(())
    }

    async fn expire(&self) -> usize {
        // Redis expires keys on its own
        0
    }
}
