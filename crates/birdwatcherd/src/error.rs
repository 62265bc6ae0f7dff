//! Error types for birdwatcherd
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SI-11: Error Handling - Structured error types with contextual information
//! - AU-3: Content of Audit Records - Errors include sufficient detail for audit

use thiserror::Error;

/// Errors that can occur in birdwatcherd
#[derive(Debug, Error)]
pub enum BirdwatcherError {
    /// The BIRD client could not be started
    #[error("Failed to execute '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The BIRD client exited with a non-zero status
    #[error("Command '{command}' failed (exit code {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Configuration error
    /// NIST: CM-6 (Configuration Settings) - Configuration validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache backend error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Redis connection or operation failed
    /// NIST: SC-8 (Transmission Confidentiality) - Database communication errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BirdwatcherError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Errors returned by cache backends
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// No entry is stored under the key
    #[error("Could not retrieve '{key}' from cache")]
    NotFound { key: String },

    /// An entry exists but its TTL has elapsed
    #[error("Cache entry '{key}' expired")]
    Expired { key: String },

    /// Refused to store with a negative TTL
    #[error("Negative TTL {ttl} for cache entry '{key}'")]
    NegativeTtl { key: String, ttl: i64 },

    /// A stored entry could not be decoded
    #[error("Malformed cache entry '{key}': {reason}")]
    Malformed { key: String, reason: String },

    /// The backend itself failed
    #[error("Cache backend {operation} failed: {message}")]
    Backend { operation: String, message: String },
}

impl CacheError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn expired(key: impl Into<String>) -> Self {
        Self::Expired { key: key.into() }
    }

    pub fn backend(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Miss means "run the command"; anything else is worth a log line too
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Expired { .. })
    }
}

/// Result type alias for birdwatcherd operations
pub type Result<T> = std::result::Result<T, BirdwatcherError>;
