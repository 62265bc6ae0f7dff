//! BIRD Routing Daemon Watcher for SONiC
//!
//! This crate turns the text console of the BIRD routing daemon (`birdc`)
//! into structured, cached JSON documents and serves them over HTTP.
//!
//! BIRD has no machine-readable interface, so every query runs
//! `birdc -r show ...` and parses its output. Many API clients asking for
//! the same listing must not flood the daemon: identical commands in flight
//! are coalesced, command execution is rate limited, and parsed documents
//! are cached with a TTL.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//!
//! | Control | Description | Implementation |
//! |---------|-------------|----------------|
//! | AC-3 | Access Enforcement | Restricted `birdc -r` mode, per-module endpoint enablement |
//! | AC-6 | Least Privilege | Only a fixed set of read-only `show` queries is issued |
//! | AU-3 | Content of Audit Records | Structured logging with command and outcome |
//! | AU-12 | Audit Record Generation | Command failures and rate-limit denials logged |
//! | CM-6 | Configuration Settings | Validated TOML configuration |
//! | SC-5 | DoS Protection | Request coalescing, token bucket rate limit, bounded cache |
//! | SC-28 | Protection of Information at Rest | Field filters null sensitive output |
//! | SI-10 | Input Validation | Charset and length checks on every parameter |
//! | SI-11 | Error Handling | Structured error types, typed query outcomes |
//!
//! # Architecture
//!
//! ```text
//! HTTP request
//!     |
//!     v
//! rest_api ----> Birdwatcher ----> Coordinator ----> Cache (memory | redis)
//!                (version, views)      |
//!                                      +--> RateLimiter
//!                                      +--> CommandRunner (birdc)
//!                                      +--> Parser (blocking pool)
//!                                              +--> route worker pool
//! ```

pub mod birdwatcher;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod housekeeping;
pub mod lines;
pub mod parser;
mod patterns;
pub mod query;
pub mod rate_limit;
pub mod reconfig;
pub mod rest_api;
pub mod runner;

pub use birdwatcher::Birdwatcher;
pub use cache::{Cache, MemoryCache, RedisCache};
pub use config::{BirdwatcherConfig, IpVersion, ParserConfig};
pub use coordinator::{Coordinator, Outcome, PostParseHook};
pub use document::{Document, DocumentError, ExtCommunity, Value};
pub use error::{BirdwatcherError, CacheError, Result};
pub use parser::{OutputKind, Parser};
pub use query::BirdQuery;
pub use rate_limit::RateLimiter;
pub use reconfig::ReconfigSource;
pub use rest_api::{ApiState, router};
pub use runner::{Birdc, CommandRunner};
