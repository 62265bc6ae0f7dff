//! Configuration file support for birdwatcherd
//!
//! Loads and validates configuration from one or more TOML files. Files are
//! deep-merged in the order given, so a site-local file only needs the keys
//! it overrides.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - CM-6: Configuration Settings - Validated, defaulted settings
//! - SC-5: Denial of Service Protection - Rate limit settings

use crate::error::{BirdwatcherError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Address family served by this instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IpVersion {
    #[default]
    #[serde(rename = "4")]
    V4,
    #[serde(rename = "6")]
    V6,
}

impl IpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpVersion::V4 => "4",
            IpVersion::V6 => "6",
        }
    }

    /// Suffix of the per-family master table and network type
    pub fn net_type(&self) -> &'static str {
        match self {
            IpVersion::V4 => "NET_IP4",
            IpVersion::V6 => "NET_IP6",
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Honor `?uncached=true` on requests
    #[serde(default)]
    pub allow_uncached: bool,

    /// Endpoint modules to expose; empty exposes all
    #[serde(default)]
    pub modules_enabled: Vec<String>,
}

/// Where `last_reconfig` in status output comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconfigTimestampSource {
    /// As reported by the daemon
    #[default]
    Bird,
    /// Modification time of the daemon configuration file
    ConfigModified,
    /// First capture of `reconfig_timestamp_match` in the configuration file
    ConfigRegex,
}

/// Status post-processing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default)]
    pub reconfig_timestamp_source: ReconfigTimestampSource,

    #[serde(default)]
    pub reconfig_timestamp_match: String,

    /// Status fields replaced by null
    #[serde(default)]
    pub filter_fields: Vec<String>,
}

/// One BIRD daemon instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdConfig {
    /// HTTP listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Daemon configuration file, used for reconfig timestamps
    #[serde(default = "default_bird_config")]
    pub config: PathBuf,

    /// Client command line, e.g. `birdc -s /run/bird.ctl`
    #[serde(default = "default_birdc")]
    pub birdc: String,

    /// Cache TTL in minutes, 0 disables caching
    #[serde(default = "default_ttl")]
    pub ttl: i64,
}

/// Parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Route fields replaced by null
    #[serde(default)]
    pub filter_fields: Vec<String>,

    /// Peers have their own tables, connected to master by pipes
    #[serde(default)]
    pub per_peer_tables: bool,

    #[serde(default = "default_peer_protocol_prefix")]
    pub peer_protocol_prefix: String,

    #[serde(default = "default_pipe_protocol_prefix")]
    pub pipe_protocol_prefix: String,

    #[serde(default = "default_peer_table_prefix")]
    pub peer_table_prefix: String,

    /// Threads used to parse route listings
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Map symbol kinds to all names instead of names to kinds
    #[serde(default)]
    pub symbols_multi_value: bool,
}

/// Rate limiting of console commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Commands allowed per one-second window
    #[serde(default = "default_requests_per_window", alias = "requests_per_minute")]
    pub requests_per_window: i64,
}

/// Cache backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub use_redis: bool,

    #[serde(default = "default_redis_server")]
    pub redis_server: String,

    #[serde(default)]
    pub redis_password: String,

    #[serde(default)]
    pub redis_db: i64,

    /// Memory cache capacity, 0 is unbounded
    #[serde(default)]
    pub max_keys: usize,
}

/// Periodic maintenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    /// Minutes between cache expiry sweeps
    #[serde(default = "default_housekeeping_interval")]
    pub interval: u64,
}

/// Complete birdwatcherd configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdwatcherConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub bird: BirdConfig,

    #[serde(default = "default_bird6")]
    pub bird6: BirdConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub ratelimit: RateLimitConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
}

// Default functions
fn default_listen() -> String {
    "0.0.0.0:29184".to_string()
}

fn default_bird_config() -> PathBuf {
    PathBuf::from("/etc/bird/bird.conf")
}

fn default_birdc() -> String {
    "birdc".to_string()
}

fn default_ttl() -> i64 {
    5
}

fn default_bird6() -> BirdConfig {
    BirdConfig {
        listen: "0.0.0.0:29186".to_string(),
        config: PathBuf::from("/etc/bird/bird6.conf"),
        birdc: "birdc6".to_string(),
        ttl: default_ttl(),
    }
}

fn default_peer_protocol_prefix() -> String {
    "ID".to_string()
}

fn default_pipe_protocol_prefix() -> String {
    "M".to_string()
}

fn default_peer_table_prefix() -> String {
    "T".to_string()
}

fn default_worker_pool_size() -> usize {
    8
}

fn default_requests_per_window() -> i64 {
    10
}

fn default_redis_server() -> String {
    "127.0.0.1:6379".to_string()
}

fn default_housekeeping_interval() -> u64 {
    5
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allow_uncached: false,
            modules_enabled: Vec::new(),
        }
    }
}

impl Default for BirdConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            config: default_bird_config(),
            birdc: default_birdc(),
            ttl: default_ttl(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            filter_fields: Vec::new(),
            per_peer_tables: false,
            peer_protocol_prefix: default_peer_protocol_prefix(),
            pipe_protocol_prefix: default_pipe_protocol_prefix(),
            peer_table_prefix: default_peer_table_prefix(),
            worker_pool_size: default_worker_pool_size(),
            symbols_multi_value: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_window: default_requests_per_window(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_redis: false,
            redis_server: default_redis_server(),
            redis_password: String::new(),
            redis_db: 0,
            max_keys: 0,
        }
    }
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            interval: default_housekeeping_interval(),
        }
    }
}

impl Default for BirdwatcherConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            status: StatusConfig::default(),
            bird: BirdConfig::default(),
            bird6: default_bird6(),
            parser: ParserConfig::default(),
            ratelimit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            housekeeping: HousekeepingConfig::default(),
        }
    }
}

impl BirdwatcherConfig {
    /// Parse a single TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| BirdwatcherError::config(format!("Failed to parse config: {}", e)))
    }

    /// Load and deep-merge several files, later files overriding earlier ones
    ///
    /// Unreadable or malformed files are skipped; it is an error only when
    /// none of them could be used.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();
        let mut loaded = 0;

        for path in paths {
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping config file");
                    continue;
                }
            };
            match toml::from_str::<toml::Table>(&content) {
                Ok(table) => {
                    info!(path = %path.display(), "Loaded config file");
                    merge_tables(&mut merged, table);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed config file");
                }
            }
        }

        if loaded == 0 {
            return Err(BirdwatcherError::config(format!(
                "No usable config file among {:?}",
                paths
            )));
        }

        let content = toml::to_string(&merged)
            .map_err(|e| BirdwatcherError::config(format!("Invalid merged config: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Daemon section for the given address family
    pub fn bird_for(&self, ip_version: IpVersion) -> &BirdConfig {
        match ip_version {
            IpVersion::V4 => &self.bird,
            IpVersion::V6 => &self.bird6,
        }
    }

    /// Get housekeeping interval as Duration
    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.housekeeping.interval.max(1) * 60)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (section, bird) in [("bird", &self.bird), ("bird6", &self.bird6)] {
            if bird.birdc.trim().is_empty() {
                return Err(BirdwatcherError::config(format!(
                    "{}.birdc must not be empty",
                    section
                )));
            }
            if bird.ttl < 0 {
                return Err(BirdwatcherError::config(format!(
                    "{}.ttl must be >= 0",
                    section
                )));
            }
        }

        if self.ratelimit.enabled && self.ratelimit.requests_per_window <= 0 {
            return Err(BirdwatcherError::config(
                "ratelimit.requests_per_window must be > 0",
            ));
        }

        if self.status.reconfig_timestamp_source == ReconfigTimestampSource::ConfigRegex {
            Regex::new(&self.status.reconfig_timestamp_match).map_err(|e| {
                BirdwatcherError::config(format!("Invalid reconfig_timestamp_match: {}", e))
            })?;
        }

        Ok(())
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}
