//! BIRD Routing Daemon Watcher
//!
//! Main entry point for the birdwatcherd daemon.
//! Serves parsed `birdc` output as JSON over HTTP.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - AU-3: Content of Audit Records - Structured logging
//! - AU-12: Audit Record Generation - Log daemon lifecycle
//! - CM-6: Configuration Settings - Validated configuration at startup
//! - SC-5: Denial of Service Protection - Rate limiter and cache housekeeping

use clap::Parser as _;
use sonic_birdwatcherd::{
    Birdc, Birdwatcher, BirdwatcherConfig, Cache, Coordinator, IpVersion,
    MemoryCache, Parser, RateLimiter, RedisCache, ReconfigSource, Result, housekeeping,
    rest_api::{self, ApiState},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// BIRD console output as a JSON API
#[derive(clap::Parser, Debug)]
#[command(name = "birdwatcherd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file; may be repeated, later files override earlier ones
    #[arg(long = "config", value_name = "FILE")]
    config: Vec<PathBuf>,

    /// Serve the IPv6 daemon (`[bird6]` section)
    #[arg(short = '6', long)]
    ipv6: bool,

    /// Threads used to parse route listings, overrides the config file
    #[arg(long)]
    worker_pool_size: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn config_files(&self) -> Vec<PathBuf> {
        if !self.config.is_empty() {
            return self.config.clone();
        }
        [
            "./etc/birdwatcher/birdwatcher.conf",
            "/etc/birdwatcher/birdwatcher.conf",
            "./etc/birdwatcher/birdwatcher.local.conf",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect()
    }

    fn ip_version(&self) -> IpVersion {
        if self.ipv6 { IpVersion::V6 } else { IpVersion::V4 }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // NIST: AU-3, AU-12 - Audit logging setup
    init_logging(args.debug);

    info!(version = env!("CARGO_PKG_VERSION"), "birdwatcherd: Starting");

    match run(args).await {
        Ok(()) => {
            info!("birdwatcherd: Exiting normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "birdwatcherd: Exiting with error");
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}

/// Structured logging, filtered by `RUST_LOG` unless `--debug` is given
fn init_logging(debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

async fn run(args: Args) -> Result<()> {
    let ip_version = args.ip_version();

    // NIST: CM-6 - Configuration settings
    let mut config = BirdwatcherConfig::load(&args.config_files())?;
    if let Some(workers) = args.worker_pool_size {
        config.parser.worker_pool_size = workers;
    }
    config.validate()?;

    let bird = config.bird_for(ip_version).clone();
    info!(
        ip_version = %ip_version,
        listen = %bird.listen,
        birdc = %bird.birdc,
        ttl = bird.ttl,
        "birdwatcherd: Configuration loaded"
    );

    let cache = init_cache(&config, ip_version).await;

    // NIST: SC-5 - Bound load on the routing daemon
    let limiter = Arc::new(RateLimiter::new(&config.ratelimit));
    if limiter.is_enabled() {
        limiter.spawn_refill();
        info!(
            requests_per_window = config.ratelimit.requests_per_window,
            "birdwatcherd: Rate limiting enabled"
        );
    }

    housekeeping::spawn(
        Arc::clone(&cache),
        config.housekeeping_interval(),
        bird.ttl > 0,
    );

    let runner = Arc::new(Birdc::new(&bird.birdc)?);
    let parser = Parser::new(config.parser.clone(), ip_version);
    let coordinator = Arc::new(Coordinator::new(cache, limiter, runner, parser, bird.ttl));

    let reconfig = ReconfigSource::from_config(&config.status, &bird)?;
    let birdwatcher = Arc::new(Birdwatcher::new(coordinator, config.status.clone(), reconfig));

    let app = rest_api::router(ApiState::new(birdwatcher, config.server.clone()));
    let listener = TcpListener::bind(&bird.listen).await?;
    info!(listen = %bird.listen, "birdwatcherd: Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Redis when configured and reachable, otherwise the in-process cache
async fn init_cache(config: &BirdwatcherConfig, ip_version: IpVersion) -> Arc<dyn Cache> {
    if config.cache.use_redis {
        match RedisCache::connect(&config.cache, ip_version).await {
            Ok(redis) => {
                info!(server = %config.cache.redis_server, "birdwatcherd: Using Redis cache");
                return Arc::new(redis);
            }
            Err(e) => {
                warn!(error = %e, "birdwatcherd: Redis unavailable, falling back to memory cache");
            }
        }
    }
    info!(max_keys = config.cache.max_keys, "birdwatcherd: Using memory cache");
    Arc::new(MemoryCache::new(config.cache.max_keys))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "birdwatcherd: Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("birdwatcherd: Received shutdown signal");
}

