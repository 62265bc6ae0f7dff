//! Command execution coordinator
//!
//! Every console query goes through [`Coordinator::run_and_parse`]:
//!
//! 1. serve from cache when allowed and fresh;
//! 2. if the same command is already running, wait for it and re-read the
//!    cache instead of starting another client process;
//! 3. take a rate-limit token;
//! 4. run the client, parse its output on the blocking pool, run the
//!    post-parse hook and cache the results.
//!
//! Steps 3 and 4 run on a spawned task that finishes even if its caller is
//! dropped.
//!
//! # NIST Controls
//! - SC-5: Denial of Service Protection - Coalescing and rate limiting
//! - AU-12: Audit Record Generation - Command outcomes logged

use crate::cache::Cache;
use crate::document::Document;
use crate::parser::{OutputKind, Parser};
use crate::rate_limit::RateLimiter;
use crate::runner::CommandRunner;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{Instrument, Span, debug, instrument, warn};

/// Derives extra documents from a fresh result; each `(key, doc)` is cached
pub type PostParseHook = Box<dyn FnOnce(&mut Document) -> Vec<(String, Document)> + Send>;

/// Result of a query
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Freshly executed and parsed
    Fresh(Arc<Document>),
    /// Served from cache
    Cached(Arc<Document>),
    /// No token left, or a coalesced leader produced nothing to share
    RateLimited,
    /// The client could not produce output
    Unreachable(String),
}

impl Outcome {
    pub fn document(&self) -> Option<&Arc<Document>> {
        match self {
            Outcome::Fresh(doc) | Outcome::Cached(doc) => Some(doc),
            Outcome::RateLimited | Outcome::Unreachable(_) => None,
        }
    }

    pub fn from_cache(&self) -> bool {
        matches!(self, Outcome::Cached(_))
    }

    /// Replace the document, keeping where it came from
    pub fn map<F>(self, f: F) -> Outcome
    where
        F: FnOnce(&Document) -> Document,
    {
        match self {
            Outcome::Fresh(doc) => Outcome::Fresh(Arc::new(f(&doc))),
            Outcome::Cached(doc) => Outcome::Cached(Arc::new(f(&doc))),
            other => other,
        }
    }
}

/// Marks a command as running; dropping it releases waiters
struct InFlight {
    map: Arc<DashMap<String, watch::Receiver<bool>>>,
    key: String,
    done: watch::Sender<bool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.map.remove(&self.key);
        self.done.send_replace(true);
    }
}

enum Claim {
    Leader(InFlight),
    Follower(watch::Receiver<bool>),
}

/// Owned handles a leader needs after its caller has gone away
#[derive(Clone)]
struct Executor {
    cache: Arc<dyn Cache>,
    limiter: Arc<RateLimiter>,
    runner: Arc<dyn CommandRunner>,
    parser: Parser,
    ttl_minutes: i64,
}

impl Executor {
    async fn execute(&self, query: &str, kind: OutputKind, hook: Option<PostParseHook>) -> Outcome {
        if !self.limiter.try_acquire() {
            warn!("Rate limit exceeded, not executing");
            return Outcome::RateLimited;
        }

        let output = match self.runner.run(query).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "BIRD unreachable");
                return Outcome::Unreachable(e.to_string());
            }
        };

        let parser = self.parser.clone();
        let parsed = tokio::task::spawn_blocking(move || {
            let mut doc = parser.parse(kind, &output);
            let derived = hook.map(|hook| hook(&mut doc)).unwrap_or_default();
            (doc, derived)
        })
        .await;
        let (doc, derived) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Parser task failed");
                return Outcome::Unreachable(format!("parser failed: {}", e));
            }
        };

        for (key, derived_doc) in derived {
            self.store(&key, &mut Arc::new(derived_doc)).await;
        }
        let mut doc = Arc::new(doc);
        self.store(query, &mut doc).await;
        Outcome::Fresh(doc)
    }

    async fn store(&self, key: &str, doc: &mut Arc<Document>) {
        if let Err(e) = self.cache.set(key, doc, self.ttl_minutes).await {
            warn!(key = %key, error = %e, "Failed to cache result");
        }
    }
}

/// Serializes access to the routing daemon
pub struct Coordinator {
    executor: Executor,
    in_flight: Arc<DashMap<String, watch::Receiver<bool>>>,
}

impl Coordinator {
    pub fn new(
        cache: Arc<dyn Cache>,
        limiter: Arc<RateLimiter>,
        runner: Arc<dyn CommandRunner>,
        parser: Parser,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            executor: Executor {
                cache,
                limiter,
                runner,
                parser,
                ttl_minutes,
            },
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.executor.cache
    }

    pub fn parser(&self) -> &Parser {
        &self.executor.parser
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.executor.ttl_minutes
    }

    /// Commands currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn claim(&self, query: &str) -> Claim {
        match self.in_flight.entry(query.to_string()) {
            Entry::Occupied(entry) => Claim::Follower(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (done, waiting) = watch::channel(false);
                entry.insert(waiting);
                Claim::Leader(InFlight {
                    map: Arc::clone(&self.in_flight),
                    key: query.to_string(),
                    done,
                })
            }
        }
    }

    /// Run `query` and parse its output with the `kind` parser
    ///
    /// The leader of a command runs on its own task, so followers still get
    /// the result when the caller that started it is cancelled.
    #[instrument(skip(self, hook), fields(query = %query))]
    pub async fn run_and_parse(
        &self,
        use_cache: bool,
        query: &str,
        kind: OutputKind,
        hook: Option<PostParseHook>,
    ) -> Outcome {
        if use_cache {
            match self.cache().get(query).await {
                Ok(doc) => {
                    debug!("Cache hit");
                    return Outcome::Cached(doc);
                }
                Err(e) if e.is_miss() => debug!(reason = %e, "Cache miss"),
                Err(e) => warn!(error = %e, "Cache lookup failed"),
            }
        }

        let in_flight = match self.claim(query) {
            Claim::Leader(in_flight) => in_flight,
            Claim::Follower(mut done) => {
                debug!("Waiting for identical command in flight");
                // an Err only means the leader is gone, which is also "done"
                let _ = done.wait_for(|finished| *finished).await;
                return match self.cache().get(query).await {
                    Ok(doc) => Outcome::Cached(doc),
                    Err(e) => {
                        debug!(reason = %e, "Nothing cached by coalesced command");
                        Outcome::RateLimited
                    }
                };
            }
        };

        let executor = self.executor.clone();
        let owned_query = query.to_string();
        let leader = tokio::spawn(
            async move {
                let outcome = executor.execute(&owned_query, kind, hook).await;
                drop(in_flight);
                outcome
            }
            .instrument(Span::current()),
        );
        match leader.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Command task failed");
                Outcome::Unreachable(format!("command failed: {}", e))
            }
        }
    }
}
