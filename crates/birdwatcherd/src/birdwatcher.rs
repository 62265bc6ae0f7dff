//! Query facade
//!
//! [`Birdwatcher`] turns a [`BirdQuery`] into console text for the running
//! daemon generation and hands it to the [`Coordinator`]. It also owns the
//! views that are derived from other queries: BGP-only protocols and
//! symbol names of one kind.

use crate::cache::{CACHED_AT_FIELD, TTL_FIELD};
use crate::config::{IpVersion, StatusConfig};
use crate::coordinator::{Coordinator, Outcome, PostParseHook};
use crate::document::{Document, Value};
use crate::parser::protocols::protocols_of_class;
use crate::parser::{OutputKind, index_by_class};
use crate::parser::status::major_version;
use crate::parser::symbols::names_of_kind;
use crate::query::{BirdQuery, QueryContext};
use crate::reconfig::ReconfigSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Cache key of the protocol class index built from `protocols all`
pub const PROTOCOLS_META_KEY: &str = "meta protocols";

pub struct Birdwatcher {
    coordinator: Arc<Coordinator>,
    status: StatusConfig,
    reconfig: Arc<ReconfigSource>,
    version: OnceCell<u32>,
    /// Major version seen by the last status hook, before field filtering
    observed_version: Arc<AtomicU32>,
}

impl Birdwatcher {
    pub fn new(coordinator: Arc<Coordinator>, status: StatusConfig, reconfig: ReconfigSource) -> Self {
        Self {
            coordinator,
            status,
            reconfig: Arc::new(reconfig),
            version: OnceCell::new(),
            observed_version: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn ip_version(&self) -> IpVersion {
        self.coordinator.parser().ip_version()
    }

    /// Daemon major version, 0 while unknown
    ///
    /// Asked once per process with an uncached `status`; a failed attempt is
    /// not remembered.
    pub async fn version(&self) -> u32 {
        let version = self
            .version
            .get_or_try_init(|| async {
                match self.detect_version().await {
                    0 => Err(()),
                    version => {
                        info!(version, "Detected BIRD major version");
                        Ok(version)
                    }
                }
            })
            .await;
        match version {
            Ok(version) => *version,
            Err(()) => {
                debug!("BIRD version unknown");
                0
            }
        }
    }

    /// Runs `status` straight through the coordinator, never through
    /// [`Self::query`], which itself waits on the version.
    async fn detect_version(&self) -> u32 {
        let command = BirdQuery::Status.command(&self.context(0));
        let outcome = self
            .coordinator
            .run_and_parse(false, &command, OutputKind::Status, Some(self.status_hook()))
            .await;
        match outcome.document().map(|doc| major_version(doc)) {
            Some(version) if version > 0 => version,
            Some(_) => self.observed_version.load(Ordering::Acquire),
            None => 0,
        }
    }

    fn context(&self, version: u32) -> QueryContext<'_> {
        QueryContext {
            version,
            ip_version: self.ip_version(),
            parser: self.coordinator.parser().config(),
        }
    }

    /// Console text for `query` against the running daemon
    pub async fn command(&self, query: &BirdQuery) -> String {
        let version = if query.is_version_dependent() {
            self.version().await
        } else {
            0
        };
        query.command(&self.context(version))
    }

    pub async fn query(&self, use_cache: bool, query: &BirdQuery) -> Outcome {
        let command = self.command(query).await;
        let hook = match query {
            BirdQuery::Status => Some(self.status_hook()),
            BirdQuery::Protocols => Some(protocols_meta_hook()),
            _ => None,
        };
        self.coordinator
            .run_and_parse(use_cache, &command, query.output_kind(), hook)
            .await
    }

    pub async fn status(&self, use_cache: bool) -> Outcome {
        self.query(use_cache, &BirdQuery::Status).await
    }

    /// Only the BGP sessions from `protocols all`
    pub async fn protocols_bgp(&self, use_cache: bool) -> Outcome {
        let outcome = self.query(use_cache, &BirdQuery::Protocols).await;
        let Some(protocols) = outcome.document().cloned() else {
            return outcome;
        };

        let index = match self.coordinator.cache().get(PROTOCOLS_META_KEY).await {
            Ok(index) => index,
            Err(e) => {
                debug!(reason = %e, "Protocol index not cached, rebuilding");
                Arc::new(index_by_class(&protocols))
            }
        };

        outcome.map(|doc| {
            let mut bgp = Document::new();
            bgp.insert("protocols", protocols_of_class(&index, "BGP"));
            carry_cache_fields(doc, &mut bgp);
            bgp
        })
    }

    pub async fn symbols_tables(&self, use_cache: bool) -> Outcome {
        self.symbols_of_kind(use_cache, "routing table").await
    }

    pub async fn symbols_protocols(&self, use_cache: bool) -> Outcome {
        self.symbols_of_kind(use_cache, "protocol").await
    }

    async fn symbols_of_kind(&self, use_cache: bool, kind: &str) -> Outcome {
        self.query(use_cache, &BirdQuery::Symbols)
            .await
            .map(|doc| {
                let mut symbols = Document::new();
                symbols.insert("symbols", names_of_kind(doc, kind));
                carry_cache_fields(doc, &mut symbols);
                symbols
            })
    }

    /// Record the major version, replace `last_reconfig` from the configured
    /// source, then null the filtered status fields
    fn status_hook(&self) -> PostParseHook {
        let reconfig = Arc::clone(&self.reconfig);
        let filter_fields = self.status.filter_fields.clone();
        let observed_version = Arc::clone(&self.observed_version);

        Box::new(move |doc: &mut Document| {
            observed_version.store(major_version(doc), Ordering::Release);
            if let Some(Value::Doc(status)) = doc.get_mut("status") {
                let reported = status.get_str("last_reconfig").ok().map(str::to_string);
                match reconfig.resolve(reported.as_deref()) {
                    Ok(Some(timestamp)) => {
                        status.insert("last_reconfig", timestamp);
                    }
                    Ok(None) => {
                        status.remove("last_reconfig");
                    }
                    Err(e) => warn!(error = %e, "Failed to read reconfig timestamp"),
                }
                status.null_fields(&filter_fields);
            }
            Vec::new()
        })
    }
}

fn protocols_meta_hook() -> PostParseHook {
    Box::new(|doc: &mut Document| vec![(PROTOCOLS_META_KEY.to_string(), index_by_class(doc))])
}

fn carry_cache_fields(from: &Document, to: &mut Document) {
    for field in [TTL_FIELD, CACHED_AT_FIELD] {
        if let Some(value) = from.get(field) {
            to.insert(field, value.clone());
        }
    }
}
