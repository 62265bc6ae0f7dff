//! REST API for birdwatcherd
//!
//! Read-only JSON endpoints over the query facade. Every response body is
//! the parsed document plus an `api` object describing where it came from.
//! Endpoints are grouped in modules that can be enabled individually.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SI-10: Information Input Validation - Path and query parameters are
//!   restricted to a small charset and length before reaching the daemon
//! - SC-5: Denial of Service Protection - Rate-limited requests answer 429
//! - AC-3: Access Enforcement - Disabled modules are not routed

use crate::birdwatcher::Birdwatcher;
use crate::cache::CACHED_AT_FIELD;
use crate::config::ServerConfig;
use crate::coordinator::Outcome;
use crate::document::Document;
use crate::query::BirdQuery;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Longest accepted parameter value
const MAX_PARAM_LENGTH: usize = 80;

const PROTOCOL_CHARSET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ_:.abcdefghijklmnopqrstuvwxyz1234567890";
const PREFIX_CHARSET: &str = "1234567890abcdef.:/";

/// `cached_at` reported for documents that were never cached
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// Request failures, rendered as `{"error": ...}`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    InvalidParam(String),

    #[error("rate limit exceeded, try again later")]
    RateLimited,

    #[error("bird unreachable: {0}")]
    Unreachable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParam(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Timestamp in the format API consumers expect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeInfo {
    pub date: String,
    pub timezone_type: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStatus {
    /// Configured TTL in minutes
    pub orig_ttl: i64,
    pub cached_at: TimeInfo,
}

/// The `api` object of every response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiInfo {
    #[serde(rename = "Version")]
    pub version: String,
    pub result_from_cache: bool,
    pub cache_status: CacheStatus,
}

impl ApiInfo {
    pub fn new(doc: &Document, from_cache: bool, ttl_minutes: i64) -> Self {
        let cached_at = doc.get_str(CACHED_AT_FIELD).unwrap_or(ZERO_TIME);
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            result_from_cache: from_cache,
            cache_status: CacheStatus {
                orig_ttl: ttl_minutes,
                cached_at: TimeInfo {
                    date: cached_at.to_string(),
                    timezone_type: "UTC".to_string(),
                    timezone: "UTC".to_string(),
                },
            },
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    api: ApiInfo,
    #[serde(flatten)]
    doc: &'a Document,
}

/// Query string options shared by all endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Params {
    pub uncached: bool,
    pub prefix: Option<String>,
    pub table: Option<String>,
    pub pipe: Option<String>,
    pub address: Option<String>,
}

fn validate(value: &str, charset: &str) -> Result<String, ApiError> {
    if value.len() > MAX_PARAM_LENGTH {
        return Err(ApiError::InvalidParam(
            "Provided param value is too long.".to_string(),
        ));
    }
    if !value.chars().all(|c| charset.contains(c)) {
        return Err(ApiError::InvalidParam(
            "Invalid character in param value".to_string(),
        ));
    }
    Ok(value.to_string())
}

/// Protocol and table names
pub fn validate_protocol(value: &str) -> Result<String, ApiError> {
    validate(value, PROTOCOL_CHARSET)
}

/// Prefixes and addresses; `m` stands in for the `/` of a prefix length
pub fn validate_prefix(value: &str) -> Result<String, ApiError> {
    validate(&value.replacen('m', "/", 1), PREFIX_CHARSET)
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .ok_or_else(|| ApiError::InvalidParam(format!("need a {} as single query parameter", name)))
}

/// What an endpoint asks the facade for
enum View {
    Query(BirdQuery),
    ProtocolsBgp,
    SymbolsTables,
    SymbolsProtocols,
}

#[derive(Clone)]
pub struct ApiState {
    birdwatcher: Arc<Birdwatcher>,
    server: Arc<ServerConfig>,
}

impl ApiState {
    pub fn new(birdwatcher: Arc<Birdwatcher>, server: ServerConfig) -> Self {
        Self {
            birdwatcher,
            server: Arc::new(server),
        }
    }

    async fn respond(&self, view: View, params: &Params) -> Result<Response, ApiError> {
        let use_cache = !(params.uncached && self.server.allow_uncached);
        let bw = &self.birdwatcher;

        let outcome = match view {
            View::Query(query) => {
                debug!(query = %query, use_cache, "API request");
                bw.query(use_cache, &query).await
            }
            View::ProtocolsBgp => bw.protocols_bgp(use_cache).await,
            View::SymbolsTables => bw.symbols_tables(use_cache).await,
            View::SymbolsProtocols => bw.symbols_protocols(use_cache).await,
        };

        let ttl = bw.coordinator().ttl_minutes();
        match outcome {
            Outcome::Fresh(doc) => Ok(render(&doc, false, ttl)),
            Outcome::Cached(doc) => Ok(render(&doc, true, ttl)),
            Outcome::RateLimited => Err(ApiError::RateLimited),
            Outcome::Unreachable(reason) => Err(ApiError::Unreachable(reason)),
        }
    }
}

fn render(doc: &Document, from_cache: bool, ttl_minutes: i64) -> Response {
    Json(Envelope {
        api: ApiInfo::new(doc, from_cache, ttl_minutes),
        doc,
    })
    .into_response()
}

type ApiResult = Result<Response, ApiError>;

/// Build the router for every enabled module
pub fn router(state: ApiState) -> Router {
    let endpoints: Vec<(&str, &str, MethodRouter<ApiState>)> = vec![
        ("status", "/status", get(status)),
        ("protocols", "/protocols", get(protocols)),
        ("protocols_bgp", "/protocols/bgp", get(protocols_bgp)),
        ("protocols_short", "/protocols/short", get(protocols_short)),
        ("symbols", "/symbols", get(symbols)),
        ("symbols_tables", "/symbols/tables", get(symbols_tables)),
        ("symbols_protocols", "/symbols/protocols", get(symbols_protocols)),
        ("routes_protocol", "/routes/protocol/{protocol}", get(routes_protocol)),
        ("routes_table", "/routes/table/{table}", get(routes_table)),
        ("routes_table_filtered", "/routes/table/{table}/filtered", get(routes_table_filtered)),
        ("routes_table_peer", "/routes/table/{table}/peer/{peer}", get(routes_table_peer)),
        ("routes_filtered", "/routes/filtered/{protocol}", get(routes_filtered)),
        ("routes_export", "/routes/export/{protocol}", get(routes_export)),
        ("routes_noexport", "/routes/noexport/{protocol}", get(routes_noexport)),
        ("routes_prefixed", "/routes/prefix", get(routes_prefixed)),
        ("routes_peer", "/routes/peer/{peer}", get(routes_peer)),
        ("route_net", "/route/net/{net}", get(route_net)),
        ("route_net", "/route/net/{net}/table/{table}", get(route_net_table)),
        ("route_net", "/route/net/{net}/protocol/{protocol}", get(route_net_protocol)),
        ("routes_count_protocol", "/routes/count/protocol/{protocol}", get(count_protocol)),
        ("routes_count_primary", "/routes/count/primary/{protocol}", get(count_primary)),
        ("routes_count_table", "/routes/count/table/{table}", get(count_table)),
        ("routes_count_export", "/routes/count/export/{protocol}", get(count_export)),
        ("routes_pipe_filtered", "/routes/pipe/filtered", get(pipe_filtered)),
        ("routes_pipe_filtered_count", "/routes/pipe/filtered/count", get(pipe_filtered_count)),
    ];

    let modules = &state.server.modules_enabled;
    let mut router = Router::new();
    for (module, path, handler) in endpoints {
        if modules.is_empty() || modules.iter().any(|m| m == module) {
            router = router.route(path, handler);
        } else {
            debug!(module, path, "Endpoint disabled");
        }
    }
    let enabled = if modules.is_empty() {
        "all".to_string()
    } else {
        modules.join(",")
    };
    info!(modules = %enabled, "REST API routes configured");
    router.with_state(state)
}

async fn status(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    s.respond(View::Query(BirdQuery::Status), &p).await
}

async fn protocols(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    s.respond(View::Query(BirdQuery::Protocols), &p).await
}

async fn protocols_bgp(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    s.respond(View::ProtocolsBgp, &p).await
}

async fn protocols_short(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    s.respond(View::Query(BirdQuery::ProtocolsShort), &p).await
}

async fn symbols(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    s.respond(View::Query(BirdQuery::Symbols), &p).await
}

async fn symbols_tables(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    s.respond(View::SymbolsTables, &p).await
}

async fn symbols_protocols(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    s.respond(View::SymbolsProtocols, &p).await
}

async fn routes_protocol(
    State(s): State<ApiState>,
    Path(protocol): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::RoutesProtocol { protocol }), &p).await
}

async fn routes_table(
    State(s): State<ApiState>,
    Path(table): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let table = validate_protocol(&table)?;
    s.respond(View::Query(BirdQuery::RoutesTable { table }), &p).await
}

async fn routes_table_filtered(
    State(s): State<ApiState>,
    Path(table): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let table = validate_protocol(&table)?;
    s.respond(View::Query(BirdQuery::RoutesTableFiltered { table }), &p).await
}

async fn routes_table_peer(
    State(s): State<ApiState>,
    Path((table, peer)): Path<(String, String)>,
    Query(p): Query<Params>,
) -> ApiResult {
    let table = validate_protocol(&table)?;
    let peer = validate_prefix(&peer)?;
    s.respond(View::Query(BirdQuery::RoutesTablePeer { table, peer }), &p).await
}

async fn routes_filtered(
    State(s): State<ApiState>,
    Path(protocol): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::RoutesFiltered { protocol }), &p).await
}

async fn routes_export(
    State(s): State<ApiState>,
    Path(protocol): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::RoutesExport { protocol }), &p).await
}

async fn routes_noexport(
    State(s): State<ApiState>,
    Path(protocol): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::RoutesNoExport { protocol }), &p).await
}

async fn routes_prefixed(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    let prefix = validate_prefix(required(&p.prefix, "prefix")?)?;
    s.respond(View::Query(BirdQuery::RoutesPrefixed { prefix }), &p).await
}

async fn routes_peer(
    State(s): State<ApiState>,
    Path(peer): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let peer = validate_prefix(&peer)?;
    s.respond(View::Query(BirdQuery::RoutesPeer { peer }), &p).await
}

async fn route_net(
    State(s): State<ApiState>,
    Path(net): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let net = validate_prefix(&net)?;
    let table = "master".to_string();
    s.respond(View::Query(BirdQuery::RoutesLookupTable { net, table }), &p).await
}

async fn route_net_table(
    State(s): State<ApiState>,
    Path((net, table)): Path<(String, String)>,
    Query(p): Query<Params>,
) -> ApiResult {
    let net = validate_prefix(&net)?;
    let table = validate_protocol(&table)?;
    s.respond(View::Query(BirdQuery::RoutesLookupTable { net, table }), &p).await
}

async fn route_net_protocol(
    State(s): State<ApiState>,
    Path((net, protocol)): Path<(String, String)>,
    Query(p): Query<Params>,
) -> ApiResult {
    let net = validate_prefix(&net)?;
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::RoutesLookupProtocol { net, protocol }), &p).await
}

async fn count_protocol(
    State(s): State<ApiState>,
    Path(protocol): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::CountProtocol { protocol }), &p).await
}

async fn count_primary(
    State(s): State<ApiState>,
    Path(protocol): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::CountPrimary { protocol }), &p).await
}

async fn count_table(
    State(s): State<ApiState>,
    Path(table): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let table = validate_protocol(&table)?;
    s.respond(View::Query(BirdQuery::CountTable { table }), &p).await
}

async fn count_export(
    State(s): State<ApiState>,
    Path(protocol): Path<String>,
    Query(p): Query<Params>,
) -> ApiResult {
    let protocol = validate_protocol(&protocol)?;
    s.respond(View::Query(BirdQuery::CountExport { protocol }), &p).await
}

async fn pipe_filtered(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    let table = validate_protocol(required(&p.table, "table")?)?;
    let pipe = validate_protocol(required(&p.pipe, "pipe")?)?;
    s.respond(View::Query(BirdQuery::PipeRoutesFiltered { pipe, table }), &p).await
}

async fn pipe_filtered_count(State(s): State<ApiState>, Query(p): Query<Params>) -> ApiResult {
    let table = validate_protocol(required(&p.table, "table")?)?;
    let pipe = validate_protocol(required(&p.pipe, "pipe")?)?;
    let neighbor = validate_prefix(required(&p.address, "address")?)?;
    let query = BirdQuery::PipeRoutesFilteredCount {
        pipe,
        table,
        neighbor,
    };
    s.respond(View::Query(query), &p).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_protocol() {
        assert_eq!(validate_protocol("ID8497_AS1339").unwrap(), "ID8497_AS1339");
        assert_eq!(validate_protocol("R192.168.0.1:1").unwrap(), "R192.168.0.1:1");
        assert!(matches!(
            validate_protocol("R1; reload"),
            Err(ApiError::InvalidParam(_))
        ));
        assert!(validate_protocol(&"a".repeat(81)).is_err());
        assert!(validate_protocol(&"a".repeat(80)).is_ok());
    }

    #[test]
    fn test_validate_prefix() {
        assert_eq!(validate_prefix("10.0.0.0m8").unwrap(), "10.0.0.0/8");
        assert_eq!(validate_prefix("2001:db8::m32").unwrap(), "2001:db8::/32");
        assert_eq!(validate_prefix("10.0.0.1").unwrap(), "10.0.0.1");
        // only the first m is a mask separator
        assert!(validate_prefix("10.0.0.0m8m").is_err());
        assert!(validate_prefix("10.0.0.0 all").is_err());
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Unreachable("x".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::InvalidParam("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_envelope_merges_document() {
        let mut doc = Document::new();
        doc.insert("routes", 42i64);
        doc.insert(CACHED_AT_FIELD, "2020-03-10T10:00:00.000Z");

        let json = serde_json::to_value(Envelope {
            api: ApiInfo::new(&doc, true, 5),
            doc: &doc,
        })
        .unwrap();

        assert_eq!(json["routes"], 42);
        assert_eq!(json["api"]["result_from_cache"], true);
        assert_eq!(json["api"]["Version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["api"]["cache_status"]["orig_ttl"], 5);
        assert_eq!(
            json["api"]["cache_status"]["cached_at"],
            serde_json::json!({
                "date": "2020-03-10T10:00:00.000Z",
                "timezone_type": "UTC",
                "timezone": "UTC",
            })
        );
    }

    #[test]
    fn test_uncached_document_reports_zero_time() {
        let info = ApiInfo::new(&Document::new(), false, 0);
        assert_eq!(info.cache_status.cached_at.date, ZERO_TIME);
        assert!(!info.result_from_cache);
    }
}
