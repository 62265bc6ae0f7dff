//! Read-only console queries
//!
//! [`BirdQuery`] enumerates every command birdwatcherd ever issues. The
//! console text depends on the daemon generation: BIRD 2 has one master
//! table per address family and mixes both families in protocol-directed
//! listings, so those queries get a `net.type` filter.

use crate::config::{IpVersion, ParserConfig};
use crate::parser::OutputKind;
use std::fmt;

/// A supported `show` query and its parameters
///
/// Parameters are expected to be validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BirdQuery {
    Status,
    Protocols,
    ProtocolsShort,
    Symbols,
    RoutesProtocol { protocol: String },
    RoutesTable { table: String },
    RoutesTableFiltered { table: String },
    RoutesTablePeer { table: String, peer: String },
    RoutesFiltered { protocol: String },
    RoutesExport { protocol: String },
    RoutesNoExport { protocol: String },
    RoutesPrefixed { prefix: String },
    RoutesPeer { peer: String },
    RoutesLookupTable { net: String, table: String },
    RoutesLookupProtocol { net: String, protocol: String },
    CountProtocol { protocol: String },
    CountPrimary { protocol: String },
    CountTable { table: String },
    CountExport { protocol: String },
    PipeRoutesFiltered { pipe: String, table: String },
    PipeRoutesFilteredCount { pipe: String, table: String, neighbor: String },
}

/// What the command text depends on besides the query itself
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    /// Daemon major version, 0 when unknown
    pub version: u32,
    pub ip_version: IpVersion,
    pub parser: &'a ParserConfig,
}

impl QueryContext<'_> {
    fn is_bird2(&self) -> bool {
        self.version >= 2
    }

    /// BIRD 2 splits `master` into `master4` and `master6`
    pub fn remap_table<'t>(&self, table: &'t str) -> std::borrow::Cow<'t, str> {
        if self.is_bird2() && table == "master" {
            format!("master{}", self.ip_version).into()
        } else {
            table.into()
        }
    }

    fn channel_filter(&self) -> String {
        if self.is_bird2() {
            format!(" where net.type = {}", self.ip_version.net_type())
        } else {
            String::new()
        }
    }

    /// Peer table and pipe protocol paired with `protocol`, if any
    fn peer_pipe(&self, protocol: &str) -> Option<(String, String)> {
        if !self.parser.per_peer_tables {
            return None;
        }
        let rest = protocol.strip_prefix(self.parser.peer_protocol_prefix.as_str())?;
        Some((
            format!("{}{}", self.parser.peer_table_prefix, rest),
            format!("{}{}", self.parser.pipe_protocol_prefix, rest),
        ))
    }
}

impl BirdQuery {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            BirdQuery::Status => "status",
            BirdQuery::Protocols => "protocols",
            BirdQuery::ProtocolsShort => "protocols_short",
            BirdQuery::Symbols => "symbols",
            BirdQuery::RoutesProtocol { .. } => "routes_protocol",
            BirdQuery::RoutesTable { .. } => "routes_table",
            BirdQuery::RoutesTableFiltered { .. } => "routes_table_filtered",
            BirdQuery::RoutesTablePeer { .. } => "routes_table_peer",
            BirdQuery::RoutesFiltered { .. } => "routes_filtered",
            BirdQuery::RoutesExport { .. } => "routes_export",
            BirdQuery::RoutesNoExport { .. } => "routes_noexport",
            BirdQuery::RoutesPrefixed { .. } => "routes_prefixed",
            BirdQuery::RoutesPeer { .. } => "routes_peer",
            BirdQuery::RoutesLookupTable { .. } => "routes_lookup_table",
            BirdQuery::RoutesLookupProtocol { .. } => "routes_lookup_protocol",
            BirdQuery::CountProtocol { .. } => "routes_count_protocol",
            BirdQuery::CountPrimary { .. } => "routes_count_primary",
            BirdQuery::CountTable { .. } => "routes_count_table",
            BirdQuery::CountExport { .. } => "routes_count_export",
            BirdQuery::PipeRoutesFiltered { .. } => "pipe_routes_filtered",
            BirdQuery::PipeRoutesFilteredCount { .. } => "pipe_routes_filtered_count",
        }
    }

    /// Parser for the command output
    pub fn output_kind(&self) -> OutputKind {
        match self {
            BirdQuery::Status => OutputKind::Status,
            BirdQuery::Protocols => OutputKind::Protocols,
            BirdQuery::ProtocolsShort => OutputKind::ProtocolsShort,
            BirdQuery::Symbols => OutputKind::Symbols,
            BirdQuery::CountProtocol { .. }
            | BirdQuery::CountPrimary { .. }
            | BirdQuery::CountTable { .. }
            | BirdQuery::CountExport { .. }
            | BirdQuery::PipeRoutesFilteredCount { .. } => OutputKind::RouteCount,
            _ => OutputKind::Routes,
        }
    }

    /// Whether the command depends on the daemon generation
    pub fn is_version_dependent(&self) -> bool {
        !matches!(
            self,
            BirdQuery::Status
                | BirdQuery::Protocols
                | BirdQuery::ProtocolsShort
                | BirdQuery::Symbols
                | BirdQuery::RoutesPrefixed { .. }
                | BirdQuery::RoutesPeer { .. }
                | BirdQuery::RoutesLookupProtocol { .. }
        )
    }

    /// Console text passed to `birdc -r show`; also the cache key
    pub fn command(&self, ctx: &QueryContext<'_>) -> String {
        match self {
            BirdQuery::Status => "status".to_string(),
            BirdQuery::Protocols => "protocols all".to_string(),
            BirdQuery::ProtocolsShort => "protocols".to_string(),
            BirdQuery::Symbols => "symbols".to_string(),
            BirdQuery::RoutesProtocol { protocol } => {
                format!("route all protocol {}{}", protocol, ctx.channel_filter())
            }
            BirdQuery::RoutesTable { table } => {
                format!("route table {} all", ctx.remap_table(table))
            }
            BirdQuery::RoutesTableFiltered { table } => {
                format!("route table {} filtered", ctx.remap_table(table))
            }
            BirdQuery::RoutesTablePeer { table, peer } => {
                format!("route table {} all where from={}", ctx.remap_table(table), peer)
            }
            BirdQuery::RoutesFiltered { protocol } => match ctx.peer_pipe(protocol) {
                Some((table, pipe)) => pipe_noexport(&table, &pipe),
                None => format!("route all filtered protocol {}{}", protocol, ctx.channel_filter()),
            },
            BirdQuery::RoutesExport { protocol } => {
                format!("route all export {}{}", protocol, ctx.channel_filter())
            }
            BirdQuery::RoutesNoExport { protocol } => match ctx.peer_pipe(protocol) {
                Some((table, pipe)) => pipe_noexport(&table, &pipe),
                None => format!("route all noexport {}{}", protocol, ctx.channel_filter()),
            },
            BirdQuery::RoutesPrefixed { prefix } => format!("route {} all", prefix),
            BirdQuery::RoutesPeer { peer } => format!("route all where from={}", peer),
            BirdQuery::RoutesLookupTable { net, table } => {
                format!("route for {} table {} all", net, ctx.remap_table(table))
            }
            BirdQuery::RoutesLookupProtocol { net, protocol } => {
                format!("route for {} protocol {} all", net, protocol)
            }
            BirdQuery::CountProtocol { protocol } => {
                format!("route protocol {}{} count", protocol, ctx.channel_filter())
            }
            BirdQuery::CountPrimary { protocol } => {
                format!("route primary protocol {}{} count", protocol, ctx.channel_filter())
            }
            BirdQuery::CountTable { table } => {
                format!("route table {} count", ctx.remap_table(table))
            }
            BirdQuery::CountExport { protocol } => {
                format!("route export {}{} count", protocol, ctx.channel_filter())
            }
            BirdQuery::PipeRoutesFiltered { pipe, table } => {
                pipe_noexport(&ctx.remap_table(table), pipe)
            }
            BirdQuery::PipeRoutesFilteredCount { pipe, table, neighbor } => format!(
                "route table {} noexport {} where from={} count",
                ctx.remap_table(table),
                pipe,
                neighbor
            ),
        }
    }
}

fn pipe_noexport(table: &str, pipe: &str) -> String {
    format!("route table '{}' noexport '{}' all", table, pipe)
}

impl fmt::Display for BirdQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
