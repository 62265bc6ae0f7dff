//! Document parsers for BIRD console output
//!
//! Parsers never fail: malformed or unrecognized lines are skipped and
//! partial results are returned.

mod pool;
pub mod protocols;
pub mod routes;
pub mod status;
pub mod symbols;

use crate::config::{IpVersion, ParserConfig};
use crate::document::Document;
use crate::lines::{is_special_line, lines};
use crate::patterns::ROUTE_COUNT;
use std::sync::Arc;

pub use protocols::{index_by_class, parse_protocols, parse_protocols_short};
pub use routes::parse_routes;
pub use status::parse_status;
pub use symbols::parse_symbols;

/// Which parser handles a console command's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Status,
    Protocols,
    ProtocolsShort,
    Symbols,
    Routes,
    RouteCount,
}

/// Parser settings shared by every worker
#[derive(Debug, Clone)]
pub struct Parser {
    config: Arc<ParserConfig>,
    ip_version: IpVersion,
}

impl Parser {
    pub fn new(config: ParserConfig, ip_version: IpVersion) -> Self {
        Self {
            config: Arc::new(config),
            ip_version,
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    /// Parse `text` with the parser for `kind`
    pub fn parse(&self, kind: OutputKind, text: &str) -> Document {
        match kind {
            OutputKind::Status => parse_status(text),
            OutputKind::Protocols => parse_protocols(text, self.ip_version),
            OutputKind::ProtocolsShort => parse_protocols_short(text),
            OutputKind::Symbols => parse_symbols(text, self.config.symbols_multi_value),
            OutputKind::Routes => parse_routes(text, &self.config),
            OutputKind::RouteCount => parse_route_count(text),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(ParserConfig::default(), IpVersion::V4)
    }
}

/// `N of M routes ...` becomes `{"routes": N}`
pub fn parse_route_count(text: &str) -> Document {
    let mut doc = Document::new();
    for line in lines(text, true).filter(|l| !is_special_line(l)) {
        if let Some(caps) = ROUTE_COUNT.captures(line) {
            if let Ok(count) = caps[1].parse::<i64>() {
                doc.insert("routes", count);
            }
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_count() {
        let doc = parse_route_count("BIRD 2.0.7 ready.\n1337 of 4242 routes for 1337 networks in table master4\n");
        assert_eq!(doc.get_int("routes").unwrap(), 1337);
    }

    #[test]
    fn test_route_count_garbage() {
        assert!(parse_route_count("Access restricted\nsyntax error\n").is_empty());
    }

    #[test]
    fn test_dispatch() {
        let parser = Parser::default();
        let doc = parser.parse(OutputKind::RouteCount, "3 of 3 routes for 3 networks\n");
        assert_eq!(doc.get_int("routes").unwrap(), 3);
        let doc = parser.parse(OutputKind::Symbols, "master4 \trouting table\n");
        assert!(doc.get_doc("symbols").is_ok());
    }
}
