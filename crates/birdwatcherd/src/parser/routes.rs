//! `show route ... all` parser
//!
//! Handles both console generations:
//!
//! ```text
//! 1.x: 16.0.0.0/24  via 1.2.3.16 on eno7 [ID8503_AS1340 2018-01-01 12:00:00] * (100) [AS1340i]
//! 2.x: 16.0.0.0/24  unicast [ID8503_AS1340 2018-01-01 12:00:00] * (100) [AS1340i]
//!          via 1.2.3.16 on eno7
//! ```
//!
//! followed by indented `Type:` and `BGP.<attribute>:` lines. Community lists
//! too long for one line continue on lines starting with two tabs.

use super::pool::parse_blocks;
use crate::config::ParserConfig;
use crate::document::{Community, Document, ExtCommunity, LargeCommunity};
use crate::lines::is_special_line;
use crate::patterns::{
    COMMUNITY, EXT_COMMUNITY, LARGE_COMMUNITY, ROUTE_BGP_ATTRIBUTE, ROUTE_CURRENT,
    ROUTE_CURRENT_GATEWAY, ROUTE_LEGACY, ROUTE_LEGACY_NEXT_PATH, ROUTE_TYPE,
};

const CONTINUATION_PREFIX: &str = "\t\t";

/// Parse route listings into `{"routes": [...]}`, in console order
pub fn parse_routes(text: &str, config: &ParserConfig) -> Document {
    let filter_fields = config.filter_fields.as_slice();
    let routes = parse_blocks(text, config.worker_pool_size, |block| {
        parse_block(block, filter_fields)
    });

    let mut doc = Document::new();
    doc.insert("routes", routes);
    doc
}

/// Fields shared by every route-opening line
struct RouteHeader<'a> {
    network: String,
    gateway: Option<(&'a str, &'a str)>,
    from_protocol: &'a str,
    age: &'a str,
    learnt_from: Option<&'a str>,
    primary: bool,
    metric: &'a str,
}

#[derive(Default)]
struct RouteRecord {
    fields: Document,
    bgp: Option<Document>,
}

impl RouteRecord {
    fn open(header: RouteHeader<'_>) -> Self {
        let mut fields = Document::new();
        fields.insert("network", header.network);
        if let Some((gateway, interface)) = header.gateway {
            fields.insert("gateway", gateway);
            fields.insert("interface", interface);
        }
        fields.insert("from_protocol", header.from_protocol);
        fields.insert("age", header.age.trim());
        if let Some(learnt_from) = header.learnt_from {
            fields.insert("learnt_from", learnt_from);
        }
        fields.insert("primary", header.primary);
        if let Ok(metric) = header.metric.parse::<i64>() {
            fields.insert("metric", metric);
        }
        Self { fields, bgp: None }
    }

    fn bgp(&mut self) -> &mut Document {
        self.bgp.get_or_insert_with(Document::new)
    }

    fn finish<S: AsRef<str>>(mut self, filter_fields: &[S]) -> Document {
        if let Some(bgp) = self.bgp {
            self.fields.insert("bgp", bgp);
        }
        let present: Vec<&str> = filter_fields
            .iter()
            .map(AsRef::as_ref)
            .filter(|f| self.fields.contains_key(f))
            .collect();
        self.fields.null_fields(&present);
        self.fields
    }
}

struct BlockParser<'f, S> {
    filter_fields: &'f [S],
    routes: Vec<Document>,
    current: Option<RouteRecord>,
    last_network: Option<String>,
}

impl<S: AsRef<str>> BlockParser<'_, S> {
    fn flush(&mut self) {
        if let Some(record) = self.current.take() {
            if !record.fields.is_empty() || record.bgp.is_some() {
                self.routes.push(record.finish(self.filter_fields));
            }
        }
    }

    fn open(&mut self, header: RouteHeader<'_>) {
        self.flush();
        self.last_network = Some(header.network.clone());
        self.current = Some(RouteRecord::open(header));
    }

    /// Lines seen before any route line still produce a (partial) record
    fn record(&mut self) -> &mut RouteRecord {
        self.current.get_or_insert_with(RouteRecord::default)
    }
}

/// Parse one block; blocks never share state
pub(crate) fn parse_block<S: AsRef<str>>(block: &[&str], filter_fields: &[S]) -> Vec<Document> {
    let mut parser = BlockParser {
        filter_fields,
        routes: Vec::new(),
        current: None,
        last_network: None,
    };

    let mut i = 0;
    while i < block.len() {
        let line = block[i];
        i += 1;

        if is_special_line(line) {
            continue;
        }

        if let Some(caps) = ROUTE_CURRENT.captures(line) {
            let network = match caps.get(1) {
                Some(prefix) => prefix.as_str().to_string(),
                None => parser.last_network.clone().unwrap_or_default(),
            };
            parser.open(RouteHeader {
                network,
                gateway: None,
                from_protocol: caps.get(2).map_or("", |m| m.as_str()),
                age: caps.get(3).map_or("", |m| m.as_str()),
                learnt_from: caps.get(4).map(|m| m.as_str()),
                primary: caps.get(5).is_some(),
                metric: caps.get(6).map_or("", |m| m.as_str()),
            });
        } else if let Some(caps) = ROUTE_LEGACY.captures(line) {
            parser.open(RouteHeader {
                network: caps[1].to_string(),
                gateway: Some((caps.get(2).map_or("", |m| m.as_str()), caps.get(3).map_or("", |m| m.as_str()))),
                from_protocol: caps.get(4).map_or("", |m| m.as_str()),
                age: caps.get(5).map_or("", |m| m.as_str()),
                learnt_from: caps.get(6).map(|m| m.as_str()),
                primary: caps.get(7).is_some(),
                metric: caps.get(8).map_or("", |m| m.as_str()),
            });
        } else if let Some(caps) = ROUTE_CURRENT_GATEWAY.captures(line) {
            let fields = &mut parser.record().fields;
            fields.insert("gateway", &caps[1]);
            fields.insert("interface", &caps[2]);
        } else if let Some(caps) = ROUTE_LEGACY_NEXT_PATH.captures(line) {
            let Some(network) = parser.last_network.clone() else {
                continue;
            };
            parser.open(RouteHeader {
                network,
                gateway: Some((caps.get(1).map_or("", |m| m.as_str()), caps.get(2).map_or("", |m| m.as_str()))),
                from_protocol: caps.get(3).map_or("", |m| m.as_str()),
                age: caps.get(4).map_or("", |m| m.as_str()),
                learnt_from: caps.get(5).map(|m| m.as_str()),
                primary: caps.get(6).is_some(),
                metric: caps.get(7).map_or("", |m| m.as_str()),
            });
        } else if let Some(caps) = ROUTE_TYPE.captures(line) {
            let types: Vec<String> = caps[1].split_whitespace().map(String::from).collect();
            parser.record().fields.insert("type", types);
        } else if let Some(caps) = ROUTE_BGP_ATTRIBUTE.captures(line) {
            let attribute = &caps[1];
            let mut value = caps[2].to_string();
            if is_community_attribute(attribute) {
                while i < block.len() && block[i].starts_with(CONTINUATION_PREFIX) {
                    value.push(' ');
                    value.push_str(block[i].trim());
                    i += 1;
                }
            }
            set_bgp_attribute(parser.record().bgp(), attribute, &value);
        }
    }

    parser.flush();
    parser.routes
}

fn is_community_attribute(attribute: &str) -> bool {
    matches!(attribute, "community" | "large_community" | "ext_community")
}

fn set_bgp_attribute(bgp: &mut Document, attribute: &str, value: &str) {
    match attribute {
        "community" => {
            bgp.insert("communities", parse_communities(value));
        }
        "large_community" => {
            bgp.insert("large_communities", parse_large_communities(value));
        }
        "ext_community" => {
            bgp.insert("ext_communities", parse_ext_communities(value));
        }
        "as_path" => {
            let path: Vec<String> = value.split_whitespace().map(String::from).collect();
            bgp.insert("as_path", path);
        }
        _ => {
            bgp.insert(attribute, value);
        }
    }
}

/// `(0,5464) (0,8339)`
pub fn parse_communities(value: &str) -> Vec<Community> {
    COMMUNITY
        .captures_iter(value)
        .filter_map(|caps| Some([caps[1].parse().ok()?, caps[2].parse().ok()?]))
        .collect()
}

/// `(9033, 65666, 12) (9033, 65666, 9)`
pub fn parse_large_communities(value: &str) -> Vec<LargeCommunity> {
    LARGE_COMMUNITY
        .captures_iter(value)
        .filter_map(|caps| {
            Some([
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            ])
        })
        .collect()
}

/// `(rt, 42, 1234) (generic, 0x43000000, 0x1)`
pub fn parse_ext_communities(value: &str) -> Vec<ExtCommunity> {
    EXT_COMMUNITY
        .captures_iter(value)
        .map(|caps| ExtCommunity::new(caps[1].trim(), caps[2].trim(), caps[3].trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Vec<Document> {
        let config = ParserConfig {
            worker_pool_size: 2,
            ..ParserConfig::default()
        };
        parse_routes(text, &config)
            .get_docs("routes")
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn test_legacy_route_with_second_path() {
        let text = "BIRD 1.6.3 ready.
200.0.0.0/24       via 1.2.3.15 on eno7 [ID8497_AS1339 2018-01-01 12:00:00] * (100) [AS1339i]
\tType: BGP unicast univ
\tBGP.origin: IGP
\tBGP.as_path: 1339 31078
\tBGP.local_pref: 100
                   via 1.2.3.16 on eno8 [ID8503_AS1340 2018-01-01 12:00:01 from 1.2.3.99] (90) [AS1340i]
\tType: BGP unicast univ
\tBGP.as_path: 1340
";
        let routes = parse(text);
        assert_eq!(routes.len(), 2);

        let first = &routes[0];
        assert_eq!(first.get_str("network").unwrap(), "200.0.0.0/24");
        assert_eq!(first.get_str("gateway").unwrap(), "1.2.3.15");
        assert_eq!(first.get_str("interface").unwrap(), "eno7");
        assert_eq!(first.get_str("from_protocol").unwrap(), "ID8497_AS1339");
        assert_eq!(first.get_str("age").unwrap(), "2018-01-01 12:00:00");
        assert!(first.get_bool("primary").unwrap());
        assert_eq!(first.get_int("metric").unwrap(), 100);
        assert!(!first.contains_key("learnt_from"));
        assert_eq!(
            first.get_strs("type").unwrap(),
            &vec!["BGP".to_string(), "unicast".to_string(), "univ".to_string()]
        );
        let bgp = first.get_doc("bgp").unwrap();
        assert_eq!(bgp.get_str("local_pref").unwrap(), "100");
        assert_eq!(bgp.get_strs("as_path").unwrap().len(), 2);

        let second = &routes[1];
        assert_eq!(second.get_str("network").unwrap(), "200.0.0.0/24");
        assert_eq!(second.get_str("gateway").unwrap(), "1.2.3.16");
        assert_eq!(second.get_str("learnt_from").unwrap(), "1.2.3.99");
        assert!(!second.get_bool("primary").unwrap());
        assert_eq!(second.get_int("metric").unwrap(), 90);
    }

    #[test]
    fn test_current_route_inherits_prefix() {
        let text = "Table master4:
16.0.0.0/24          unicast [ID8503_AS1340 2018-01-01 12:00:00] * (100) [AS1340i]
\tvia 1.2.3.16 on eno7
\tType: BGP univ
                     unicast [ID8497_AS1339 2018-01-01 12:00:00 from 1.2.3.15] (100/-) [AS1339i]
\tvia 1.2.3.15 on eno7
\tType: BGP univ
";
        let routes = parse(text);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].get_str("gateway").unwrap(), "1.2.3.16");
        assert_eq!(routes[1].get_str("network").unwrap(), "16.0.0.0/24");
        assert_eq!(routes[1].get_str("interface").unwrap(), "eno7");
        assert_eq!(routes[1].get_str("learnt_from").unwrap(), "1.2.3.15");
    }

    #[test]
    fn test_community_continuation_lines() {
        let text = "10.0.0.0/8  via 1.1.1.1 on eth0 [bgp1 12:00:00] * (100) [AS1i]
\tBGP.community: (0,5464) (0,8339)
\t\t(0,8741) (0,23106)
\tBGP.large_community: (9033, 65666, 12)
\t\t(9033, 65666, 9)
\tBGP.ext_community: (rt, 42, 1234) (generic, 0x43000000, 0x1)
\t\t(unknown 0x4300, 0, 1)
";
        let routes = parse(text);
        let bgp = routes[0].get_doc("bgp").unwrap();
        assert_eq!(
            bgp.get_communities("communities").unwrap(),
            &vec![[0i64, 5464], [0, 8339], [0, 8741], [0, 23106]]
        );
        assert_eq!(
            bgp.get_large_communities("large_communities").unwrap(),
            &vec![[9033i64, 65666, 12], [9033, 65666, 9]]
        );
        assert_eq!(
            bgp.get_ext_communities("ext_communities").unwrap(),
            &vec![
                ExtCommunity::new("rt", "42", "1234"),
                ExtCommunity::new("generic", "0x43000000", "0x1"),
                ExtCommunity::new("unknown 0x4300", "0", "1"),
            ]
        );
    }

    #[test]
    fn test_filter_fields_null_out() {
        let text = "10.0.0.0/8  via 1.1.1.1 on eth0 [bgp1 12:00:00] * (100) [AS1i]\n";
        let config = ParserConfig {
            filter_fields: vec!["gateway".to_string(), "nonexistent".to_string()],
            ..ParserConfig::default()
        };
        let doc = parse_routes(text, &config);
        let route = &doc.get_docs("routes").unwrap()[0];
        assert_eq!(route.get("gateway"), Some(&Value::Null));
        assert!(!route.contains_key("nonexistent"));
    }

    #[test]
    fn test_block_without_header_is_partial() {
        let routes = parse_block(&["  \tType: static univ"], &[] as &[&str]);
        assert_eq!(routes.len(), 1);
        assert!(!routes[0].contains_key("network"));
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(parse("Access restricted\nsyntax error, unexpected CF_SYM_UNDEFINED\n").is_empty());
    }
}
