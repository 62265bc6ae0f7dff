//! `show protocols` and `show protocols all` parsers
//!
//! Detailed output is split into one paragraph per protocol. Each line of a
//! paragraph is offered to an ordered chain of handlers; the first handler
//! that recognizes the line consumes it.

use crate::config::IpVersion;
use crate::document::{Document, Value};
use crate::lines::{is_blank, is_special_line, lines};
use crate::patterns::{
    KEY_SEPARATORS, NUMERIC_VALUE, PROTOCOL_CHANNEL, PROTOCOL_COUNTERS, PROTOCOL_HEADER,
    PROTOCOL_ROUTES, STRING_VALUE,
};
use std::collections::BTreeMap;

/// Counter columns, in console order
const COUNTER_COLUMNS: [&str; 5] = ["received", "rejected", "filtered", "ignored", "accepted"];

/// Zero-filled when the console prints no `Routes:` line
const ROUTE_SUMMARY_FIELDS: [&str; 4] = ["accepted", "filtered", "exported", "preferred"];

#[derive(Default)]
struct ProtocolState {
    protocol: Document,
    routes: Option<Document>,
    route_changes: Document,
}

type LineHandler = fn(&str, &mut ProtocolState) -> bool;

const HANDLERS: [LineHandler; 5] = [
    handle_header,
    handle_routes_summary,
    handle_counters,
    handle_numeric,
    handle_string,
];

/// Parse `show protocols all` into `{"protocols": {name: {...}}}`
///
/// Per-channel sections for the other IP version are ignored.
pub fn parse_protocols(text: &str, ip_version: IpVersion) -> Document {
    let mut protocols = Document::new();

    for paragraph in paragraphs(text) {
        if let Some((name, protocol)) = parse_protocol(&paragraph, ip_version) {
            protocols.insert(name, protocol);
        }
    }

    let mut doc = Document::new();
    doc.insert("protocols", protocols);
    doc
}

fn paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in lines(text, false) {
        if is_blank(line) {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn parse_protocol(paragraph: &[&str], ip_version: IpVersion) -> Option<(String, Document)> {
    let mut state = ProtocolState::default();
    let mut in_other_channel = false;

    for line in paragraph.iter().copied() {
        if is_special_line(line) {
            continue;
        }
        if let Some(caps) = PROTOCOL_CHANNEL.captures(line) {
            in_other_channel = &caps[1] != ip_version.as_str();
            continue;
        }
        if in_other_channel {
            continue;
        }
        for handler in HANDLERS {
            if handler(line, &mut state) {
                break;
            }
        }
    }

    let name = state.protocol.get_str("protocol").ok()?.to_string();
    let routes = state.routes.unwrap_or_else(|| {
        ROUTE_SUMMARY_FIELDS
            .iter()
            .map(|field| (*field, 0i64))
            .collect()
    });
    state.protocol.insert("routes", routes);
    if !state.route_changes.is_empty() {
        state.protocol.insert("route_changes", state.route_changes);
    }
    Some((name, state.protocol))
}

fn handle_header(line: &str, state: &mut ProtocolState) -> bool {
    let Some(caps) = PROTOCOL_HEADER.captures(line) else {
        return false;
    };
    let class = &caps[2];
    let connection = &caps[6];

    let protocol = &mut state.protocol;
    protocol.insert("protocol", &caps[1]);
    protocol.insert("bird_protocol", class);
    protocol.insert("table", &caps[3]);
    protocol.insert("state", &caps[4]);
    protocol.insert("state_changed", &caps[5]);
    protocol.insert("connection", connection);

    if class == "Pipe" {
        if let Some(peer_table) = pipe_peer_table(connection) {
            protocol.insert("peer_table", peer_table);
        }
    }
    true
}

/// `=> T1` (1.x) or `master4 <=> T1` (2.x)
fn pipe_peer_table(connection: &str) -> Option<&str> {
    connection
        .strip_prefix("=> ")
        .or_else(|| connection.split_once("<=> ").map(|(_, table)| table))
        .map(str::trim)
        .filter(|table| !table.is_empty())
}

fn handle_routes_summary(line: &str, state: &mut ProtocolState) -> bool {
    let Some(caps) = PROTOCOL_ROUTES.captures(line) else {
        return false;
    };
    let mut routes = Document::new();
    // "1 imported, 0 filtered, 2 exported, 1 preferred"
    for part in caps[1].split(',') {
        let mut tokens = part.split_whitespace();
        if let (Some(count), Some(kind)) = (tokens.next(), tokens.next()) {
            if let Ok(count) = count.parse::<i64>() {
                routes.insert(kind, count);
            }
        }
    }
    state.routes = Some(routes);
    true
}

fn handle_counters(line: &str, state: &mut ProtocolState) -> bool {
    let Some(caps) = PROTOCOL_COUNTERS.captures(line) else {
        return false;
    };
    let key = format!("{}_{}", caps[1].to_lowercase(), &caps[2]);
    let mut counters = Document::new();
    for (i, column) in COUNTER_COLUMNS.iter().enumerate() {
        if let Ok(value) = caps[i + 3].parse::<i64>() {
            counters.insert(*column, value);
        }
    }
    state.route_changes.insert(key, counters);
    true
}

fn handle_numeric(line: &str, state: &mut ProtocolState) -> bool {
    let Some(caps) = NUMERIC_VALUE.captures(line) else {
        return false;
    };
    let Ok(value) = caps[2].parse::<i64>() else {
        return false;
    };
    state.protocol.insert(field_key(&caps[1]), value);
    true
}

fn handle_string(line: &str, state: &mut ProtocolState) -> bool {
    let Some(caps) = STRING_VALUE.captures(line) else {
        return false;
    };
    state.protocol.insert(field_key(&caps[1]), &caps[2]);
    true
}

/// "Neighbor address" -> "neighbor_address"
fn field_key(label: &str) -> String {
    KEY_SEPARATORS
        .replace_all(label.trim(), "_")
        .to_lowercase()
}

/// Parse `show protocols` into `{"protocols": {name: {proto, table, state, since, info}}}`
pub fn parse_protocols_short(text: &str) -> Document {
    let mut protocols = Document::new();

    for line in lines(text, true).filter(|l| !is_special_line(l)) {
        let Some(caps) = PROTOCOL_HEADER.captures(line) else {
            continue;
        };
        let mut protocol = Document::new();
        protocol.insert("proto", &caps[2]);
        protocol.insert("table", &caps[3]);
        protocol.insert("state", &caps[4]);
        protocol.insert("since", &caps[5]);
        protocol.insert("info", &caps[6]);
        protocols.insert(&caps[1], protocol);
    }

    let mut doc = Document::new();
    doc.insert("protocols", protocols);
    doc
}

/// Group parsed protocols by class: `{"bird_protocol": {"BGP": {name: {...}}}}`
pub fn index_by_class(protocols: &Document) -> Document {
    let mut classes: BTreeMap<String, Document> = BTreeMap::new();

    if let Ok(all) = protocols.get_doc("protocols") {
        for (name, value) in all {
            let Value::Doc(protocol) = value else {
                continue;
            };
            let class = protocol.get_str("bird_protocol").unwrap_or("unknown");
            classes
                .entry(class.to_string())
                .or_default()
                .insert(name.clone(), protocol.clone());
        }
    }

    let mut index = Document::new();
    index.insert("bird_protocol", classes.into_iter().collect::<Document>());
    index
}

/// Protocols of one class from an index built by [`index_by_class`]
pub fn protocols_of_class(index: &Document, class: &str) -> Document {
    index
        .get_doc("bird_protocol")
        .and_then(|classes| classes.get_doc(class))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROTOCOLS_LEGACY: &str = "BIRD 1.6.3 ready.
name     proto    table    state  since       info
ID8497_AS1339 BGP      master   up     2018-01-01 12:00:00  Established
  Description:    Peer AS1339
  Preference:     100
  Input filter:   ACCEPT
  Output filter:  REJECT
  Routes:         1 imported, 0 filtered, 2 exported, 1 preferred
  Route change stats:     received   rejected   filtered    ignored   accepted
    Import updates:              2          0          0          0          2
    Import withdraws:            0          0        ---          0          0
    Export updates:              6          2          0        ---          4
    Export withdraws:            0        ---        ---        ---          0
  BGP state:          Established
    Neighbor address: 10.0.0.2
    Neighbor AS:      1339

M8497_AS1339 Pipe     master   up     2018-01-01 12:00:00  => T8497_AS1339
  Preference:     70
  Input filter:   ACCEPT

kernel1  Kernel   master   up     2018-01-01 12:00:00
";

    #[test]
    fn test_parse_protocols() {
        let doc = parse_protocols(PROTOCOLS_LEGACY, IpVersion::V4);
        let protocols = doc.get_doc("protocols").unwrap();
        assert_eq!(protocols.len(), 3);

        let bgp = protocols.get_doc("ID8497_AS1339").unwrap();
        assert_eq!(bgp.get_str("bird_protocol").unwrap(), "BGP");
        assert_eq!(bgp.get_str("state").unwrap(), "up");
        assert_eq!(bgp.get_str("connection").unwrap(), "Established");
        assert_eq!(bgp.get_str("description").unwrap(), "Peer AS1339");
        assert_eq!(bgp.get_int("preference").unwrap(), 100);
        assert_eq!(bgp.get_str("neighbor_address").unwrap(), "10.0.0.2");
        assert_eq!(bgp.get_int("neighbor_as").unwrap(), 1339);

        let routes = bgp.get_doc("routes").unwrap();
        assert_eq!(routes.get_int("imported").unwrap(), 1);
        assert_eq!(routes.get_int("exported").unwrap(), 2);
    }

    #[test]
    fn test_counters_omit_dashes() {
        let doc = parse_protocols(PROTOCOLS_LEGACY, IpVersion::V4);
        let bgp = doc.get_doc("protocols").unwrap().get_doc("ID8497_AS1339").unwrap();
        let changes = bgp.get_doc("route_changes").unwrap();

        let import_updates = changes.get_doc("import_updates").unwrap();
        assert_eq!(import_updates.len(), 5);
        assert_eq!(import_updates.get_int("accepted").unwrap(), 2);

        let import_withdraws = changes.get_doc("import_withdraws").unwrap();
        assert!(!import_withdraws.contains_key("filtered"));
        assert_eq!(import_withdraws.len(), 4);

        let export_withdraws = changes.get_doc("export_withdraws").unwrap();
        let keys: Vec<&String> = export_withdraws.keys().collect();
        assert_eq!(keys, vec!["accepted", "received"]);
    }

    #[test]
    fn test_pipe_peer_table_and_default_routes() {
        let doc = parse_protocols(PROTOCOLS_LEGACY, IpVersion::V4);
        let protocols = doc.get_doc("protocols").unwrap();

        let pipe = protocols.get_doc("M8497_AS1339").unwrap();
        assert_eq!(pipe.get_str("peer_table").unwrap(), "T8497_AS1339");

        let kernel = protocols.get_doc("kernel1").unwrap();
        assert_eq!(kernel.get_str("connection").unwrap(), "");
        assert_eq!(kernel.get_doc("routes").unwrap().get_int("preferred").unwrap(), 0);
        assert!(!kernel.contains_key("route_changes"));
    }

    #[test]
    fn test_channel_filter() {
        let text = "bgp1       BGP        ---        up     2020-01-01 12:00:00  Established
  BGP state:          Established
  Channel ipv4
    State:          UP
    Routes:         5 imported, 3 exported, 5 preferred
  Channel ipv6
    State:          DOWN
    Routes:         7 imported, 1 exported, 0 preferred
";
        let v4 = parse_protocols(text, IpVersion::V4);
        let bgp = v4.get_doc("protocols").unwrap().get_doc("bgp1").unwrap();
        assert_eq!(bgp.get_doc("routes").unwrap().get_int("imported").unwrap(), 5);
        assert_eq!(bgp.get_str("state").unwrap(), "UP");

        let v6 = parse_protocols(text, IpVersion::V6);
        let bgp = v6.get_doc("protocols").unwrap().get_doc("bgp1").unwrap();
        assert_eq!(bgp.get_doc("routes").unwrap().get_int("imported").unwrap(), 7);
        assert_eq!(bgp.get_str("state").unwrap(), "DOWN");
    }

    #[test]
    fn test_parse_protocols_short() {
        let doc = parse_protocols_short(PROTOCOLS_LEGACY);
        let protocols = doc.get_doc("protocols").unwrap();
        assert_eq!(protocols.len(), 3);
        let pipe = protocols.get_doc("M8497_AS1339").unwrap();
        assert_eq!(pipe.get_str("proto").unwrap(), "Pipe");
        assert_eq!(pipe.get_str("since").unwrap(), "2018-01-01 12:00:00");
        assert_eq!(pipe.get_str("info").unwrap(), "=> T8497_AS1339");
    }

    #[test]
    fn test_index_by_class() {
        let doc = parse_protocols(PROTOCOLS_LEGACY, IpVersion::V4);
        let index = index_by_class(&doc);

        let bgp = protocols_of_class(&index, "BGP");
        assert_eq!(bgp.keys().collect::<Vec<_>>(), vec!["ID8497_AS1339"]);
        assert_eq!(protocols_of_class(&index, "Pipe").len(), 1);
        assert!(protocols_of_class(&index, "OSPF").is_empty());
    }
}
