//! Parser tests against recorded console output

use pretty_assertions::assert_eq;
use sonic_birdwatcherd::document::{Document, ExtCommunity};
use sonic_birdwatcherd::{IpVersion, OutputKind, Parser, ParserConfig};

const ROUTES_BIRD1: &str = include_str!("fixtures/routes_bird1.txt");
const ROUTES_BIRD2: &str = include_str!("fixtures/routes_bird2.txt");
const PROTOCOLS_BIRD2: &str = include_str!("fixtures/protocols_bird2.txt");
const STATUS_BIRD1: &str = include_str!("fixtures/status_bird1.txt");

fn routes(text: &str, config: ParserConfig) -> Vec<Document> {
    let doc = Parser::new(config, IpVersion::V4).parse(OutputKind::Routes, text);
    doc.get_docs("routes").unwrap().clone()
}

fn networks(routes: &[Document]) -> Vec<&str> {
    routes
        .iter()
        .map(|r| r.get_str("network").unwrap())
        .collect()
}

#[test]
fn test_bird1_routes() {
    let routes = routes(ROUTES_BIRD1, ParserConfig::default());
    assert_eq!(networks(&routes), vec!["1.2.0.0/16", "1.2.0.0/16", "16.0.0.0/24"]);

    let first = &routes[0];
    assert_eq!(first.get_str("gateway").unwrap(), "62.69.150.225");
    assert_eq!(first.get_str("interface").unwrap(), "eno8");
    assert_eq!(first.get_str("from_protocol").unwrap(), "ID8503_AS1340");
    assert_eq!(first.get_str("age").unwrap(), "2018-01-01 12:00:00");
    assert_eq!(first.get_str("learnt_from").unwrap(), "172.31.194.4");
    assert!(first.get_bool("primary").unwrap());
    assert_eq!(first.get_int("metric").unwrap(), 100);
    assert_eq!(
        first.get_strs("type").unwrap(),
        &vec!["BGP".to_string(), "unicast".to_string(), "univ".to_string()]
    );

    let bgp = first.get_doc("bgp").unwrap();
    assert_eq!(bgp.get_str("origin").unwrap(), "IGP");
    assert_eq!(bgp.get_str("med").unwrap(), "0");
    assert_eq!(
        bgp.get_strs("as_path").unwrap(),
        &vec!["1340".to_string(), "31078".to_string()]
    );
    assert_eq!(
        bgp.get_large_communities("large_communities").unwrap(),
        &vec![[9033i64, 65666, 12], [9033, 65666, 9]]
    );
}

#[test]
fn test_bird1_community_continuation_lines() {
    let routes = routes(ROUTES_BIRD1, ParserConfig::default());
    let communities = routes[0]
        .get_doc("bgp")
        .unwrap()
        .get_communities("communities")
        .unwrap();
    assert_eq!(
        communities,
        &vec![
            [0i64, 5464],
            [0, 8339],
            [0, 8741],
            [65101, 11077],
            [65102, 11000]
        ]
    );
}

#[test]
fn test_bird1_second_path() {
    let routes = routes(ROUTES_BIRD1, ParserConfig::default());
    let second = &routes[1];
    assert_eq!(second.get_str("gateway").unwrap(), "62.69.150.226");
    assert_eq!(second.get_str("from_protocol").unwrap(), "ID8497_AS1339");
    assert!(!second.get_bool("primary").unwrap());

    let bgp = second.get_doc("bgp").unwrap();
    assert_eq!(
        bgp.get_ext_communities("ext_communities").unwrap(),
        &vec![
            ExtCommunity::new("rt", "42", "1234"),
            ExtCommunity::new("generic", "0x43000000", "0x1"),
        ]
    );
    assert!(!bgp.contains_key("communities"));
}

#[test]
fn test_bird2_routes() {
    let routes = routes(ROUTES_BIRD2, ParserConfig::default());
    assert_eq!(
        networks(&routes),
        vec!["16.0.0.0/24", "16.0.0.0/24", "200.57.48.0/20"]
    );

    let first = &routes[0];
    assert_eq!(first.get_str("gateway").unwrap(), "1.2.3.16");
    assert_eq!(first.get_str("interface").unwrap(), "eno7");
    assert!(first.get_bool("primary").unwrap());
    assert_eq!(
        first.get_doc("bgp").unwrap().get_communities("communities").unwrap(),
        &vec![[0i64, 5464], [0, 8339]]
    );

    let second = &routes[1];
    assert_eq!(second.get_str("gateway").unwrap(), "1.2.3.17");
    assert_eq!(second.get_str("learnt_from").unwrap(), "172.31.194.5");
    assert!(!second.get_bool("primary").unwrap());

    let third = &routes[2];
    assert_eq!(third.get_int("metric").unwrap(), 100);
    assert!(!third.contains_key("learnt_from"));
    assert_eq!(
        third.get_doc("bgp").unwrap().get_strs("as_path").unwrap().len(),
        3
    );
}

#[test]
fn test_route_order_independent_of_pool_size() {
    let serial = routes(
        ROUTES_BIRD2,
        ParserConfig {
            worker_pool_size: 1,
            ..ParserConfig::default()
        },
    );
    let parallel = routes(
        ROUTES_BIRD2,
        ParserConfig {
            worker_pool_size: 16,
            ..ParserConfig::default()
        },
    );
    assert_eq!(serial, parallel);
}

#[test]
fn test_route_filter_fields() {
    let routes = routes(
        ROUTES_BIRD1,
        ParserConfig {
            filter_fields: vec!["learnt_from".to_string(), "gateway".to_string()],
            ..ParserConfig::default()
        },
    );
    for route in &routes {
        assert!(route.get("gateway").unwrap().is_null());
    }
    assert!(routes[0].get("learnt_from").unwrap().is_null());
    // absent fields stay absent
    assert!(!routes[2].contains_key("learnt_from"));
}

#[test]
fn test_bird2_protocols_ipv4_channel() {
    let parser = Parser::new(ParserConfig::default(), IpVersion::V4);
    let doc = parser.parse(OutputKind::Protocols, PROTOCOLS_BIRD2);
    let protocols = doc.get_doc("protocols").unwrap();
    assert_eq!(protocols.len(), 3);

    let bgp = protocols.get_doc("ID8503_AS1340").unwrap();
    assert_eq!(bgp.get_str("bird_protocol").unwrap(), "BGP");
    assert_eq!(bgp.get_str("connection").unwrap(), "Established");
    assert_eq!(bgp.get_str("table").unwrap(), "master4");
    assert_eq!(bgp.get_int("neighbor_as").unwrap(), 1340);
    assert_eq!(bgp.get_str("bgp_next_hop").unwrap(), "172.31.194.1");
    assert_eq!(bgp.get_doc("routes").unwrap().get_int("imported").unwrap(), 1);

    let changes = bgp.get_doc("route_changes").unwrap();
    let export_updates = changes.get_doc("export_updates").unwrap();
    assert_eq!(export_updates.get_int("filtered").unwrap(), 3);
    assert!(!export_updates.contains_key("ignored"));
    assert_eq!(changes.get_doc("export_withdraws").unwrap().len(), 2);
}

#[test]
fn test_bird2_protocols_ipv6_channel() {
    let parser = Parser::new(ParserConfig::default(), IpVersion::V6);
    let doc = parser.parse(OutputKind::Protocols, PROTOCOLS_BIRD2);
    let bgp = doc
        .get_doc("protocols")
        .unwrap()
        .get_doc("ID8503_AS1340")
        .unwrap();

    assert_eq!(bgp.get_str("table").unwrap(), "master6");
    assert_eq!(bgp.get_doc("routes").unwrap().get_int("imported").unwrap(), 7);
    // counters were only printed for the IPv4 channel
    assert!(!bgp.contains_key("route_changes"));
}

#[test]
fn test_bird2_pipe_and_device() {
    let parser = Parser::default();
    let doc = parser.parse(OutputKind::Protocols, PROTOCOLS_BIRD2);
    let protocols = doc.get_doc("protocols").unwrap();

    let pipe = protocols.get_doc("M8503_AS1340").unwrap();
    assert_eq!(pipe.get_str("peer_table").unwrap(), "T8503_AS1340");
    assert_eq!(pipe.get_doc("routes").unwrap().get_int("exported").unwrap(), 0);

    let device = protocols.get_doc("device1").unwrap();
    let routes = device.get_doc("routes").unwrap();
    assert_eq!(routes.len(), 4);
    assert_eq!(routes.get_int("preferred").unwrap(), 0);
}

#[test]
fn test_protocols_short() {
    let doc = Parser::default().parse(OutputKind::ProtocolsShort, PROTOCOLS_BIRD2);
    let protocols = doc.get_doc("protocols").unwrap();
    let device = protocols.get_doc("device1").unwrap();
    assert_eq!(device.get_str("proto").unwrap(), "Device");
    assert_eq!(device.get_str("since").unwrap(), "2018-01-01 11:59:59");
}

#[test]
fn test_status() {
    let doc = Parser::default().parse(OutputKind::Status, STATUS_BIRD1);
    let status = doc.get_doc("status").unwrap();
    assert_eq!(status.get_str("version").unwrap(), "1.6.3");
    assert_eq!(status.get_str("router_id").unwrap(), "172.31.194.1");
    assert_eq!(status.get_str("current_server").unwrap(), "2018-01-01 12:30:00");
    assert_eq!(status.get_str("last_reboot").unwrap(), "2017-12-24 08:00:00");
    assert_eq!(status.get_str("last_reconfig").unwrap(), "2017-12-31 23:59:59");
    assert_eq!(status.get_str("message").unwrap(), "Daemon is up and running");
}
