//! Field extractors for BIRD console output
//!
//! Every pattern is compiled once on first use and shared by all parsers.

use once_cell::sync::Lazy;
use regex::Regex;

macro_rules! pattern {
    ($(#[$meta:meta])* $name:ident = $re:expr) => {
        $(#[$meta])*
        pub(crate) static $name: Lazy<Regex> =
            Lazy::new(|| Regex::new($re).expect("Invalid regex pattern"));
    };
}

// show status
pattern!(STATUS_VERSION = r"^BIRD\s+v?([0-9\.]+)\s*$");
pattern!(STATUS_ROUTER_ID = r"^Router\s+ID\s+is\s+([0-9\.:a-f]+)\s*$");
pattern!(STATUS_SERVER_TIME = r"^Current\s+server\s+time\s+is\s+([0-9\-]+\s+[0-9\:\.]+)\s*$");
pattern!(STATUS_LAST_REBOOT = r"^Last\s+reboot\s+on\s+([0-9\-]+\s+[0-9\:\.]+)\s*$");
pattern!(STATUS_LAST_RECONFIG = r"^Last\s+reconfiguration\s+on\s+([0-9\-]+\s+[0-9\:\.]+)\s*$");

// show symbols
pattern!(SYMBOL = r"^(\S+)\s+(.+?)\s*$");

// show route ... count
pattern!(ROUTE_COUNT = r"^(\d+)\s+of\s+(\d+)\s+routes.*$");

// show protocols [all]
pattern!(
    /// `name class table state since [info]`, any protocol class
    PROTOCOL_HEADER = r"^([\w\.:\-]+)\s+(\w+)\s+([\w\-]+)\s+(\w+)\s+([0-9]{4}-[0-9]{2}-[0-9]{2}\s+[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?|[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?)\s*(.*?)\s*$"
);
pattern!(PROTOCOL_CHANNEL = r"^\s+Channel\s+ipv([46])\s*$");
pattern!(PROTOCOL_ROUTES = r"^\s+Routes:\s+(.*?)\s*$");
pattern!(
    /// Import/export counters, `---` marks a column that does not apply
    PROTOCOL_COUNTERS = r"^\s+(Import|Export)\s+(updates|withdraws):\s+(\d+|---)\s+(\d+|---)\s+(\d+|---)\s+(\d+|---)\s+(\d+|---)\s*$"
);
pattern!(NUMERIC_VALUE = r"^\s+([^:]+):\s+(\d+)\s*$");
pattern!(STRING_VALUE = r"^\s+([^:]+):\s+(.+?)\s*$");
pattern!(KEY_SEPARATORS = r"[\s\-]+");

// show route ... all
pattern!(
    /// Pre-2.0 route line: prefix, gateway and interface on one line
    ROUTE_LEGACY = r"^([0-9a-f\.\:\/]+)\s+via\s+([0-9a-f\.\:]+)\s+on\s+([\w\.\-]+)\s+\[([\w\.:\-]+)\s+([0-9\-\:\.\s]+)(?:\s+from\s+([0-9a-f\.\:\/]+))?\]\s+(?:(\*)\s+)?\((\d+)(?:/\d+)?\).*$"
);
pattern!(
    /// Pre-2.0 additional path for the previous prefix
    ROUTE_LEGACY_NEXT_PATH = r"^\s+via\s+([0-9a-f\.\:]+)\s+on\s+([\w\.\-]+)\s+\[([\w\.:\-]+)\s+([0-9\-\:\.\s]+)(?:\s+from\s+([0-9a-f\.\:\/]+))?\]\s+(?:(\*)\s+)?\((\d+)(?:/\d+)?\).*$"
);
pattern!(
    /// 2.x route line; an absent prefix means "same network as before"
    ROUTE_CURRENT = r"^([0-9a-f\.\:\/]+)?\s+unicast\s+\[([\w\.:\-]+)\s+([0-9\-\:\.\s]+)(?:\s+from\s+([0-9a-f\.\:\/]+))?\]\s+(?:(\*)\s+)?\((\d+)(?:/\d+)?(?:/[^\)]*)?\).*$"
);
pattern!(ROUTE_CURRENT_GATEWAY = r"^\s+via\s+([0-9a-f\.\:]+)\s+on\s+([\w\.\-]+)\s*$");
pattern!(ROUTE_TYPE = r"^\s+Type:\s+(.*?)\s*$");
pattern!(ROUTE_BGP_ATTRIBUTE = r"^\s+BGP\.(\w+):\s*(.*?)\s*$");

// BGP community lists
pattern!(COMMUNITY = r"\((\d+),\s*(\d+)\)");
pattern!(LARGE_COMMUNITY = r"\((\d+),\s*(\d+),\s*(\d+)\)");
pattern!(EXT_COMMUNITY = r"\(([^,\(\)]+),\s*([^,\(\)]+),\s*([^,\(\)]+)\)");
