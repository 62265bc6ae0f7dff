//! `show status` parser

use crate::document::Document;
use crate::lines::{is_special_line, lines};
use crate::patterns::{
    STATUS_LAST_REBOOT, STATUS_LAST_RECONFIG, STATUS_ROUTER_ID, STATUS_SERVER_TIME,
    STATUS_VERSION,
};

/// Parse daemon status into `{"status": {...}}`
///
/// Lines matching none of the known fields become `message`; the last one
/// wins.
pub fn parse_status(text: &str) -> Document {
    let mut status = Document::new();

    for line in lines(text, true) {
        if let Some(caps) = STATUS_VERSION.captures(line) {
            status.insert("version", &caps[1]);
        } else if is_special_line(line) {
            continue;
        } else if let Some(caps) = STATUS_ROUTER_ID.captures(line) {
            status.insert("router_id", &caps[1]);
        } else if let Some(caps) = STATUS_SERVER_TIME.captures(line) {
            status.insert("current_server", &caps[1]);
        } else if let Some(caps) = STATUS_LAST_REBOOT.captures(line) {
            status.insert("last_reboot", &caps[1]);
        } else if let Some(caps) = STATUS_LAST_RECONFIG.captures(line) {
            status.insert("last_reconfig", &caps[1]);
        } else {
            status.insert("message", line.trim());
        }
    }

    let mut doc = Document::new();
    doc.insert("status", status);
    doc
}

/// Major version from a status document, 0 when unknown
pub fn major_version(doc: &Document) -> u32 {
    doc.get_doc("status")
        .and_then(|status| status.get_str("version"))
        .ok()
        .and_then(|version| version.chars().next())
        .and_then(|c| c.to_digit(10))
        .unwrap_or(0)
}
