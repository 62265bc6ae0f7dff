//! `show symbols` parser

use crate::document::{Document, Value};
use crate::lines::{is_special_line, lines};
use crate::patterns::SYMBOL;
use std::collections::BTreeMap;

/// Parse symbol definitions into `{"symbols": ...}`
///
/// Single-value mode maps each name to its kind, later duplicates winning.
/// Multi-value mode maps each kind to every name defined with it.
pub fn parse_symbols(text: &str, multi_value: bool) -> Document {
    let definitions = lines(text, true)
        .filter(|l| !is_special_line(l))
        .filter_map(|line| SYMBOL.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()));

    let symbols: Document = if multi_value {
        let mut by_kind: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, kind) in definitions {
            by_kind.entry(kind).or_default().push(name);
        }
        by_kind.into_iter().collect()
    } else {
        definitions.collect()
    };

    let mut doc = Document::new();
    doc.insert("symbols", symbols);
    doc
}

/// Names of every symbol of `kind`, whichever mode produced the document
pub fn names_of_kind(doc: &Document, kind: &str) -> Vec<String> {
    let Ok(symbols) = doc.get_doc("symbols") else {
        return Vec::new();
    };
    match symbols.get(kind) {
        Some(Value::Strs(names)) => names.clone(),
        _ => symbols
            .iter()
            .filter(|(_, v)| matches!(v, Value::Str(k) if k == kind))
            .map(|(name, _)| name.clone())
            .collect(),
    }
}
