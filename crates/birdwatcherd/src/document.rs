//! Parsed console documents
//!
//! Every parser produces a [`Document`]: a string-keyed map of [`Value`]s.
//! The value set is closed so consumers can match on it instead of probing
//! dynamic types, and accessors fail with a typed [`DocumentError`] when a
//! field is missing or holds a different variant.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use thiserror::Error;

/// Standard BGP community `(asn, value)`
pub type Community = [i64; 2];

/// Large BGP community `(global, local1, local2)`
pub type LargeCommunity = [i64; 3];

/// Extended BGP community, e.g. `("rt", "42", "1234")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtCommunity(pub String, pub String, pub String);

impl ExtCommunity {
    pub fn new(kind: impl Into<String>, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self(kind.into(), first.into(), second.into())
    }
}

/// A single document value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Doc(Document),
    Docs(Vec<Document>),
    Strs(Vec<String>),
    Communities(Vec<Community>),
    LargeCommunities(Vec<LargeCommunity>),
    ExtCommunities(Vec<ExtCommunity>),
}

impl Value {
    /// Variant name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Doc(_) => "document",
            Value::Docs(_) => "document list",
            Value::Strs(_) => "string list",
            Value::Communities(_) => "community list",
            Value::LargeCommunities(_) => "large community list",
            Value::ExtCommunities(_) => "extended community list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Doc(doc)
    }
}

impl From<Vec<Document>> for Value {
    fn from(docs: Vec<Document>) -> Self {
        Value::Docs(docs)
    }
}

impl From<Vec<String>> for Value {
    fn from(strs: Vec<String>) -> Self {
        Value::Strs(strs)
    }
}

impl From<Vec<Community>> for Value {
    fn from(communities: Vec<Community>) -> Self {
        Value::Communities(communities)
    }
}

impl From<Vec<LargeCommunity>> for Value {
    fn from(communities: Vec<LargeCommunity>) -> Self {
        Value::LargeCommunities(communities)
    }
}

impl From<Vec<ExtCommunity>> for Value {
    fn from(communities: Vec<ExtCommunity>) -> Self {
        Value::ExtCommunities(communities)
    }
}

/// Typed accessor failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("missing field '{0}'")]
    Missing(String),

    #[error("field '{field}' is a {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// String-keyed map of parsed values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

macro_rules! typed_getter {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $ret:ty, $expected:literal) => {
        $(#[$meta])*
        pub fn $name(&self, key: &str) -> Result<$ret, DocumentError> {
            match self.field(key)? {
                Value::$variant(v) => Ok(v),
                other => Err(DocumentError::TypeMismatch {
                    field: key.to_string(),
                    expected: $expected,
                    found: other.kind(),
                }),
            }
        }
    };
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.0.keys()
    }

    fn field(&self, key: &str) -> Result<&Value, DocumentError> {
        self.0
            .get(key)
            .ok_or_else(|| DocumentError::Missing(key.to_string()))
    }

    pub fn get_str(&self, key: &str) -> Result<&str, DocumentError> {
        match self.field(key)? {
            Value::Str(s) => Ok(s.as_str()),
            other => Err(DocumentError::TypeMismatch {
                field: key.to_string(),
                expected: "string",
                found: other.kind(),
            }),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, DocumentError> {
        match self.field(key)? {
            Value::Int(n) => Ok(*n),
            other => Err(DocumentError::TypeMismatch {
                field: key.to_string(),
                expected: "integer",
                found: other.kind(),
            }),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, DocumentError> {
        match self.field(key)? {
            Value::Bool(b) => Ok(*b),
            other => Err(DocumentError::TypeMismatch {
                field: key.to_string(),
                expected: "bool",
                found: other.kind(),
            }),
        }
    }

    typed_getter!(
        /// Nested document
        get_doc, Doc, &Document, "document"
    );
    typed_getter!(get_docs, Docs, &Vec<Document>, "document list");
    typed_getter!(get_strs, Strs, &Vec<String>, "string list");
    typed_getter!(get_communities, Communities, &Vec<Community>, "community list");
    typed_getter!(
        get_large_communities,
        LargeCommunities,
        &Vec<LargeCommunity>,
        "large community list"
    );
    typed_getter!(
        get_ext_communities,
        ExtCommunities,
        &Vec<ExtCommunity>,
        "extended community list"
    );

    /// Set every listed field to null, present or not
    pub fn null_fields<S: AsRef<str>>(&mut self, fields: &[S]) {
        for field in fields {
            self.0.insert(field.as_ref().to_string(), Value::Null);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
