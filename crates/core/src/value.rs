//! The literal value type stored on attribute and boolean-flag vertices
//!
//! `Value` is a tagged union rather than an open-ended `serde_json::Value`:
//! callers (and the schema cache) can ask a value for its [`ValueKind`]
//! without matching on the payload, which keeps schema-compatibility checks
//! and wire encoding symmetric.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// The kind of a [`Value`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// UTF-8 text.
    Text,
    /// A 64-bit signed integer.
    Int,
    /// A boolean.
    Bool,
    /// An ordered list of values.
    List,
    /// Arbitrary structured JSON.
    Json,
    /// An IPv4 or IPv6 address.
    Ip,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Text => "text",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
            ValueKind::List => "list",
            ValueKind::Json => "json",
            ValueKind::Ip => "ip",
        };
        write!(f, "{s}")
    }
}

/// A literal value attached to an `AttributeValue` or `Boolean` vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Value {
    /// UTF-8 text.
    Text(String),
    /// A 64-bit signed integer.
    Int(i64),
    /// A boolean.
    Bool(bool),
    /// An ordered, homogeneously-kinded list of values.
    List(Vec<Value>),
    /// Arbitrary structured JSON, for schema-less attributes.
    Json(serde_json::Value),
    /// An IPv4 or IPv6 address.
    Ip(IpAddr),
}

impl Value {
    /// The kind tag for this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
            Value::List(_) => ValueKind::List,
            Value::Json(_) => ValueKind::Json,
            Value::Ip(_) => ValueKind::Ip,
        }
    }

    /// If this is a list, whether every element shares a single kind.
    ///
    /// An empty list is trivially homogeneous.
    pub fn is_homogeneous_list(&self) -> bool {
        match self {
            Value::List(items) => {
                let mut kinds = items.iter().map(Value::kind);
                match kinds.next() {
                    None => true,
                    Some(first) => kinds.all(|k| k == first),
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Json(v) => write!(f, "{v}"),
            Value::Ip(addr) => write!(f, "{addr}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<IpAddr> for Value {
    fn from(addr: IpAddr) -> Self {
        Value::Ip(addr)
    }
}
