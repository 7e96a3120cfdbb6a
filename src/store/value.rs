use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A typed value held by a [`super::KeyValueStore`] or
/// [`super::StoreInterface`] group.
///
/// Different-typed entries under the same key are never coalesced: setting
/// a `Bool` under `"x"` and then an `Int` under `"x"` leaves only the
/// `Int` — the prior entry is fully replaced, not merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean flag.
    Bool(bool),
    /// A signed 32-bit integer.
    Int(i32),
    /// An unsigned 32-bit integer.
    Uint(u32),
    /// A double-precision float.
    Double(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list of strings.
    Strings(Vec<String>),
    /// A string-to-string map.
    Stringmap(HashMap<String, String>),
}

impl Value {
    /// Returns the `bool` payload, if this value holds one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the `i32` payload, if this value holds one.
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the `u32` payload, if this value holds one.
    #[must_use]
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the `f64` payload, if this value holds one.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the `&str` payload, if this value holds one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the `&[String]` payload, if this value holds one.
    #[must_use]
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Value::Strings(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the `&HashMap<String, String>` payload, if this value holds
    /// one.
    #[must_use]
    pub fn as_stringmap(&self) -> Option<&HashMap<String, String>> {
        match self {
            Value::Stringmap(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

impl From<HashMap<String, String>> for Value {
    fn from(v: HashMap<String, String>) -> Self {
        Value::Stringmap(v)
    }
}
