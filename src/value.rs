//! # Value Type System
//!
//! `ConditionValue` is the tagged variant used everywhere a rule condition
//! or an event attribute carries a scalar or list payload, before it has
//! been dictionary-encoded. It mirrors the closed set named in the
//! specification: integer, float, string, boolean, list, null.
//!
//! ## Usage
//!
//! ```rust
//! use helios::value::ConditionValue;
//!
//! let v = ConditionValue::Str("US".to_string());
//! assert_eq!(v.type_name(), "string");
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Scalar or list value carried by a rule condition or an event attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Integer(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<ConditionValue>),
    #[serde(skip)]
    Null,
}

impl ConditionValue {
    /// Human-readable type tag, used in validation error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConditionValue::Integer(_) => "integer",
            ConditionValue::Float(_) => "float",
            ConditionValue::Str(_) => "string",
            ConditionValue::Bool(_) => "boolean",
            ConditionValue::List(_) => "list",
            ConditionValue::Null => "null",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ConditionValue::Integer(_) | ConditionValue::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConditionValue::Integer(i) => Some(*i as f64),
            ConditionValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConditionValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConditionValue]> {
        match self {
            ConditionValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConditionValue::Null)
    }

    /// Uppercase string values in place; lists recurse element-wise.
    /// Used by the canonicalizer for case-insensitive equality semantics.
    pub fn canonicalize_case(self) -> ConditionValue {
        match self {
            ConditionValue::Str(s) => ConditionValue::Str(s.to_uppercase()),
            ConditionValue::List(items) => ConditionValue::List(
                items.into_iter().map(ConditionValue::canonicalize_case).collect(),
            ),
            other => other,
        }
    }

    /// Canonical string form, used as a dictionary key. Numbers are
    /// formatted with a stable representation so `1` and `1.0` never
    /// collide with distinct string encodings.
    pub fn dictionary_key(&self) -> String {
        match self {
            ConditionValue::Str(s) => s.clone(),
            ConditionValue::Integer(i) => format!("#i:{i}"),
            ConditionValue::Float(f) => format!("#f:{f}"),
            ConditionValue::Bool(b) => format!("#b:{b}"),
            ConditionValue::Null => "#null".to_string(),
            ConditionValue::List(_) => unreachable!("lists are expanded before dictionary encoding"),
        }
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Integer(i) => write!(f, "{i}"),
            ConditionValue::Float(x) => write!(f, "{x}"),
            ConditionValue::Str(s) => write!(f, "{s}"),
            ConditionValue::Bool(b) => write!(f, "{b}"),
            ConditionValue::Null => write!(f, "null"),
            ConditionValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl PartialEq for ConditionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConditionValue::Integer(a), ConditionValue::Integer(b)) => a == b,
            (ConditionValue::Float(a), ConditionValue::Float(b)) => a == b,
            (ConditionValue::Integer(a), ConditionValue::Float(b))
            | (ConditionValue::Float(b), ConditionValue::Integer(a)) => (*a as f64) == *b,
            (ConditionValue::Str(a), ConditionValue::Str(b)) => a == b,
            (ConditionValue::Bool(a), ConditionValue::Bool(b)) => a == b,
            (ConditionValue::List(a), ConditionValue::List(b)) => a == b,
            (ConditionValue::Null, ConditionValue::Null) => true,
            _ => false,
        }
    }
}

impl PartialOrd for ConditionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (self, other) {
                (ConditionValue::Str(a), ConditionValue::Str(b)) => a.partial_cmp(b),
                _ => None,
            },
        }
    }
}
