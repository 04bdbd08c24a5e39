//! Field values

use std::cmp::Ordering;
use std::fmt;

use crate::error::{LeafError, Result};

use super::ColumnType;

/// A single field of a row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Str(String),
}

impl Value {
    /// Parse a user literal: `-?\d+` that fits an i32 is an integer,
    /// anything else is a string with one pair of surrounding quotes removed.
    ///
    /// Only the canonical spelling of an integer becomes `Int`, so text such
    /// as `007` or `-0` stays a string and survives coercion to a string
    /// column unchanged. An int column still parses it.
    pub fn parse_literal(literal: &str) -> Value {
        let trimmed = literal.trim();
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(v) = trimmed.parse::<i32>() {
                if v.to_string() == trimmed {
                    return Value::Int(v);
                }
            }
        }
        Value::Str(strip_quotes(trimmed).to_string())
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Str(_) => ColumnType::Str,
        }
    }

    /// Convert a parsed literal to the type a column expects
    pub fn coerce(self, ty: ColumnType) -> Result<Value> {
        match (self, ty) {
            (v @ Value::Int(_), ColumnType::Int) => Ok(v),
            (v @ Value::Str(_), ColumnType::Str) => Ok(v),
            (Value::Int(i), ColumnType::Str) => Ok(Value::Str(i.to_string())),
            (Value::Str(s), ColumnType::Int) => s.trim().parse::<i32>().map(Value::Int).map_err(|_| {
                LeafError::SchemaMismatch(format!("'{}' is not an int", s))
            }),
        }
    }

    /// Byte-wise comparison of the text forms, for either column type
    pub fn compare_text(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => self.to_string().as_bytes().cmp(other.to_string().as_bytes()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
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

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

