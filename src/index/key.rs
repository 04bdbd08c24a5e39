//! Index key types
//!
//! A key must be printable as a shape token (`.ind` line a) and encodable
//! as raw bytes (`.ind` line c). Integers and strings are supported.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{LeafError, Result};
use crate::schema::{ColumnType, Value};

/// A type usable as a B+ tree key
pub trait IndexKey: Ord + Clone + fmt::Debug + Send + 'static {
    /// Column type this key corresponds to
    const KEY_TYPE: ColumnType;

    /// Render as a shape token (never contains ' ', ',', '\n' or a marker)
    fn to_token(&self) -> String;

    /// Parse a shape token
    fn from_token(token: &str) -> Result<Self>;

    /// Append the raw key bytes
    fn encode_into(&self, buf: &mut BytesMut);

    /// Length of the raw key bytes
    fn encoded_len(&self) -> usize;

    /// Parse raw key bytes
    fn decode_from(bytes: &[u8]) -> Result<Self>;

    /// Extract a key from a field value of the same type
    fn from_value(value: &Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

impl IndexKey for i32 {
    const KEY_TYPE: ColumnType = ColumnType::Int;

    fn to_token(&self) -> String {
        self.to_string()
    }

    fn from_token(token: &str) -> Result<Self> {
        token
            .parse()
            .map_err(|_| LeafError::Corruption(format!("bad integer key token '{}'", token)))
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_i32_le(*self);
    }

    fn encoded_len(&self) -> usize {
        4
    }

    fn decode_from(bytes: &[u8]) -> Result<Self> {
        let word: [u8; 4] = bytes.try_into().map_err(|_| {
            LeafError::Corruption(format!("integer key of {} bytes", bytes.len()))
        })?;
        Ok(i32::from_le_bytes(word))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
}

impl IndexKey for String {
    const KEY_TYPE: ColumnType = ColumnType::Str;

    fn to_token(&self) -> String {
        if self.is_empty() {
            return EMPTY_TOKEN.to_string();
        }
        let mut token = String::with_capacity(self.len());
        for ch in self.chars() {
            if RESERVED.contains(&ch) {
                token.push_str(&format!("%{:02X}", ch as u8));
            } else {
                token.push(ch);
            }
        }
        token
    }

    fn from_token(token: &str) -> Result<Self> {
        if token == EMPTY_TOKEN {
            return Ok(String::new());
        }
        let bytes = token.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'%' {
                let hex = token
                    .get(i + 1..i + 3)
                    .ok_or_else(|| LeafError::Corruption(format!("truncated escape in '{}'", token)))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| LeafError::Corruption(format!("bad escape in '{}'", token)))?;
                out.push(byte);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }

        String::from_utf8(out)
            .map_err(|_| LeafError::Corruption(format!("key token '{}' is not UTF-8", token)))
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_bytes());
    }

    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn decode_from(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec())
            .map_err(|_| LeafError::Corruption("string key is not UTF-8".to_string()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            Value::Int(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

/// Token for the empty string; a bare `%%` never comes out of escaping
const EMPTY_TOKEN: &str = "%%";

/// Characters that would break the shape line
const RESERVED: [char; 8] = ['%', ',', ' ', '#', '$', '!', '\n', '\r'];
