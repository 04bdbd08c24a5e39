//! Row codec
//!
//! ## Row Format
//! ```text
//! ┌──────────┬───────────┬──────────┬───────────┬─────┐
//! │ Len (4)  │ Field 0   │ Len (4)  │ Field 1   │ ... │
//! └──────────┴───────────┴──────────┴───────────┴─────┘
//! ```
//!
//! Lengths are u32 LE. An int field is always `4` followed by an i32 LE;
//! a string field is its byte length followed by the UTF-8 bytes.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{LeafError, Result};
use crate::schema::{ColumnType, Schema, Value};

/// Encode a row; values must match the schema in count and type
pub fn encode_row(schema: &Schema, values: &[Value]) -> Result<Vec<u8>> {
    if values.len() != schema.len() {
        return Err(LeafError::SchemaMismatch(format!(
            "table has {} columns, row has {} values",
            schema.len(),
            values.len()
        )));
    }

    let mut buf = BytesMut::new();
    for (column, value) in schema.columns().iter().zip(values) {
        match (column.ty, value) {
            (ColumnType::Int, Value::Int(v)) => {
                buf.put_u32_le(4);
                buf.put_i32_le(*v);
            }
            (ColumnType::Str, Value::Str(s)) => {
                buf.put_u32_le(s.len() as u32);
                buf.put_slice(s.as_bytes());
            }
            (ty, value) => {
                return Err(LeafError::SchemaMismatch(format!(
                    "column '{}' is {}, got {:?}",
                    column.name, ty, value
                )))
            }
        }
    }

    Ok(buf.to_vec())
}

/// Decode a row against its schema
///
/// Fails with `Corruption` on a short buffer, an int whose length is not 4,
/// invalid UTF-8 or trailing bytes.
pub fn decode_row(schema: &Schema, mut bytes: &[u8]) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(schema.len());

    for column in schema.columns() {
        if bytes.remaining() < 4 {
            return Err(LeafError::Corruption(format!(
                "row ends before column '{}'",
                column.name
            )));
        }
        let len = bytes.get_u32_le() as usize;
        if bytes.remaining() < len {
            return Err(LeafError::Corruption(format!(
                "column '{}' claims {} bytes, {} left",
                column.name,
                len,
                bytes.remaining()
            )));
        }

        let value = match column.ty {
            ColumnType::Int => {
                if len != 4 {
                    return Err(LeafError::Corruption(format!(
                        "int column '{}' has length {}",
                        column.name, len
                    )));
                }
                Value::Int(bytes.get_i32_le())
            }
            ColumnType::Str => {
                let text = std::str::from_utf8(&bytes[..len]).map_err(|_| {
                    LeafError::Corruption(format!("column '{}' is not UTF-8", column.name))
                })?;
                let value = Value::Str(text.to_string());
                bytes.advance(len);
                value
            }
        };
        values.push(value);
    }

    if bytes.has_remaining() {
        return Err(LeafError::Corruption(format!(
            "{} trailing bytes after last column",
            bytes.remaining()
        )));
    }

    Ok(values)
}
