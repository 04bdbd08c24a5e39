//! Table metadata file (`.prof`)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header                                                   │
//! │ ┌────────────┬────────────┬────────────┬──────────────┐  │
//! │ │KeyType (4) │ PkPos (4)  │ ColCnt (4) │ Types (n)    │  │
//! │ └────────────┴────────────┴────────────┴──────────────┘  │
//! ├──────────────────────────────────────────────────────────┤
//! │ Column names joined by ' ', NUL padded                   │
//! ├──────────────────────────────────────────────────────────┤
//! │ Write cursor (4) at offset 1020                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers little-endian. Key type: 0 = int, 1 = string.
//! Column type bytes: 1 = int, 0 = string.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{LeafError, Result};

use super::{Column, ColumnType, Schema};

/// Total size of the metadata file
pub const META_SIZE: usize = 1024;

/// Offset of the data file write cursor
pub const CURSOR_OFFSET: u64 = 1020;

/// Fixed part of the header: key type + primary key position + column count
const FIXED_HEADER: usize = 12;

/// Encode a schema into a full metadata image with a zero cursor
pub fn encode(schema: &Schema) -> Result<Vec<u8>> {
    let names = schema
        .columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let used = FIXED_HEADER + schema.len() + names.len() + 1;
    if used > CURSOR_OFFSET as usize {
        return Err(LeafError::InvalidSchema(format!(
            "schema needs {} bytes, metadata holds at most {}",
            used, CURSOR_OFFSET
        )));
    }

    let mut buf = BytesMut::with_capacity(META_SIZE);
    buf.put_i32_le(schema.key_type().key_flag());
    buf.put_i32_le(schema.primary_index() as i32);
    buf.put_i32_le(schema.len() as i32);
    for column in schema.columns() {
        buf.put_u8(column.ty.tag());
    }
    buf.put_slice(names.as_bytes());
    buf.resize(META_SIZE, 0);

    Ok(buf.to_vec())
}

/// Decode the schema portion of a metadata image
pub fn decode(image: &[u8]) -> Result<Schema> {
    if image.len() != META_SIZE {
        return Err(LeafError::Corruption(format!(
            "metadata is {} bytes, expected {}",
            image.len(),
            META_SIZE
        )));
    }

    let mut buf = &image[..];
    let key_flag = buf.get_i32_le();
    let primary = buf.get_i32_le();
    let count = buf.get_i32_le();

    let key_type = ColumnType::from_key_flag(key_flag)
        .ok_or_else(|| LeafError::Corruption(format!("unknown key type flag {}", key_flag)))?;

    let limit = CURSOR_OFFSET as usize - FIXED_HEADER;
    if count <= 0 || count as usize > limit {
        return Err(LeafError::Corruption(format!("bad column count {}", count)));
    }
    let count = count as usize;

    let mut types = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = buf.get_u8();
        types.push(
            ColumnType::from_tag(tag)
                .ok_or_else(|| LeafError::Corruption(format!("unknown column type byte {}", tag)))?,
        );
    }

    let name_area = &image[FIXED_HEADER + count..CURSOR_OFFSET as usize];
    let end = name_area.iter().position(|&b| b == 0).unwrap_or(name_area.len());
    let names = std::str::from_utf8(&name_area[..end])
        .map_err(|_| LeafError::Corruption("column names are not UTF-8".to_string()))?;
    let names: Vec<&str> = names.split(' ').collect();
    if names.len() != count {
        return Err(LeafError::Corruption(format!(
            "{} column names for {} columns",
            names.len(),
            count
        )));
    }

    let columns = names
        .into_iter()
        .zip(types)
        .map(|(name, ty)| Column::new(name, ty))
        .collect();

    if primary < 0 {
        return Err(LeafError::Corruption(format!("bad primary key position {}", primary)));
    }
    let schema = Schema::new(columns, primary as usize)
        .map_err(|e| LeafError::Corruption(format!("stored schema rejected: {}", e)))?;

    if schema.key_type() != key_type {
        return Err(LeafError::Corruption(format!(
            "key type flag says {} but primary column '{}' is {}",
            key_type,
            schema.primary_column().name,
            schema.key_type()
        )));
    }

    Ok(schema)
}

/// Create a new metadata file; fails if it already exists
pub fn create(path: &Path, schema: &Schema, sync: bool) -> Result<()> {
    let image = encode(schema)?;
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(&image)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

/// Load the schema from an existing metadata file
pub fn load(path: &Path) -> Result<Schema> {
    let mut file = File::open(path)?;
    let mut image = Vec::with_capacity(META_SIZE);
    file.read_to_end(&mut image)?;
    decode(&image)
}

/// Read the persisted write cursor
pub fn read_cursor(file: &mut File) -> Result<u32> {
    let mut word = [0u8; 4];
    file.seek(SeekFrom::Start(CURSOR_OFFSET))?;
    file.read_exact(&mut word)?;
    Ok(u32::from_le_bytes(word))
}

/// Persist the write cursor
pub fn write_cursor(file: &mut File, cursor: u32) -> Result<()> {
    file.seek(SeekFrom::Start(CURSOR_OFFSET))?;
    file.write_all(&cursor.to_le_bytes())?;
    Ok(())
}
