//! Block encoding
//!
//! Splits a record payload into 255-byte blocks and reassembles it.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{LeafError, Result};

use super::{BLOCK_HEADER, BLOCK_PAYLOAD, BLOCK_SIZE, MAX_SPAN};

/// Number of blocks a payload of `len` bytes occupies
pub fn span_for(len: usize) -> usize {
    len.div_ceil(BLOCK_PAYLOAD).max(1)
}

/// Encode a payload into `span * BLOCK_SIZE` bytes
pub fn encode_blocks(payload: &[u8]) -> Result<Vec<u8>> {
    let span = span_for(payload.len());
    if span > MAX_SPAN {
        return Err(LeafError::CapacityExceeded(format!(
            "payload of {} bytes needs {} blocks, max {}",
            payload.len(),
            span,
            MAX_SPAN
        )));
    }

    let mut buf = BytesMut::with_capacity(span * BLOCK_SIZE);
    let mut chunks = payload.chunks(BLOCK_PAYLOAD);

    for i in 0..span {
        let chunk = chunks.next().unwrap_or(&[]);
        let start = buf.len();

        buf.put_u8(if i == 0 { span as u8 } else { 0 });
        buf.put_u16_le(chunk.len() as u16);
        buf.put_u8(u8::from(i + 1 < span));
        buf.put_slice(chunk);
        buf.resize(start + BLOCK_SIZE, 0);
    }

    Ok(buf.to_vec())
}

/// Reassemble a payload from the raw blocks of one record
///
/// `raw` must start at the record's first block and cover its whole span.
pub fn decode_blocks(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.len() < BLOCK_SIZE || raw.len() % BLOCK_SIZE != 0 {
        return Err(LeafError::Corruption(format!(
            "record image of {} bytes is not whole blocks",
            raw.len()
        )));
    }

    let span = raw[0] as usize;
    if span * BLOCK_SIZE != raw.len() {
        return Err(LeafError::Corruption(format!(
            "record spans {} blocks but {} were supplied",
            span,
            raw.len() / BLOCK_SIZE
        )));
    }

    let mut payload = Vec::with_capacity(span * BLOCK_PAYLOAD);
    for (i, block) in raw.chunks(BLOCK_SIZE).enumerate() {
        let mut header = &block[..BLOCK_HEADER];
        let marker = header.get_u8();
        let len = header.get_u16_le() as usize;
        let next = header.get_u8();

        if i > 0 && marker != 0 {
            return Err(LeafError::Corruption(format!(
                "continuation block {} carries span byte {}",
                i, marker
            )));
        }
        if len > BLOCK_PAYLOAD {
            return Err(LeafError::Corruption(format!(
                "block length {} exceeds {}",
                len, BLOCK_PAYLOAD
            )));
        }
        if next != u8::from(i + 1 < span) {
            return Err(LeafError::Corruption(format!(
                "block {} of {} has next marker {}",
                i, span, next
            )));
        }

        payload.extend_from_slice(&block[BLOCK_HEADER..BLOCK_HEADER + len]);
    }

    Ok(payload)
}
