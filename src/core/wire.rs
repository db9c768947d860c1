//! # Wire Primitives
//!
//! Checked read/write helpers for the binary wire format.
//!
//! All multi-byte integers are big-endian. Strings and byte blobs are
//! length-prefixed with a `u32`. Readers validate the remaining buffer
//! length before touching it, so truncated input surfaces as a
//! `DeserializeError` instead of a panic.

use crate::core::resource::ResourceId;
use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

fn truncated() -> ProtocolError {
    ProtocolError::DeserializeError(constants::ERR_TRUNCATED_PAYLOAD.to_string())
}

/// Read a single byte.
pub fn get_u8(buf: &mut Bytes) -> Result<u8> {
    if buf.remaining() < 1 {
        return Err(truncated());
    }
    Ok(buf.get_u8())
}

/// Read a big-endian u32.
pub fn get_u32(buf: &mut Bytes) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(truncated());
    }
    Ok(buf.get_u32())
}

/// Read a big-endian u64.
pub fn get_u64(buf: &mut Bytes) -> Result<u64> {
    if buf.remaining() < 8 {
        return Err(truncated());
    }
    Ok(buf.get_u64())
}

/// Write a length-prefixed byte blob.
pub fn put_bytes(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
}

/// Read a length-prefixed byte blob without copying the body.
pub fn get_bytes(buf: &mut Bytes) -> Result<Bytes> {
    let len = get_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(truncated());
    }
    Ok(buf.split_to(len))
}

/// Write a length-prefixed UTF-8 string.
pub fn put_str(buf: &mut BytesMut, s: &str) {
    put_bytes(buf, s.as_bytes());
}

/// Read a length-prefixed UTF-8 string.
pub fn get_str(buf: &mut Bytes) -> Result<String> {
    let raw = get_bytes(buf)?;
    String::from_utf8(raw.to_vec())
        .map_err(|e| ProtocolError::DeserializeError(format!("Invalid UTF-8 string: {e}")))
}

/// Write a namespaced resource id as two length-prefixed strings.
pub fn put_resource_id(buf: &mut BytesMut, id: &ResourceId) {
    put_str(buf, id.namespace());
    put_str(buf, id.path());
}

/// Read a namespaced resource id, re-validating the character set.
pub fn get_resource_id(buf: &mut Bytes) -> Result<ResourceId> {
    let namespace = get_str(buf)?;
    let path = get_str(buf)?;
    ResourceId::new(namespace, path)
}
