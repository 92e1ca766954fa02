// Minimal protobuf wire-format primitives shared by the Query/Response/Datum
// codecs. Mirrors how the teacher's `codec.rs` keeps header encode/decode
// separate from the PDU types that use it: this module knows nothing about
// Query/Datum/Term, only about varints, tags, and length-delimited fields.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("unexpected end of buffer while decoding protobuf field")]
    Truncated,

    #[error("varint too long (more than 10 bytes)")]
    VarintOverflow,

    #[error("invalid wire type {0} for field {1}")]
    InvalidWireType(u8, u32),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("unknown enum discriminant {0} for {1}")]
    UnknownEnum(u64, &'static str),
}

pub const WIRE_VARINT: u8 = 0;
pub const WIRE_FIXED64: u8 = 1;
pub const WIRE_LEN: u8 = 2;

/// One decoded (field_number, wire_type, payload) triple. `payload` covers
/// exactly the bytes belonging to this field's value; the cursor has already
/// advanced past it.
pub enum Field {
    Varint(u32, u64),
    Fixed64(u32, u64),
    Len(u32, Bytes),
}

pub fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            break;
        } else {
            buf.put_u8(byte | 0x80);
        }
    }
}

pub fn get_varint(src: &mut Cursor<&[u8]>) -> Result<u64, WireError> {
    let mut result: u64 = 0;
    for i in 0..10 {
        if !src.has_remaining() {
            return Err(WireError::Truncated);
        }
        let byte = src.get_u8();
        result |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(WireError::VarintOverflow)
}

pub fn put_tag(buf: &mut BytesMut, field_number: u32, wire_type: u8) {
    put_varint(buf, ((field_number as u64) << 3) | wire_type as u64);
}

pub fn put_varint_field(buf: &mut BytesMut, field_number: u32, value: u64) {
    put_tag(buf, field_number, WIRE_VARINT);
    put_varint(buf, value);
}

pub fn put_fixed64_field(buf: &mut BytesMut, field_number: u32, value: u64) {
    put_tag(buf, field_number, WIRE_FIXED64);
    buf.put_u64_le(value);
}

pub fn put_len_field(buf: &mut BytesMut, field_number: u32, payload: &[u8]) {
    put_tag(buf, field_number, WIRE_LEN);
    put_varint(buf, payload.len() as u64);
    buf.put_slice(payload);
}

pub fn put_f64_field(buf: &mut BytesMut, field_number: u32, value: f64) {
    put_fixed64_field(buf, field_number, value.to_bits());
}

/// Reads the next field from `src`. Returns `Ok(None)` at end of buffer.
pub fn next_field(src: &mut Cursor<&[u8]>) -> Result<Option<Field>, WireError> {
    if !src.has_remaining() {
        return Ok(None);
    }
    let tag = get_varint(src)?;
    let field_number = (tag >> 3) as u32;
    let wire_type = (tag & 0x7) as u8;
    match wire_type {
        WIRE_VARINT => Ok(Some(Field::Varint(field_number, get_varint(src)?))),
        WIRE_FIXED64 => {
            if src.remaining() < 8 {
                return Err(WireError::Truncated);
            }
            Ok(Some(Field::Fixed64(field_number, src.get_u64_le())))
        }
        WIRE_LEN => {
            let len = get_varint(src)? as usize;
            if src.remaining() < len {
                return Err(WireError::Truncated);
            }
            let start = src.position() as usize;
            let slice = &src.get_ref()[start..start + len];
            src.advance(len);
            Ok(Some(Field::Len(field_number, Bytes::copy_from_slice(slice))))
        }
        other => Err(WireError::InvalidWireType(other, field_number)),
    }
}

pub fn f64_from_bits(bits: u64) -> f64 {
    f64::from_bits(bits)
}

pub fn string_from_bytes(bytes: &[u8]) -> Result<String, WireError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
}
