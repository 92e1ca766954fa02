// Datum: the tagged-union value type carried inside Responses and inside
// query Terms of type DATUM. Encode/decode follow the teacher's
// Encodable/Decodable split in `codec.rs` — a pure data type plus free
// functions that turn it into bytes, rather than a derive macro, since this
// crate doesn't depend on a protobuf codegen toolchain.

use super::wire::{self, Field, WireError, put_f64_field, put_len_field, put_varint_field};
use bytes::BytesMut;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::collections::BTreeMap;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum DatumType {
    Null = 1,
    Bool = 2,
    RNum = 3,
    RStr = 4,
    RArray = 5,
    RObject = 6,
}

/// A datum: null, bool, f64, string, array, or an ordered object. Objects
/// use `BTreeMap` rather than `HashMap` so two structurally equal datums
/// compare equal and encode deterministically — useful for tests asserting
/// exact wire bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<Datum>),
    Object(BTreeMap<String, Datum>),
}

impl Datum {
    pub fn datum_type(&self) -> DatumType {
        match self {
            Datum::Null => DatumType::Null,
            Datum::Bool(_) => DatumType::Bool,
            Datum::Num(_) => DatumType::RNum,
            Datum::Str(_) => DatumType::RStr,
            Datum::Array(_) => DatumType::RArray,
            Datum::Object(_) => DatumType::RObject,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        put_varint_field(buf, 1, self.datum_type().into());
        match self {
            Datum::Null => {}
            Datum::Bool(b) => put_varint_field(buf, 2, *b as u64),
            Datum::Num(n) => put_f64_field(buf, 3, *n),
            Datum::Str(s) => put_len_field(buf, 4, s.as_bytes()),
            Datum::Array(items) => {
                for item in items {
                    let mut inner = BytesMut::new();
                    item.encode(&mut inner);
                    put_len_field(buf, 5, &inner);
                }
            }
            Datum::Object(map) => {
                for (key, value) in map {
                    let mut inner = BytesMut::new();
                    put_len_field(&mut inner, 1, key.as_bytes());
                    let mut value_buf = BytesMut::new();
                    value.encode(&mut value_buf);
                    put_len_field(&mut inner, 2, &value_buf);
                    put_len_field(buf, 6, &inner);
                }
            }
        }
    }

    pub fn decode(src: &mut Cursor<&[u8]>) -> Result<Self, WireError> {
        let mut datum_type: Option<DatumType> = None;
        let mut r_bool: Option<bool> = None;
        let mut r_num: Option<f64> = None;
        let mut r_str: Option<String> = None;
        let mut r_array: Vec<Datum> = Vec::new();
        let mut r_object: BTreeMap<String, Datum> = BTreeMap::new();

        while let Some(field) = wire::next_field(src)? {
            match field {
                Field::Varint(1, v) => {
                    datum_type = Some(
                        DatumType::try_from_primitive(v)
                            .map_err(|_| WireError::UnknownEnum(v, "DatumType"))?,
                    );
                }
                Field::Varint(2, v) => r_bool = Some(v != 0),
                Field::Fixed64(3, bits) => r_num = Some(wire::f64_from_bits(bits)),
                Field::Len(4, bytes) => r_str = Some(wire::string_from_bytes(&bytes)?),
                Field::Len(5, bytes) => {
                    let mut item_cursor = Cursor::new(bytes.as_ref());
                    r_array.push(Datum::decode(&mut item_cursor)?);
                }
                Field::Len(6, bytes) => {
                    let mut pair_cursor = Cursor::new(bytes.as_ref());
                    let mut key = String::new();
                    let mut value = Datum::Null;
                    while let Some(pair_field) = wire::next_field(&mut pair_cursor)? {
                        match pair_field {
                            Field::Len(1, kbytes) => key = wire::string_from_bytes(&kbytes)?,
                            Field::Len(2, vbytes) => {
                                let mut vc = Cursor::new(vbytes.as_ref());
                                value = Datum::decode(&mut vc)?;
                            }
                            _ => {}
                        }
                    }
                    r_object.insert(key, value);
                }
                _ => {} // unknown field: forward-compatible, ignore
            }
        }

        Ok(match datum_type.unwrap_or(DatumType::Null) {
            DatumType::Null => Datum::Null,
            DatumType::Bool => Datum::Bool(r_bool.unwrap_or(false)),
            DatumType::RNum => Datum::Num(r_num.unwrap_or(0.0)),
            DatumType::RStr => Datum::Str(r_str.unwrap_or_default()),
            DatumType::RArray => Datum::Array(r_array),
            DatumType::RObject => Datum::Object(r_object),
        })
    }
}

/// Encodes `datum` as a standalone length-delimited field with the given
/// field number — used by `Term`/`Query`/`Response` to embed a `Datum`.
pub fn encode_datum_field(buf: &mut BytesMut, field_number: u32, datum: &Datum) {
    let mut inner = BytesMut::new();
    datum.encode(&mut inner);
    put_len_field(buf, field_number, &inner);
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Num(value)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Str(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Str(value.to_string())
    }
}

impl<T: Into<Datum>> From<Vec<T>> for Datum {
    fn from(values: Vec<T>) -> Self {
        Datum::Array(values.into_iter().map(Into::into).collect())
    }
}
