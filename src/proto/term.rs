// Term: the wire representation of a query-tree node. `TermType::Datum`
// wraps a literal value; every other variant is an opcode with positional
// `args` and keyword `optargs`, mirroring how the distilled spec describes
// Term as "tree root" carried by Query. The fluent builder in `crate::ast`
// constructs these; this module only knows how to serialize/deserialize
// them.

use super::datum::Datum;
use super::wire::{self, Field, WireError, put_len_field, put_varint_field};
use bytes::BytesMut;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum TermType {
    DatumTerm = 1,
    Table = 2,
    Get = 3,
    GetAll = 4,
    Insert = 5,
    Update = 6,
    Delete = 7,
    Filter = 8,
    Limit = 9,
    TableList = 10,
    DbList = 11,
}

#[derive(Debug, Clone, PartialEq)]
struct TermInner {
    term_type: TermType,
    datum: Option<Datum>,
    args: Vec<Term>,
    optargs: BTreeMap<String, Term>,
}

/// A node in a query tree. Cheaply cloneable (`Arc`-backed) since builder
/// methods return new trees rather than mutating in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Term(Arc<TermInner>);

impl Term {
    pub fn datum(value: impl Into<Datum>) -> Self {
        Term(Arc::new(TermInner {
            term_type: TermType::DatumTerm,
            datum: Some(value.into()),
            args: Vec::new(),
            optargs: BTreeMap::new(),
        }))
    }

    pub fn op(term_type: TermType, args: Vec<Term>) -> Self {
        Term(Arc::new(TermInner {
            term_type,
            datum: None,
            args,
            optargs: BTreeMap::new(),
        }))
    }

    pub fn op_with_optargs(
        term_type: TermType,
        args: Vec<Term>,
        optargs: BTreeMap<String, Term>,
    ) -> Self {
        Term(Arc::new(TermInner {
            term_type,
            datum: None,
            args,
            optargs,
        }))
    }

    pub fn term_type(&self) -> TermType {
        self.0.term_type
    }

    pub fn as_datum(&self) -> Option<&Datum> {
        self.0.datum.as_ref()
    }

    pub fn optargs(&self) -> &BTreeMap<String, Term> {
        &self.0.optargs
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        put_varint_field(buf, 1, self.0.term_type.into());
        if let Some(datum) = &self.0.datum {
            super::datum::encode_datum_field(buf, 2, datum);
        }
        for arg in &self.0.args {
            let mut inner = BytesMut::new();
            arg.encode(&mut inner);
            put_len_field(buf, 3, &inner);
        }
        for (key, value) in &self.0.optargs {
            let mut pair = BytesMut::new();
            put_len_field(&mut pair, 1, key.as_bytes());
            let mut value_buf = BytesMut::new();
            value.encode(&mut value_buf);
            put_len_field(&mut pair, 2, &value_buf);
            put_len_field(buf, 4, &pair);
        }
    }

    pub fn decode(src: &mut Cursor<&[u8]>) -> Result<Self, WireError> {
        let mut term_type: Option<TermType> = None;
        let mut datum: Option<Datum> = None;
        let mut args = Vec::new();
        let mut optargs = BTreeMap::new();

        while let Some(field) = wire::next_field(src)? {
            match field {
                Field::Varint(1, v) => {
                    term_type = Some(
                        TermType::try_from_primitive(v)
                            .map_err(|_| WireError::UnknownEnum(v, "TermType"))?,
                    );
                }
                Field::Len(2, bytes) => {
                    let mut c = Cursor::new(bytes.as_ref());
                    datum = Some(Datum::decode(&mut c)?);
                }
                Field::Len(3, bytes) => {
                    let mut c = Cursor::new(bytes.as_ref());
                    args.push(Term::decode(&mut c)?);
                }
                Field::Len(4, bytes) => {
                    let mut pair_cursor = Cursor::new(bytes.as_ref());
                    let mut key = String::new();
                    let mut value = None;
                    while let Some(pair_field) = wire::next_field(&mut pair_cursor)? {
                        match pair_field {
                            Field::Len(1, kbytes) => key = wire::string_from_bytes(&kbytes)?,
                            Field::Len(2, vbytes) => {
                                let mut vc = Cursor::new(vbytes.as_ref());
                                value = Some(Term::decode(&mut vc)?);
                            }
                            _ => {}
                        }
                    }
                    if let Some(value) = value {
                        optargs.insert(key, value);
                    }
                }
                _ => {}
            }
        }

        let term_type = term_type.ok_or(WireError::Truncated)?;
        Ok(Term(Arc::new(TermInner {
            term_type,
            datum,
            args,
            optargs,
        })))
    }
}

pub fn encode_term_field(buf: &mut BytesMut, field_number: u32, term: &Term) {
    let mut inner = BytesMut::new();
    term.encode(&mut inner);
    put_len_field(buf, field_number, &inner);
}
