// Query: the outbound message. `token` correlates it with the eventual
// Response; `term` is present only for START (absent for CONTINUE/STOP) per
// spec.md §3. `global_optargs` (field 4) carries connection-wide keyword
// arguments alongside the term, same key/Term pair shape as a Term's own
// optargs field.

use super::term::{Term, encode_term_field};
use super::wire::{self, Field, WireError, put_len_field, put_varint_field};
use bytes::BytesMut;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::collections::BTreeMap;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum QueryType {
    Start = 1,
    Continue = 2,
    Stop = 3,
}

#[derive(Debug, Clone)]
pub struct Query {
    pub query_type: QueryType,
    pub token: u64,
    pub term: Option<Term>,
    pub global_optargs: BTreeMap<String, Term>,
}

impl Query {
    pub fn start(token: u64, term: Term) -> Self {
        Query {
            query_type: QueryType::Start,
            token,
            term: Some(term),
            global_optargs: BTreeMap::new(),
        }
    }

    /// `start`, but with connection-wide keyword arguments attached (field 4).
    pub fn start_with_optargs(token: u64, term: Term, global_optargs: BTreeMap<String, Term>) -> Self {
        Query {
            query_type: QueryType::Start,
            token,
            term: Some(term),
            global_optargs,
        }
    }

    pub fn r#continue(token: u64) -> Self {
        Query {
            query_type: QueryType::Continue,
            token,
            term: None,
            global_optargs: BTreeMap::new(),
        }
    }

    pub fn stop(token: u64) -> Self {
        Query {
            query_type: QueryType::Stop,
            token,
            term: None,
            global_optargs: BTreeMap::new(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        put_varint_field(buf, 1, self.query_type.into());
        put_varint_field(buf, 2, self.token);
        if let Some(term) = &self.term {
            encode_term_field(buf, 3, term);
        }
        for (key, value) in &self.global_optargs {
            let mut pair = BytesMut::new();
            put_len_field(&mut pair, 1, key.as_bytes());
            let mut value_buf = BytesMut::new();
            value.encode(&mut value_buf);
            put_len_field(&mut pair, 2, &value_buf);
            put_len_field(buf, 4, &pair);
        }
    }

    pub fn decode(src: &mut Cursor<&[u8]>) -> Result<Self, WireError> {
        let mut query_type = None;
        let mut token = None;
        let mut term = None;
        let mut global_optargs = BTreeMap::new();

        while let Some(field) = wire::next_field(src)? {
            match field {
                Field::Varint(1, v) => {
                    query_type = Some(
                        QueryType::try_from_primitive(v)
                            .map_err(|_| WireError::UnknownEnum(v, "QueryType"))?,
                    );
                }
                Field::Varint(2, v) => token = Some(v),
                Field::Len(3, bytes) => {
                    let mut c = Cursor::new(bytes.as_ref());
                    term = Some(Term::decode(&mut c)?);
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
                        global_optargs.insert(key, value);
                    }
                }
                _ => {}
            }
        }

        Ok(Query {
            query_type: query_type.ok_or(WireError::Truncated)?,
            token: token.ok_or(WireError::Truncated)?,
            term,
            global_optargs,
        })
    }
}

/// Serializes a `Query` to bytes. One of the two pure functions the Wire
/// Codec contract (spec.md §6) requires of the submitter side.
pub fn serialize(query: &Query) -> bytes::Bytes {
    let mut buf = BytesMut::new();
    query.encode(&mut buf);
    buf.freeze()
}
