// Response: the inbound message. Decoded by the Reader Demultiplexer and
// routed to the pending slot keyed by `token`.

use super::datum::Datum;
use super::wire::{self, Field, WireError, put_varint_field};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum ResponseType {
    SuccessAtom = 1,
    SuccessSequence = 2,
    SuccessPartial = 3,
    ClientError = 4,
    CompileError = 5,
    RuntimeError = 6,
}

impl ResponseType {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ResponseType::SuccessAtom | ResponseType::SuccessSequence | ResponseType::SuccessPartial
        )
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            ResponseType::ClientError | ResponseType::CompileError | ResponseType::RuntimeError
        )
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub response_type: ResponseType,
    pub token: u64,
    pub response: Vec<Datum>,
    pub backtrace: Option<Vec<u64>>,
}

impl Response {
    pub fn decode(src: &mut Cursor<&[u8]>) -> Result<Self, WireError> {
        let mut response_type = None;
        let mut token = None;
        let mut response = Vec::new();
        let mut backtrace: Option<Vec<u64>> = None;

        while let Some(field) = wire::next_field(src)? {
            match field {
                Field::Varint(1, v) => {
                    response_type = Some(
                        ResponseType::try_from_primitive(v)
                            .map_err(|_| WireError::UnknownEnum(v, "ResponseType"))?,
                    );
                }
                Field::Varint(2, v) => token = Some(v),
                Field::Len(3, bytes) => {
                    let mut c = Cursor::new(bytes.as_ref());
                    response.push(Datum::decode(&mut c)?);
                }
                Field::Varint(4, v) => backtrace.get_or_insert_with(Vec::new).push(v),
                _ => {}
            }
        }

        Ok(Response {
            response_type: response_type.ok_or(WireError::Truncated)?,
            token: token.ok_or(WireError::Truncated)?,
            response,
            backtrace,
        })
    }

    pub fn encode(&self, buf: &mut bytes::BytesMut) {
        put_varint_field(buf, 1, self.response_type.into());
        put_varint_field(buf, 2, self.token);
        for datum in &self.response {
            super::datum::encode_datum_field(buf, 3, datum);
        }
        if let Some(frames) = &self.backtrace {
            for frame in frames {
                put_varint_field(buf, 4, *frame);
            }
        }
    }
}

/// Deserializes bytes into a `Response`. The other pure function the Wire
/// Codec contract requires.
pub fn deserialize(bytes: &[u8]) -> Result<Response, WireError> {
    let mut cursor = Cursor::new(bytes);
    Response::decode(&mut cursor)
}
