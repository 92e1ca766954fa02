// Cursor Engine (spec.md §4.7): a forward-only, single-consumer async
// iterator over a server-side sequence, driven by CONTINUE frames that reuse
// the query's original token.
//
// Grounded on the state-machine shape of spec.md §4.7 directly — there is no
// equivalent in the teacher (SMPP has no paginated result concept); the
// teacher's `KeepAliveManager` (`client/keepalive.rs`) is the nearest
// teacher analogue for "a small state machine owned by the connection,
// advanced by explicit calls", and its plain `enum` + match style is
// followed here rather than reaching for an external state-machine crate.

use crate::connection::{self, Connection};
use crate::convert::FromDatum;
use crate::error::{Error, Result};
use crate::proto::{Datum, Query, Response, ResponseType, Term};
use std::marker::PhantomData;

enum State {
    Fresh { term: Term },
    Streaming { token: u64, batch: Vec<Datum>, index: usize, more: bool },
    Exhausted,
    Failed,
}

/// A streaming result set. No I/O occurs until the first [`Cursor::advance`].
///
/// `STOP` is never sent automatically when a cursor is dropped mid-stream
/// (spec.md §9's open question on cursor STOP: documented as intentional,
/// not a requirement). Callers wanting to tell the server to stop early
/// must submit `Query{type=STOP, token}` themselves.
pub struct Cursor<T> {
    connection: Connection,
    state: State,
    _marker: PhantomData<T>,
}

impl<T: FromDatum> Cursor<T> {
    pub(crate) fn new(connection: Connection, term: Term) -> Self {
        Cursor { connection, state: State::Fresh { term }, _marker: PhantomData }
    }

    /// Advances to the next value, fetching the next batch from the server
    /// via CONTINUE when the current batch is exhausted but more remain.
    /// Returns `false` once the sequence is exhausted.
    pub async fn advance(&mut self) -> Result<bool> {
        loop {
            match &self.state {
                State::Streaming { batch, index, .. } if index + 1 < batch.len() => {
                    if let State::Streaming { index, .. } = &mut self.state {
                        *index += 1;
                    }
                    return Ok(true);
                }
                State::Exhausted => return Ok(false),
                State::Failed => {
                    return Err(Error::ProtocolViolation(
                        "advance() called on a cursor that already failed".to_string(),
                    ));
                }
                _ => {}
            }

            match std::mem::replace(&mut self.state, State::Failed) {
                State::Fresh { term } => {
                    let token = self.connection.next_token();
                    let response = self.connection.submit(Query::start(token, term)).await?;
                    // A freshly installed batch's index 0 is the element this
                    // call must return, not one to skip past.
                    if self.install_batch(token, response)? {
                        return Ok(true);
                    }
                }
                State::Streaming { token, more, .. } => {
                    if more {
                        let response = self.connection.submit(Query::r#continue(token)).await?;
                        if self.install_batch(token, response)? {
                            return Ok(true);
                        }
                    } else {
                        self.state = State::Exhausted;
                        return Ok(false);
                    }
                }
                State::Exhausted => {
                    self.state = State::Exhausted;
                    return Ok(false);
                }
                State::Failed => {
                    return Err(Error::ProtocolViolation(
                        "advance() called on a cursor that already failed".to_string(),
                    ));
                }
            }
        }
    }

    /// Returns the value at the current position. Calling this before a
    /// successful `advance()`, or after exhaustion/failure, is a programmer
    /// error, matching spec.md §4.7's invariant.
    pub fn current(&self) -> T {
        match &self.state {
            State::Streaming { batch, index, .. } => {
                T::from_datum(&batch[*index]).expect("cursor batch element failed to convert")
            }
            _ => panic!("docql: Cursor::current called without a successful advance"),
        }
    }

    /// Installs a freshly fetched batch as the new `Streaming` state.
    /// Returns whether the batch has an element at index 0 — the caller
    /// must return `Ok(true)` immediately in that case rather than looping
    /// back to the index-advancing guard, which would skip it.
    fn install_batch(&mut self, token: u64, response: Response) -> Result<bool> {
        match response.response_type {
            ResponseType::SuccessPartial => {
                let has_element = !response.response.is_empty();
                self.state = State::Streaming { token, batch: response.response, index: 0, more: true };
                Ok(has_element)
            }
            ResponseType::SuccessSequence | ResponseType::SuccessAtom => {
                let has_element = !response.response.is_empty();
                self.state = State::Streaming { token, batch: response.response, index: 0, more: false };
                Ok(has_element)
            }
            ResponseType::ClientError | ResponseType::CompileError | ResponseType::RuntimeError => {
                self.state = State::Failed;
                Err(connection::map_non_success(&response))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::r;
    use bytes::BytesMut;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    async fn read_version_tag<R: tokio::io::AsyncRead + Unpin>(reader: &mut R) -> u32 {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).await.unwrap();
        u32::from_le_bytes(buf)
    }

    async fn read_query<R: tokio::io::AsyncRead + Unpin>(reader: &mut R) -> Query {
        let frame = crate::transport::read_frame(reader).await.unwrap().unwrap();
        let mut cursor = std::io::Cursor::new(frame.as_slice());
        Query::decode(&mut cursor).unwrap()
    }

    async fn write_response<W: tokio::io::AsyncWrite + Unpin>(writer: &mut W, response: &Response) {
        let mut buf = BytesMut::new();
        response.encode(&mut buf);
        writer.write_all(&(buf.len() as u32).to_le_bytes()).await.unwrap();
        writer.write_all(&buf).await.unwrap();
    }

    #[tokio::test]
    async fn two_batch_cursor_yields_concatenation_then_stops() {
        let (client_io, mut server_io) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);

        let server_task = tokio::spawn(async move {
            let _version = read_version_tag(&mut server_io).await;

            let start = read_query(&mut server_io).await;
            assert_eq!(start.query_type, crate::proto::QueryType::Start);
            write_response(
                &mut server_io,
                &Response {
                    response_type: ResponseType::SuccessPartial,
                    token: start.token,
                    response: vec![Datum::Num(1.0), Datum::Num(2.0), Datum::Num(3.0)],
                    backtrace: None,
                },
            )
            .await;

            let cont = read_query(&mut server_io).await;
            assert_eq!(cont.query_type, crate::proto::QueryType::Continue);
            assert_eq!(cont.token, start.token);
            assert!(cont.term.is_none());
            write_response(
                &mut server_io,
                &Response {
                    response_type: ResponseType::SuccessSequence,
                    token: start.token,
                    response: vec![Datum::Num(4.0), Datum::Num(5.0)],
                    backtrace: None,
                },
            )
            .await;
            server_io
        });

        let connection = Connection::from_duplex(client_read, client_write).await.unwrap();
        let mut cursor: Cursor<f64> = connection.run_cursor(r::table("items"));

        let mut values = Vec::new();
        while cursor.advance().await.unwrap() {
            values.push(cursor.current());
        }
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        server_task.await.unwrap();
        connection.dispose().await;
    }

    #[tokio::test]
    async fn cursor_failure_surfaces_mapped_error() {
        let (client_io, mut server_io) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);

        let server_task = tokio::spawn(async move {
            let _version = read_version_tag(&mut server_io).await;
            let start = read_query(&mut server_io).await;
            write_response(
                &mut server_io,
                &Response {
                    response_type: ResponseType::CompileError,
                    token: start.token,
                    response: vec![Datum::Str("bad term".to_string())],
                    backtrace: None,
                },
            )
            .await;
            server_io
        });

        let connection = Connection::from_duplex(client_read, client_write).await.unwrap();
        let mut cursor: Cursor<f64> = connection.run_cursor(r::table("items"));
        let result = cursor.advance().await;
        assert!(matches!(result, Err(Error::CompileError { .. })));

        server_task.await.unwrap();
        connection.dispose().await;
    }
}
