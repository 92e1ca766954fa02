// Connection Facade (spec.md §4.6): ties the Token Allocator, Pending
// Registry, Writer Serializer, and Reader Demultiplexer into `connect`,
// `run`, `run_cursor`, and `dispose`.
//
// Grounded on the teacher's `client/default.rs::connect` (resolve address,
// open a `TcpStream`, wrap it, return a ready client) for the overall shape
// of `Connect`, generalized here to a candidate list with DNS resolution and
// an overall deadline, since the distilled spec's `connect(endpoints…)`
// contract requires trying more than one address. `dispose()` is grounded on
// Design Note "long-running reader task" (§9): unlike the teacher's
// `disconnect`, which just flips a flag and lets the socket drop, this
// explicitly cancels and joins the Reader Demultiplexer so every Armed slot
// is guaranteed drained before `dispose()` returns.

use crate::convert::FromDatum;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::pending::{self, PendingRegistry, SlotOutcome};
use crate::proto::{Query, Response, ResponseType, Term};
use crate::token::TokenAllocator;
use crate::writer::WriterSerializer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::{TcpStream, ToSocketAddrs, lookup_host};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Overall deadline for `connect`, across every candidate endpoint (spec.md §4.6).
pub const CONNECT_DEADLINE: Duration = Duration::from_secs(30);

/// Deadline for a single submission, from the moment it begins (spec.md §5).
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// The 4-byte little-endian protocol version tag sent as the first outbound
/// payload, unframed (no length prefix) — the minimal handshake spec.md §9
/// directs this crate to preserve.
const PROTOCOL_VERSION_TAG: u32 = 0x34c2_bdc3;

/// The write half is type-erased behind this alias so `Connection` stays a
/// single concrete type regardless of whether it was built over a real
/// `TcpStream` or (in tests) a `tokio::io::duplex` half.
type DynWriter = Box<dyn tokio::io::AsyncWrite + Unpin + Send>;

/// A live connection to the document store. Constructed via [`Connection::connect`].
///
/// Cheaply cloneable: internally `Arc`-shared, so multiple submitters may
/// hold a `Connection` and issue concurrent `run`/`run_cursor` calls against
/// the same underlying socket (spec.md §5's concurrency model).
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    tokens: TokenAllocator,
    registry: Arc<PendingRegistry>,
    writer: WriterSerializer<DynWriter>,
    shutdown: CancellationToken,
    reader_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl Connection {
    /// Tries each candidate in `endpoints` in order, resolving DNS-style
    /// entries to one or more IP endpoints and attempting each in turn.
    /// Succeeds on the first endpoint that accepts a TCP connection; sends
    /// the version tag, spawns the Reader Demultiplexer, and returns.
    ///
    /// Fails with [`Error::NoConnectableAddress`] if every candidate fails,
    /// or the mapped error if the 30-second overall deadline elapses first.
    #[instrument(skip(endpoints))]
    pub async fn connect<T: ToSocketAddrs + std::fmt::Debug>(endpoints: &[T]) -> Result<Self> {
        timeout(CONNECT_DEADLINE, Self::connect_inner(endpoints))
            .await
            .map_err(|_| Error::ConnectTimeout(CONNECT_DEADLINE))?
    }

    async fn connect_inner<T: ToSocketAddrs + std::fmt::Debug>(endpoints: &[T]) -> Result<Self> {
        for endpoint in endpoints {
            let resolved = match lookup_host(endpoint).await {
                Ok(addrs) => addrs.collect::<Vec<SocketAddr>>(),
                Err(source) => {
                    warn!(endpoint = ?endpoint, error = %source, "docql: DNS resolution failed");
                    continue;
                }
            };

            for addr in resolved {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Self::from_stream(stream).await,
                    Err(source) => {
                        debug!(%addr, %source, "docql: connect attempt failed");
                    }
                }
            }
        }

        Err(Error::NoConnectableAddress)
    }

    async fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true).ok();
        let (read_half, mut write_half) = stream.into_split();

        crate::transport::write_all(&mut write_half, &PROTOCOL_VERSION_TAG.to_le_bytes()).await?;

        let registry = Arc::new(PendingRegistry::new());
        let shutdown = CancellationToken::new();

        let reader_registry = Arc::clone(&registry);
        let reader_shutdown = shutdown.clone();
        let reader_handle = tokio::spawn(crate::reader::run(read_half, reader_registry, reader_shutdown));

        Ok(Connection {
            inner: Arc::new(Inner {
                tokens: TokenAllocator::new(),
                registry,
                writer: WriterSerializer::new(Box::new(write_half) as DynWriter),
                shutdown,
                reader_handle: tokio::sync::Mutex::new(Some(reader_handle)),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Constructs a connection directly over an already-open duplex stream,
    /// skipping DNS resolution and candidate iteration. Used by tests driving
    /// a scripted in-memory transport (`tokio::io::duplex`), where there is
    /// no socket to dial.
    pub async fn from_duplex<R, W>(read_half: R, mut write_half: W) -> Result<Self>
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
        W: tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        crate::transport::write_all(&mut write_half, &PROTOCOL_VERSION_TAG.to_le_bytes()).await?;

        let registry = Arc::new(PendingRegistry::new());
        let shutdown = CancellationToken::new();

        let reader_registry = Arc::clone(&registry);
        let reader_shutdown = shutdown.clone();
        let reader_handle = tokio::spawn(crate::reader::run(read_half, reader_registry, reader_shutdown));

        Ok(Connection {
            inner: Arc::new(Inner {
                tokens: TokenAllocator::new(),
                registry,
                writer: WriterSerializer::new(Box::new(write_half) as DynWriter),
                shutdown,
                reader_handle: tokio::sync::Mutex::new(Some(reader_handle)),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Runs `term` as a single-response query and converts the result,
    /// per the Run primitive in spec.md §4.6.
    pub async fn run<T: FromDatum>(&self, term: Term) -> Result<T> {
        let response = self.submit(Query::start(self.inner.tokens.next(), term)).await?;
        Self::convert_single(response)
    }

    /// Runs `term` as a cursor query (spec.md §4.6's Cursor surface): no I/O
    /// occurs until the returned [`Cursor`]'s first `advance`.
    pub fn run_cursor<T: FromDatum>(&self, term: Term) -> Cursor<T> {
        Cursor::new(self.clone(), term)
    }

    /// Closes the connection: cancels and joins the Reader Demultiplexer,
    /// which drains every still-armed slot with `ConnectionClosed`.
    /// Idempotent — a second call is a no-op.
    #[instrument(skip(self))]
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();
        if let Some(handle) = self.inner.reader_handle.lock().await.take() {
            let _ = handle.await;
        }
        debug!("docql: connection disposed");
    }

    /// Allocates the next token for this connection. Exposed so [`Cursor`]
    /// can build its own `START`/`CONTINUE` queries.
    pub(crate) fn next_token(&self) -> u64 {
        self.inner.tokens.next()
    }

    /// The submission procedure of spec.md §4.4, shared by `run` and
    /// `Cursor`'s START/CONTINUE steps.
    pub(crate) async fn submit(&self, query: Query) -> Result<Response> {
        let token = query.token;
        let (slot, waiter) = pending::armed();
        self.inner.registry.install(token, slot);

        let payload = crate::proto::serialize(&query);
        if let Err(err) = self.inner.writer.write_frame(&payload).await {
            // Write failed: the slot may never be delivered. Take it back out
            // so a later drain-on-shutdown doesn't double-complete it, and
            // surface the write error directly.
            self.inner.registry.take(token);
            return Err(err);
        }

        match timeout(REQUEST_DEADLINE, waiter.wait()).await {
            Ok(Some(SlotOutcome::Delivered(response))) => Ok(response),
            Ok(Some(SlotOutcome::Closed)) => Err(Error::ConnectionClosed),
            Ok(None) => Err(Error::ConnectionClosed),
            Err(_elapsed) => {
                // Deadline fired. Take-and-cancel; if the reader already took
                // it (response raced in just before the deadline), there is
                // no way back to that response here — the slot is gone and
                // the oneshot it owned has already been consumed by the
                // reader's `deliver`, so `waiter` would have resolved. Since
                // `timeout` only fires when `waiter.wait()` itself hadn't
                // completed, losing this race means the response truly had
                // not arrived yet.
                self.inner.registry.take(token);
                Err(Error::RequestTimedOut)
            }
        }
    }

    fn convert_single<T: FromDatum>(response: Response) -> Result<T> {
        match response.response_type {
            ResponseType::SuccessAtom | ResponseType::SuccessSequence => {
                match response.response.as_slice() {
                    [only] => T::from_datum(only).map_err(|err| Error::ProtocolViolation(err.to_string())),
                    other => Err(Error::UnexpectedResponseShape {
                        expected: 1,
                        actual: other.len(),
                    }),
                }
            }
            ResponseType::ClientError | ResponseType::CompileError | ResponseType::RuntimeError => {
                Err(Error::from_response(&response))
            }
            ResponseType::SuccessPartial => Err(Error::ProtocolViolation(
                "SUCCESS_PARTIAL returned from a single-response run".to_string(),
            )),
        }
    }
}

/// Converts a DML acknowledgement [`Response`] (spec.md §4.6's write
/// surface) into the caller's value type. Wire behavior is identical to
/// [`Connection::run`]; this exists as a distinctly named entry point so
/// callers reading `run_write` know they're looking at a mutation.
impl Connection {
    pub async fn run_write<T: FromDatum>(&self, term: Term) -> Result<T> {
        self.run(term).await
    }
}

/// Exposed so `Cursor` can see error-mapping without depending on
/// `Connection`'s private fields.
pub(crate) fn map_non_success(response: &Response) -> Error {
    Error::from_response(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::r;
    use crate::proto::{Datum, ResponseType};
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
    async fn single_atom_run_returns_converted_value() {
        let (client_io, mut server_io) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);

        let server_task = tokio::spawn(async move {
            let _version = read_version_tag(&mut server_io).await;
            let query = read_query(&mut server_io).await;
            write_response(
                &mut server_io,
                &Response {
                    response_type: ResponseType::SuccessAtom,
                    token: query.token,
                    response: vec![Datum::Num(42.0)],
                    backtrace: None,
                },
            )
            .await;
            server_io
        });

        let connection = Connection::from_duplex(client_read, client_write).await.unwrap();
        let value: f64 = connection.run(r::expr(42.0)).await.unwrap();
        assert_eq!(value, 42.0);

        server_task.await.unwrap();
        connection.dispose().await;
    }

    #[tokio::test]
    async fn server_error_maps_to_runtime_error_and_connection_stays_usable() {
        let (client_io, mut server_io) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);

        let server_task = tokio::spawn(async move {
            let _version = read_version_tag(&mut server_io).await;

            let first = read_query(&mut server_io).await;
            write_response(
                &mut server_io,
                &Response {
                    response_type: ResponseType::RuntimeError,
                    token: first.token,
                    response: vec![Datum::Str("boom".to_string())],
                    backtrace: None,
                },
            )
            .await;

            let second = read_query(&mut server_io).await;
            write_response(
                &mut server_io,
                &Response {
                    response_type: ResponseType::SuccessAtom,
                    token: second.token,
                    response: vec![Datum::Bool(true)],
                    backtrace: None,
                },
            )
            .await;
            server_io
        });

        let connection = Connection::from_duplex(client_read, client_write).await.unwrap();

        let first_result: Result<f64> = connection.run(r::expr(1.0)).await;
        assert!(matches!(first_result, Err(Error::RuntimeError { ref message, .. }) if message == "boom"));

        let second_result: bool = connection.run(r::expr(true)).await.unwrap();
        assert!(second_result);

        server_task.await.unwrap();
        connection.dispose().await;
    }

    #[tokio::test]
    async fn concurrent_multiplex_routes_out_of_order_responses() {
        let (client_io, mut server_io) = duplex(8192);
        let (client_read, client_write) = tokio::io::split(client_io);

        let server_task = tokio::spawn(async move {
            let _version = read_version_tag(&mut server_io).await;

            let a = read_query(&mut server_io).await;
            let b = read_query(&mut server_io).await;
            let c = read_query(&mut server_io).await;

            // Respond out of order: C, A, B.
            for query in [&c, &a, &b] {
                write_response(
                    &mut server_io,
                    &Response {
                        response_type: ResponseType::SuccessAtom,
                        token: query.token,
                        response: vec![Datum::Num(query.token as f64)],
                        backtrace: None,
                    },
                )
                .await;
            }
            server_io
        });

        let connection = Connection::from_duplex(client_read, client_write).await.unwrap();

        let (ra, rb, rc) = tokio::join!(
            connection.run::<f64>(r::expr(1.0)),
            connection.run::<f64>(r::expr(2.0)),
            connection.run::<f64>(r::expr(3.0)),
        );

        // Each caller's result equals its own token (assigned by the allocator).
        assert_eq!(ra.unwrap() as u64, 2);
        assert_eq!(rb.unwrap() as u64, 3);
        assert_eq!(rc.unwrap() as u64, 4);

        server_task.await.unwrap();
        connection.dispose().await;
    }

    #[tokio::test]
    async fn dispose_while_pending_resolves_connection_closed() {
        let (client_io, server_io) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);

        let connection = Connection::from_duplex(client_read, client_write).await.unwrap();

        let connection_for_submit = connection.clone();
        let submit_task = tokio::spawn(async move { connection_for_submit.run::<f64>(r::expr(1.0)).await });

        // Give the submission a moment to install its slot before disposing.
        tokio::task::yield_now().await;
        drop(server_io); // also exercises the "peer closed" path concurrently with dispose
        connection.dispose().await;

        let result = submit_task.await.unwrap();
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
