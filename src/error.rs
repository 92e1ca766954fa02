// Error taxonomy for docql — mirrors the structure of the teacher's
// `client/error.rs`: one `thiserror` enum, `#[from]` conversions for the
// underlying I/O and wire-codec errors, and a crate-level `Result` alias.

use crate::proto::WireError;
use std::io;
use thiserror::Error;

/// Comprehensive error type for docql client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// DNS resolution failed for an endpoint during `Connect`.
    #[error("DNS resolution failed for {endpoint}: {source}")]
    DnsResolution { endpoint: String, source: io::Error },

    /// TCP connect failed for a resolved endpoint.
    #[error("connect failed for {endpoint}: {source}")]
    ConnectFailed { endpoint: String, source: io::Error },

    /// The overall connect deadline elapsed before any endpoint succeeded.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    /// Every candidate endpoint failed during `Connect`.
    #[error("no connectable address among the given endpoints")]
    NoConnectableAddress,

    /// The connection was closed, either by the remote peer or by a local
    /// `Dispose`, while a request was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// A submission's deadline elapsed before its response arrived.
    #[error("request timed out")]
    RequestTimedOut,

    /// Server reported a client-side error (malformed query).
    #[error("client error: {message}")]
    ClientError { message: String, backtrace: Option<Vec<u64>> },

    /// Server reported a compile-time error in the query tree.
    #[error("compile error: {message}")]
    CompileError { message: String, backtrace: Option<Vec<u64>> },

    /// Server reported a runtime error while executing the query.
    #[error("runtime error: {message}")]
    RuntimeError { message: String, backtrace: Option<Vec<u64>> },

    /// A SUCCESS response carried a response count other than the one
    /// required by the caller (e.g. an atom query expects exactly one datum).
    #[error("unexpected response shape: expected {expected} datum(s), got {actual}")]
    UnexpectedResponseShape { expected: usize, actual: usize },

    /// An unknown response type, an orphaned token, or a malformed frame.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Failure decoding a frame's payload via the wire codec.
    #[error("wire codec error: {0}")]
    Codec(#[from] WireError),

    /// Underlying I/O failure not otherwise classified above.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for docql operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps a non-success [`crate::proto::Response`] to the appropriate
    /// error variant, per spec.md §4.6's "Run primitive" response mapping.
    pub(crate) fn from_response(response: &crate::proto::Response) -> Self {
        use crate::proto::ResponseType::*;

        let message = response
            .response
            .first()
            .and_then(|datum| match datum {
                crate::proto::Datum::Str(s) => Some(s.clone()),
                other => Some(format!("{other:?}")),
            })
            .unwrap_or_else(|| "<no message>".to_string());
        let backtrace = response.backtrace.clone();

        match response.response_type {
            ClientError => Error::ClientError { message, backtrace },
            CompileError => Error::CompileError { message, backtrace },
            RuntimeError => Error::RuntimeError { message, backtrace },
            SuccessAtom | SuccessSequence | SuccessPartial => Error::ProtocolViolation(
                "from_response called on a success response".to_string(),
            ),
        }
    }
}
