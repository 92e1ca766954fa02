//! Wire Codec — the external collaborator spec.md §2.1 calls out as "exposes
//! two pure functions": [`query::serialize`] and [`response::deserialize`].
//!
//! Everything else in this module (the `Datum`/`Term` schema) is the data
//! model those two functions operate over. The encoding is a hand-rolled
//! protobuf-compatible wire format (varints, length-delimited fields) in the
//! same spirit as the teacher's `codec.rs`, which keeps header encode/decode
//! as plain functions over `BytesMut`/`Cursor` rather than reaching for a
//! codegen toolchain.

pub mod datum;
pub mod query;
pub mod response;
pub mod term;
pub mod wire;

pub use datum::{Datum, DatumType};
pub use query::{Query, QueryType};
pub use response::{Response, ResponseType};
pub use term::{Term, TermType};
pub use wire::WireError;

pub use query::serialize;
pub use response::deserialize;
