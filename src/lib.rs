//! A client for a document-oriented database's query protocol: a fluent
//! query-tree builder, a length-prefixed binary wire format, and a
//! token-multiplexed connection that lets many queries share one socket.
//!
//! # Examples
//!
//! ```rust,no_run
//! use docql::{Connection, TermExt, r};
//!
//! #[tokio::main]
//! async fn main() -> docql::Result<()> {
//!     let connection = Connection::connect(&["localhost:28015"]).await?;
//!
//!     let name: String = connection.run(r::table("users").get("u1")).await?;
//!     println!("got {name}");
//!
//!     let mut cursor = connection.run_cursor::<f64>(r::table("scores").limit(10));
//!     while cursor.advance().await? {
//!         println!("{}", cursor.current());
//!     }
//!
//!     connection.dispose().await;
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod connection;
pub mod convert;
pub mod cursor;
pub mod error;
mod pending;
pub mod proto;
mod reader;
mod token;
mod transport;
mod writer;

pub use ast::{TermExt, r};
pub use connection::{CONNECT_DEADLINE, Connection, REQUEST_DEADLINE};
pub use convert::{ConvertError, DatumConverterFactory, FromDatum, Value};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use proto::{Datum, Term};
