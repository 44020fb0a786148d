//! `turso-http` is an async HTTP client for the Turso database v2 pipeline
//! API.
//!
//! One logical call sends one POST carrying an ordered list of SQL
//! statements and maps the ordered results back to typed values:
//! - [`Database::query`] / [`Database::query_one`] for raw row tuples
//! - [`Database::query_as`] for decoding rows into your own record types
//! - [`Database::execute`] and the [`Insertable`] helpers for writes
//! - [`Database::batch`] / [`Database::transaction`] for several operations
//!   in a single round trip

mod batch;
mod client;
mod decode;
mod error;
mod model;
mod options;
mod stmt;
mod value;
mod wire;

pub use batch::{Batch, DecodedRows, StatementOutcome, Transaction};
pub use client::Database;
pub use error::TursoError;
pub use model::{Insertable, MultiTableInsert, Queryable};
pub use options::ClientOptions;
pub use value::{Arg, Value};

pub type Result<T> = std::result::Result<T, TursoError>;
