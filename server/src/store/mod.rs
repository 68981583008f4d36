//! Access to the remote backend-as-a-service that owns all persistent data.
//!
//! Handlers only ever need three shapes of call: select rows by exact match,
//! insert one record, and invoke a named stored procedure. Both the REST
//! client and the in-memory double implement exactly that.

pub mod memory;
pub mod rest;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use memory::{MemoryStore, StoreCall};
pub use rest::RestStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("uniqueness conflict: {0}")]
    Conflict(String),

    #[error("unknown remote procedure: {0}")]
    UnknownProcedure(String),
}

pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

pub trait PollStore: Send + Sync {
    /// Rows of `table` whose `column = value` for every filter pair.
    /// `columns` is a comma-separated projection, `*` for whole rows.
    fn select_eq<'a>(
        &'a self,
        table: &'a str,
        columns: &'a str,
        filters: &'a [(&'a str, &'a str)],
    ) -> StoreFuture<'a, Vec<Value>>;

    fn insert<'a>(&'a self, table: &'a str, record: Value) -> StoreFuture<'a, ()>;

    /// Calls a stored procedure with string-keyed arguments.
    fn rpc<'a>(&'a self, function: &'a str, args: Value) -> StoreFuture<'a, Value>;
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

/// Stored procedures used by the handlers all return JSON arrays.
pub fn expect_array(value: Value) -> Result<Vec<Value>, StoreError> {
    Ok(serde_json::from_value(value)?)
}
