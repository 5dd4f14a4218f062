// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Driver interface consumed by the backend.
//!
//! A [`Client`] owns one server connection. The backend never speaks the
//! native protocol itself; it hands SQL text, insert rows and a settings
//! block to the client and reads rows back.
//!
//! # Dispatch
//!
//! [`Client::execute`] decides how a statement travels:
//!
//! | Params | Statement | Path |
//! |--------|-----------|------|
//! | [`Params::Rows`] | `INSERT ... VALUES` | [`Client::process_insert_query`] |
//! | [`Params::Rows`] | anything else | [`Error::Interface`] |
//! | other | any | substitution, then [`Client::process_ordinary_query`] |

use bytes::Bytes;
use clickhouse_backend_core::{Error, Params, Result, Value};
use indexmap::IndexMap;

use crate::{
    params::{is_insert_query, substitute},
    wire::encode_settings
};

/// Identifier of a client, unique within a process.
pub type ClientId = u64;

/// Result column: name and server type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name:    String,
    /// Server type, e.g. `Nullable(String)`.
    pub db_type: String
}

impl Column {
    /// Column `name` of type `db_type`.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name:    name.into(),
            db_type: db_type.into()
        }
    }
}

/// Temporary table sent along with a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalTable {
    /// Table name usable in the query.
    pub name:    String,
    /// Column structure.
    pub columns: Vec<Column>,
    /// Row data.
    pub rows:    Vec<Vec<Value>>
}

/// Per-query options passed to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Query id reported in `system.query_log`.
    pub query_id:          Option<String>,
    /// Server settings for this query.
    pub settings:          IndexMap<String, Value>,
    /// Server-side `{name:Type}` parameters.
    pub query_parameters:  IndexMap<String, Value>,
    /// Request column names and types with the rows.
    pub with_column_types: bool,
    /// Check insert values against column types on the client.
    pub types_check:       bool,
    /// Return data column by column.
    pub columnar:          bool,
    /// Temporary tables.
    pub external_tables:   Vec<ExternalTable>
}

impl QueryOptions {
    /// Settings block of the `QUERY` packet.
    ///
    /// # Errors
    ///
    /// See [`encode_settings`].
    pub fn settings_block(&self) -> Result<Bytes> {
        encode_settings(&self.settings, &self.query_parameters)
    }
}

/// Rows and metadata returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Result rows.
    pub rows:    Vec<Vec<Value>>,
    /// Result columns, when requested.
    pub columns: Vec<Column>,
    /// Rows written by an insert.
    pub written: Option<u64>
}

impl QueryResult {
    /// Result of a `SELECT`.
    #[must_use]
    pub const fn rows(rows: Vec<Vec<Value>>, columns: Vec<Column>) -> Self {
        Self {
            rows,
            columns,
            written: None
        }
    }

    /// Result of an insert.
    #[must_use]
    pub const fn written(count: u64) -> Self {
        Self {
            rows:    Vec::new(),
            columns: Vec::new(),
            written: Some(count)
        }
    }
}

/// One connection to the server.
///
/// Implementations convert their own failures into
/// [`DatabaseError`](clickhouse_backend_core::DatabaseError) and leave
/// [`Client::is_connected`] false after a network error, so the pool drops
/// them instead of reusing them.
pub trait Client: Send {
    /// Identifier of this client.
    fn id(&self) -> ClientId;

    /// Open the connection.
    ///
    /// # Errors
    ///
    /// Returns a database error when the server is unreachable.
    fn connect(&mut self) -> Result<()>;

    /// Close the connection. Idempotent.
    fn disconnect(&mut self);

    /// Check if the connection is open.
    fn is_connected(&self) -> bool;

    /// Run a statement whose text is final.
    ///
    /// # Errors
    ///
    /// Returns the server error unchanged.
    fn process_ordinary_query(&mut self, query: &str, options: &QueryOptions) -> Result<QueryResult>;

    /// Send `INSERT ... VALUES` followed by `rows` as native column data.
    ///
    /// # Errors
    ///
    /// Returns the server error unchanged.
    fn process_insert_query(
        &mut self,
        query: &str,
        rows: &[Vec<Value>],
        options: &QueryOptions
    ) -> Result<u64>;

    /// Connect if needed and run `query` on the path chosen by `params`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interface`] when `params` do not fit the statement,
    /// and server errors unchanged.
    fn execute(&mut self, query: &str, params: &Params, options: &QueryOptions) -> Result<QueryResult> {
        if !self.is_connected() {
            self.connect()?;
        }
        match params {
            Params::Rows(rows) => {
                if !is_insert_query(query) {
                    return Err(Error::interface(
                        "row parameters are only accepted by INSERT ... VALUES"
                    ));
                }
                let written = self.process_insert_query(query, rows, options)?;
                Ok(QueryResult::written(written))
            }
            other => {
                let sql = substitute(query, other)?;
                self.process_ordinary_query(&sql, options)
            }
        }
    }
}

/// Creates clients for a pool.
pub trait ClientFactory: Send + Sync {
    /// New, not yet connected client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when connection parameters are invalid.
    fn create(&self) -> Result<Box<dyn Client>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;

    #[test]
    fn rows_require_insert_values() {
        let server = MockServer::new();
        let mut client = server.create().unwrap();
        let rows = Params::Rows(vec![vec![Value::from(1)]]);
        let err = client
            .execute("SELECT 1", &rows, &QueryOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Interface(_)));

        let result = client
            .execute("INSERT INTO \"t\"(\"a\") VALUES", &rows, &QueryOptions::default())
            .unwrap();
        assert_eq!(result.written, Some(1));
        assert_eq!(server.executed()[0].rows.as_deref(), Some(&[vec![Value::from(1)]][..]));
    }

    #[test]
    fn ordinary_queries_are_substituted() {
        let server = MockServer::new();
        let mut client = server.create().unwrap();
        assert!(!client.is_connected());
        client
            .execute(
                "SELECT %s",
                &Params::Positional(vec![Value::from("x")]),
                &QueryOptions::default()
            )
            .unwrap();
        assert!(client.is_connected());
        assert_eq!(server.executed()[0].sql, "SELECT 'x'");
    }
}
