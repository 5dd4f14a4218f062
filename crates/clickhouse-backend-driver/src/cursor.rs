// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! DB-API style cursor.
//!
//! A cursor owns one pooled client from creation until [`Cursor::close`] or
//! drop, so statements on a cursor are totally ordered. Results are
//! buffered and consumed with the `fetch*` methods.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_core::{Params, Value};
//! use clickhouse_backend_driver::{
//!     client::QueryResult, cursor::Cursor, mock::MockServer, pool::ConnectionPool
//! };
//!
//! let server = MockServer::new();
//! server.respond("numbers", QueryResult::rows(
//!     vec![vec![Value::from(0_u64)], vec![Value::from(1_u64)]],
//!     vec![]
//! ));
//! let pool = Arc::new(ConnectionPool::new(Arc::new(server), 1, 4).unwrap());
//!
//! let mut cursor = Cursor::open(pool, None).unwrap();
//! cursor.execute("SELECT number FROM numbers(%s)", Params::Positional(vec![Value::from(2)])).unwrap();
//! assert_eq!(cursor.fetchone().unwrap(), Some(vec![Value::from(0_u64)]));
//! assert_eq!(cursor.fetchall().unwrap().len(), 1);
//! cursor.close();
//! ```

use std::{collections::VecDeque, sync::Arc, time::Instant};

use clickhouse_backend_core::{Error, Params, Result, Value};
use indexmap::IndexMap;

use crate::{
    client::{Column, QueryOptions},
    params::{is_insert_query, preview},
    pool::{ConnectionPool, PooledClient},
    transaction::{FAKE_TRANSACTION_SQL, is_transaction_statement}
};

/// Log target of executed statements.
pub const SQL_TARGET: &str = "clickhouse_backend::sql";

/// Cursor-level defaults inherited from the connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorDefaults {
    /// Settings sent with every statement.
    pub settings:         IndexMap<String, Value>,
    /// Turn transaction statements into `SELECT 1`.
    pub fake_transaction: bool
}

/// Statement cursor bound to one pooled client.
#[derive(Debug)]
pub struct Cursor {
    pool:             Arc<ConnectionPool>,
    client:           Option<PooledClient>,
    defaults:         Arc<CursorDefaults>,
    rows:             VecDeque<Vec<Value>>,
    description:      Option<Vec<Column>>,
    rowcount:         i64,
    executed:         bool,
    query_id:         Option<String>,
    settings:         IndexMap<String, Value>,
    query_parameters: IndexMap<String, Value>
}

impl Cursor {
    /// Cursor with default options on a client pulled with `key`.
    ///
    /// # Errors
    ///
    /// Returns the pool error, e.g. [`Error::TooManyConnections`].
    pub fn open(pool: Arc<ConnectionPool>, key: Option<&str>) -> Result<Self> {
        Self::with_defaults(pool, key, Arc::new(CursorDefaults::default()))
    }

    /// Cursor on a client pulled with `key`, inheriting `defaults`.
    ///
    /// # Errors
    ///
    /// Returns the pool error, e.g. [`Error::TooManyConnections`].
    pub fn with_defaults(
        pool: Arc<ConnectionPool>,
        key: Option<&str>,
        defaults: Arc<CursorDefaults>
    ) -> Result<Self> {
        let client = pool.pull(key)?;
        Ok(Self {
            pool,
            client: Some(client),
            defaults,
            rows: VecDeque::new(),
            description: None,
            rowcount: -1,
            executed: false,
            query_id: None,
            settings: IndexMap::new(),
            query_parameters: IndexMap::new()
        })
    }

    fn client(&self) -> Result<&PooledClient> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::interface("cursor is closed"))
    }

    /// Run one statement.
    ///
    /// `INSERT ... VALUES` with [`Params::Rows`] sends the rows through the
    /// column path; everything else is substituted client-side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interface`] on a closed cursor or mismatched
    /// parameters, and server errors unchanged.
    pub fn execute(&mut self, sql: &str, params: impl Into<Params>) -> Result<()> {
        let params = params.into();
        let (sql, params) = if self.defaults.fake_transaction && is_transaction_statement(sql) {
            (FAKE_TRANSACTION_SQL, Params::None)
        } else {
            (sql, params)
        };
        let options = self.options();
        self.reset();
        let started = Instant::now();
        let outcome = self
            .client()?
            .with(|client| client.execute(sql, &params, &options));
        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                tracing::debug!(
                    target: SQL_TARGET,
                    sql,
                    params = ?ParamsPreview(&params),
                    duration_ms,
                    rows = result.rows.len(),
                    "executed"
                );
                self.rowcount = match result.written {
                    Some(written) => written as i64,
                    None => result.rows.len() as i64
                };
                self.description = (!result.columns.is_empty()).then_some(result.columns);
                self.rows = result.rows.into();
                self.executed = true;
                Ok(())
            }
            Err(e) => {
                tracing::debug!(target: SQL_TARGET, sql, duration_ms, error = %e, "failed");
                Err(e)
            }
        }
    }

    /// Run `sql` once per row.
    ///
    /// An `INSERT ... VALUES` collapses into a single columnar insert.
    ///
    /// # Errors
    ///
    /// See [`Cursor::execute`].
    pub fn executemany(&mut self, sql: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        if is_insert_query(sql) {
            return self.execute(sql, Params::Rows(rows));
        }
        let mut total = 0;
        for row in rows {
            self.execute(sql, Params::Positional(row))?;
            total += self.rowcount.max(0);
        }
        self.rowcount = total;
        Ok(())
    }

    /// Next row, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interface`] on a closed cursor or before any
    /// statement was executed.
    pub fn fetchone(&mut self) -> Result<Option<Vec<Value>>> {
        self.check_fetch()?;
        Ok(self.rows.pop_front())
    }

    /// Up to `size` next rows.
    ///
    /// # Errors
    ///
    /// See [`Cursor::fetchone`].
    pub fn fetchmany(&mut self, size: usize) -> Result<Vec<Vec<Value>>> {
        self.check_fetch()?;
        let n = size.min(self.rows.len());
        Ok(self.rows.drain(..n).collect())
    }

    /// Every remaining row.
    ///
    /// # Errors
    ///
    /// See [`Cursor::fetchone`].
    pub fn fetchall(&mut self) -> Result<Vec<Vec<Value>>> {
        self.check_fetch()?;
        Ok(self.rows.drain(..).collect())
    }

    fn check_fetch(&self) -> Result<()> {
        self.client()?;
        if self.executed {
            Ok(())
        } else {
            Err(Error::interface("no results to fetch"))
        }
    }

    /// Rows returned or written by the last statement, `-1` before any.
    #[must_use]
    pub const fn rowcount(&self) -> i64 {
        self.rowcount
    }

    /// Columns of the last result, when the client reported them.
    #[must_use]
    pub fn description(&self) -> Option<&[Column]> {
        self.description.as_deref()
    }

    /// Query id for the next statement only.
    pub fn set_query_id(&mut self, query_id: impl Into<String>) {
        self.query_id = Some(query_id.into());
    }

    /// Settings for every following statement, over the connection's.
    pub fn set_settings(&mut self, settings: IndexMap<String, Value>) {
        self.settings = settings;
    }

    /// Server-side `{name:Type}` parameters for every following statement.
    pub fn set_query_parameters(&mut self, parameters: IndexMap<String, Value>) {
        self.query_parameters = parameters;
    }

    /// Check if the cursor was closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    /// Return the client to the pool. Idempotent.
    pub fn close(&mut self) {
        self.reset();
        if let Some(client) = self.client.take()
            && let Err(e) = self.pool.push(client, false)
        {
            tracing::warn!(error = %e, "failed to return connection to the pool");
        }
    }

    fn options(&mut self) -> QueryOptions {
        let mut settings = self.defaults.settings.clone();
        settings.extend(self.settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        QueryOptions {
            query_id: self.query_id.take(),
            settings,
            query_parameters: self.query_parameters.clone(),
            with_column_types: true,
            ..QueryOptions::default()
        }
    }

    fn reset(&mut self) {
        self.rows.clear();
        self.description = None;
        self.rowcount = -1;
        self.executed = false;
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            tracing::warn!(client = client.id(), "cursor dropped without close, returning connection");
            if let Err(e) = self.pool.push(client, false) {
                tracing::warn!(error = %e, "failed to return connection to the pool");
            }
        }
    }
}

struct ParamsPreview<'a>(&'a Params);

impl std::fmt::Debug for ParamsPreview<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Params::None => f.write_str("None"),
            Params::Positional(values) => f
                .debug_list()
                .entries(values.iter().map(|v| DisplayAsDebug(preview(v))))
                .finish(),
            Params::Named(values) => f
                .debug_map()
                .entries(values.iter().map(|(k, v)| (k, DisplayAsDebug(preview(v)))))
                .finish(),
            Params::Rows(rows) => write!(f, "<{} rows>", rows.len())
        }
    }
}

struct DisplayAsDebug(String);

impl std::fmt::Debug for DisplayAsDebug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
