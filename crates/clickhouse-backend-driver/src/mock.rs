// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! In-memory client for tests.
//!
//! A [`MockServer`] is a [`ClientFactory`]; every client it creates records
//! the statements it receives in the shared log and answers with the
//! response registered for the first matching pattern.
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_core::{Params, Value};
//! use clickhouse_backend_driver::{
//!     client::{ClientFactory, QueryOptions, QueryResult},
//!     mock::MockServer
//! };
//!
//! let server = MockServer::new();
//! server.respond("SELECT 1", QueryResult::rows(vec![vec![Value::from(1_u8)]], vec![]));
//!
//! let mut client = server.create().unwrap();
//! let result = client.execute("SELECT 1", &Params::None, &QueryOptions::default()).unwrap();
//! assert_eq!(result.rows, vec![vec![Value::from(1_u8)]]);
//! assert_eq!(server.statements(), vec!["SELECT 1"]);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering}
};

use clickhouse_backend_core::{DatabaseError, DatabaseErrorKind, Result, Value};
use parking_lot::Mutex;

use crate::{
    client::{Client, ClientFactory, ClientId, QueryOptions, QueryResult},
    wire::{Setting, decode_settings}
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Statement received by a mock client.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    /// Client that ran the statement.
    pub client:   ClientId,
    /// Final SQL text.
    pub sql:      String,
    /// Insert rows sent through the column path.
    pub rows:     Option<Vec<Vec<Value>>>,
    /// Decoded settings block.
    pub settings: Vec<Setting>,
    /// Query id.
    pub query_id: Option<String>
}

#[derive(Debug)]
struct Response {
    pattern: String,
    result:  std::result::Result<QueryResult, DatabaseError>,
    once:    bool
}

#[derive(Debug, Default)]
struct State {
    executed:    Vec<Executed>,
    responses:   Vec<Response>,
    connects:    usize,
    unreachable: bool
}

/// Shared state of mock clients.
#[derive(Debug, Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<State>>
}

impl MockServer {
    /// Server with no registered responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `pattern` with `result`.
    ///
    /// Later registrations take precedence.
    pub fn respond(&self, pattern: impl Into<String>, result: QueryResult) {
        self.push(pattern.into(), Ok(result), false);
    }

    /// Answer the next statement containing `pattern` with `result`.
    pub fn respond_once(&self, pattern: impl Into<String>, result: QueryResult) {
        self.push(pattern.into(), Ok(result), true);
    }

    /// Fail statements containing `pattern`.
    ///
    /// Operational errors also drop the client's connection.
    pub fn fail(&self, pattern: impl Into<String>, error: DatabaseError) {
        self.push(pattern.into(), Err(error), false);
    }

    /// Refuse new connections.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    fn push(
        &self,
        pattern: String,
        result: std::result::Result<QueryResult, DatabaseError>,
        once: bool
    ) {
        self.state.lock().responses.push(Response {
            pattern,
            result,
            once
        });
    }

    /// Every statement received so far.
    #[must_use]
    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().executed.clone()
    }

    /// SQL text of every statement received so far.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .executed
            .iter()
            .map(|e| e.sql.clone())
            .collect()
    }

    /// Forget received statements.
    pub fn clear(&self) {
        self.state.lock().executed.clear();
    }

    /// Number of successful connects.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    fn answer(&self, executed: Executed) -> std::result::Result<QueryResult, DatabaseError> {
        let mut state = self.state.lock();
        let found = state
            .responses
            .iter()
            .rposition(|r| executed.sql.contains(&r.pattern));
        state.executed.push(executed);
        match found {
            Some(i) if state.responses[i].once => state.responses.remove(i).result,
            Some(i) => state.responses[i].result.clone(),
            None => Ok(QueryResult::default())
        }
    }
}

impl ClientFactory for MockServer {
    fn create(&self) -> Result<Box<dyn Client>> {
        Ok(Box::new(MockClient {
            id:        NEXT_ID.fetch_add(1, Ordering::Relaxed),
            server:    self.clone(),
            connected: false
        }))
    }
}

/// Client created by a [`MockServer`].
#[derive(Debug)]
pub struct MockClient {
    id:        ClientId,
    server:    MockServer,
    connected: bool
}

impl MockClient {
    fn run(
        &mut self,
        sql: &str,
        rows: Option<&[Vec<Value>]>,
        options: &QueryOptions
    ) -> Result<QueryResult> {
        let mut block = options.settings_block()?;
        let executed = Executed {
            client:   self.id,
            sql:      sql.to_owned(),
            rows:     rows.map(<[Vec<Value>]>::to_vec),
            settings: decode_settings(&mut block)?,
            query_id: options.query_id.clone()
        };
        match self.server.answer(executed) {
            Ok(result) => Ok(result),
            Err(e) => {
                if e.kind == DatabaseErrorKind::Operational {
                    self.connected = false;
                }
                Err(e.into())
            }
        }
    }
}

impl Client for MockClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn connect(&mut self) -> Result<()> {
        let mut state = self.server.state.lock();
        if state.unreachable {
            return Err(DatabaseError::operational("connection refused").into());
        }
        state.connects += 1;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn process_ordinary_query(&mut self, query: &str, options: &QueryOptions) -> Result<QueryResult> {
        self.run(query, None, options)
    }

    fn process_insert_query(
        &mut self,
        query: &str,
        rows: &[Vec<Value>],
        options: &QueryOptions
    ) -> Result<u64> {
        self.run(query, Some(rows), options)?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_and_once_responses() {
        let server = MockServer::new();
        server.respond("system.tables", QueryResult::rows(vec![vec![Value::from("a")]], vec![]));
        server.respond_once("system.tables", QueryResult::default());
        let mut client = server.create().unwrap();
        client.connect().unwrap();
        let options = QueryOptions::default();
        assert!(client
            .process_ordinary_query("SELECT name FROM system.tables", &options)
            .unwrap()
            .rows
            .is_empty());
        assert_eq!(
            client
                .process_ordinary_query("SELECT name FROM system.tables", &options)
                .unwrap()
                .rows
                .len(),
            1
        );
    }

    #[test]
    fn operational_errors_disconnect() {
        let server = MockServer::new();
        server.fail("boom", DatabaseError::operational("socket closed"));
        server.fail("syntax", DatabaseError::programming("Syntax error"));
        let mut client = server.create().unwrap();
        client.connect().unwrap();
        let options = QueryOptions::default();
        assert!(client.process_ordinary_query("syntax", &options).is_err());
        assert!(client.is_connected());
        assert!(client.process_ordinary_query("boom", &options).is_err());
        assert!(!client.is_connected());
    }

    #[test]
    fn unreachable_server() {
        let server = MockServer::new();
        server.set_unreachable(true);
        let mut client = server.create().unwrap();
        assert!(client.connect().is_err());
        assert_eq!(server.connects(), 0);
    }
}
