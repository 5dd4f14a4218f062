// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Transaction support on a database without transactions.
//!
//! ClickHouse has no `BEGIN`/`COMMIT`. With `fake_transaction` enabled the
//! cursor sends `SELECT 1` in place of every transaction statement, so code
//! written against a transactional ORM keeps working; nothing is rolled
//! back. Without it, [`Transaction::run`] refuses to start.
//!
//! # Overview
//!
//! - [`Transaction`]: Entry point wrapping a closure in begin and commit
//! - [`TransactionContext`]: Cursor and savepoint helpers inside the closure
//! - [`TransactionError`]: Which placeholder or body step failed
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_core::Params;
//! use clickhouse_backend_driver::{
//!     connection::DatabaseWrapper, mock::MockServer, settings::DatabaseSettings,
//!     transaction::{Transaction, TransactionError}
//! };
//!
//! let mut settings = DatabaseSettings::default();
//! settings.alias = "tx-doc".into();
//! settings.options.fake_transaction = true;
//! let server = MockServer::new();
//! let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).unwrap();
//!
//! let n: Result<u32, TransactionError> = Transaction::new(&db).run(|ctx| {
//!     ctx.cursor().execute("SELECT 42", Params::None)?;
//!     Ok(42)
//! });
//! assert_eq!(n.unwrap(), 42);
//! assert_eq!(server.statements(), vec!["SELECT 1", "SELECT 42", "SELECT 1"]);
//! ```

use clickhouse_backend_core::{Error, Params, Result, ident::quote_name};
use thiserror::Error;

use crate::{connection::DatabaseWrapper, cursor::Cursor};

/// Statement sent in place of transaction statements.
pub const FAKE_TRANSACTION_SQL: &str = "SELECT 1";

const TRANSACTION_KEYWORDS: [&str; 6] = ["BEGIN", "START", "COMMIT", "ROLLBACK", "SAVEPOINT", "RELEASE"];

/// Check if `sql` is a transaction control statement.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_driver::transaction::is_transaction_statement;
///
/// assert!(is_transaction_statement("SAVEPOINT \"s1\""));
/// assert!(is_transaction_statement(" rollback to savepoint s1"));
/// assert!(!is_transaction_statement("SELECT 1"));
/// ```
#[must_use]
pub fn is_transaction_statement(sql: &str) -> bool {
    let first = sql
        .split(|c: char| c.is_whitespace() || c == ';')
        .find(|word| !word.is_empty())
        .unwrap_or_default();
    TRANSACTION_KEYWORDS
        .iter()
        .any(|keyword| first.eq_ignore_ascii_case(keyword))
}

/// Fake transaction over one connection.
pub struct Transaction<'c> {
    connection: &'c DatabaseWrapper
}

impl<'c> Transaction<'c> {
    /// Fake transaction on `connection`.
    #[must_use]
    pub const fn new(connection: &'c DatabaseWrapper) -> Self {
        Self { connection }
    }

    /// Connection the placeholders are sent on.
    #[must_use]
    pub const fn connection(&self) -> &'c DatabaseWrapper {
        self.connection
    }

    /// Run `f` on one cursor between `BEGIN` and `COMMIT` placeholders, or
    /// `ROLLBACK` when it fails. Nothing `f` sent is undone.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Disabled`] when fake transactions are
    /// off, and the failing step otherwise.
    pub fn run<T, F>(self, f: F) -> std::result::Result<T, TransactionError>
    where
        F: FnOnce(&mut TransactionContext) -> Result<T>
    {
        let settings = self.connection.settings();
        if !settings.options.fake_transaction {
            return Err(TransactionError::Disabled {
                alias: settings.alias.clone()
            });
        }
        let mut cursor = self.connection.cursor().map_err(TransactionError::Begin)?;
        cursor
            .execute("BEGIN", Params::None)
            .map_err(TransactionError::Begin)?;
        let mut ctx = TransactionContext { cursor };
        match f(&mut ctx) {
            Ok(value) => {
                ctx.cursor
                    .execute("COMMIT", Params::None)
                    .map_err(TransactionError::Commit)?;
                ctx.cursor.close();
                Ok(value)
            }
            Err(body) => {
                if let Err(source) = ctx.cursor.execute("ROLLBACK", Params::None) {
                    return Err(TransactionError::Rollback {
                        body,
                        source
                    });
                }
                ctx.cursor.close();
                tracing::debug!(error = %body, "fake transaction rolled back, changes are kept");
                Err(TransactionError::Body(body))
            }
        }
    }
}

/// Active transaction: a cursor plus savepoint helpers.
pub struct TransactionContext {
    cursor: Cursor
}

impl TransactionContext {
    /// Cursor of the transaction.
    pub fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    /// `SAVEPOINT name`.
    ///
    /// # Errors
    ///
    /// Returns the cursor error.
    pub fn savepoint(&mut self, name: &str) -> Result<()> {
        self.cursor
            .execute(&format!("SAVEPOINT {}", quote_name(name)), Params::None)
    }

    /// `ROLLBACK TO SAVEPOINT name`.
    ///
    /// # Errors
    ///
    /// Returns the cursor error.
    pub fn rollback_to(&mut self, name: &str) -> Result<()> {
        self.cursor.execute(
            &format!("ROLLBACK TO SAVEPOINT {}", quote_name(name)),
            Params::None
        )
    }

    /// `RELEASE SAVEPOINT name`.
    ///
    /// # Errors
    ///
    /// Returns the cursor error.
    pub fn release(&mut self, name: &str) -> Result<()> {
        self.cursor
            .execute(&format!("RELEASE SAVEPOINT {}", quote_name(name)), Params::None)
    }
}

/// Step of a fake transaction that failed.
///
/// Placeholders are plain `SELECT 1` round trips, so a failing step means the
/// connection broke. Statements sent before the failure stay applied.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// `fake_transaction` is off for the alias.
    #[error("{alias}: ClickHouse has no transactions, enable fake_transaction")]
    Disabled {
        /// Connection alias.
        alias: String
    },

    /// No cursor, or the `BEGIN` placeholder was not answered.
    #[error("BEGIN placeholder failed: {0}")]
    Begin(#[source] Error),

    /// The body succeeded but the `COMMIT` placeholder was not answered.
    #[error("COMMIT placeholder failed, body statements are already applied: {0}")]
    Commit(#[source] Error),

    /// The body failed and so did the `ROLLBACK` placeholder.
    #[error("ROLLBACK placeholder failed after {body}: {source}")]
    Rollback {
        /// Error returned by the body.
        body:   Error,
        /// Error of the placeholder.
        #[source]
        source: Error
    },

    /// The body failed; nothing it sent is undone.
    #[error("{0} (statements sent before it are kept)")]
    Body(#[source] Error)
}

impl TransactionError {
    /// Check if the body ran to completion before the failure.
    #[must_use]
    pub const fn body_succeeded(&self) -> bool {
        matches!(self, Self::Commit(_))
    }

    /// Error that caused the failure: the body's error when it failed.
    #[must_use]
    pub fn into_cause(self) -> Error {
        match self {
            Self::Disabled {
                alias
            } => Error::not_supported(format!("{alias}: fake_transaction is disabled")),
            Self::Begin(e) | Self::Commit(e) | Self::Body(e) => e,
            Self::Rollback {
                body, ..
            } => body
        }
    }
}

impl From<TransactionError> for Error {
    fn from(e: TransactionError) -> Self {
        e.into_cause()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_case::test_case;

    use super::*;
    use crate::{mock::MockServer, settings::DatabaseSettings};

    fn connection(alias: &str, fake: bool) -> (MockServer, DatabaseWrapper) {
        let mut settings = DatabaseSettings::default();
        settings.alias = alias.into();
        settings.options.fake_transaction = fake;
        settings.options.connections_min = 1;
        let server = MockServer::new();
        let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).unwrap();
        (server, db)
    }

    #[test_case("BEGIN", true)]
    #[test_case("start transaction", true)]
    #[test_case("COMMIT;", true)]
    #[test_case("RELEASE SAVEPOINT \"a\"", true)]
    #[test_case("SELECT 'BEGIN'", false)]
    #[test_case("", false)]
    fn statement_detection(sql: &str, expected: bool) {
        assert_eq!(is_transaction_statement(sql), expected);
    }

    #[test]
    fn requires_fake_transactions() {
        let (server, db) = connection("tx-disabled", false);
        let err = Transaction::new(&db).run(|_| Ok(())).unwrap_err();
        assert!(matches!(err, TransactionError::Disabled { ref alias } if alias == "tx-disabled"));
        assert!(matches!(err.into_cause(), Error::NotSupported(_)));
        assert!(server.statements().is_empty());
    }

    #[test]
    fn failure_rolls_back() {
        let (server, db) = connection("tx-rollback", true);
        let err = Transaction::new(&db)
            .run(|ctx| -> Result<()> {
                ctx.savepoint("s1")?;
                ctx.rollback_to("s1")?;
                ctx.release("s1")?;
                Err(Error::field("boom"))
            })
            .unwrap_err();
        assert!(!err.body_succeeded());
        assert_eq!(err.to_string(), "field error: boom (statements sent before it are kept)");
        assert_eq!(server.statements().len(), 5);
        assert!(server.statements().iter().all(|s| s == FAKE_TRANSACTION_SQL));
        assert_eq!(db.pool().stats().in_use, 0);
    }

    #[test]
    fn failed_rollback_keeps_the_body_error() {
        use std::error::Error as _;

        let err = TransactionError::Rollback {
            body:   Error::field("boom"),
            source: Error::interface("closed")
        };
        assert!(err.source().is_some());
        assert!(!err.body_succeeded());
        let cause: Error = err.into();
        assert!(matches!(cause, Error::Field(_)));

        let commit = TransactionError::Commit(Error::interface("closed"));
        assert!(commit.body_succeeded());
        assert!(matches!(commit.into_cause(), Error::Interface(_)));
    }
}
