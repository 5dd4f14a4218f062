// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Connection wrapper tying settings, pool, compiler and schema editor.
//!
//! One [`DatabaseWrapper`] per alias. Statements compiled by the SQL crate
//! are run through a cursor on the alias' pool; DDL statements are run
//! without substitution.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_driver::{
//!     connection::DatabaseWrapper, mock::MockServer, settings::DatabaseSettings
//! };
//! use clickhouse_backend_sql::prelude::*;
//!
//! let mut settings = DatabaseSettings::default();
//! settings.alias = "connection-doc".into();
//! settings.options.mutations_sync = 2;
//! let server = MockServer::new();
//! let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).unwrap();
//!
//! let event = Arc::new(ModelMeta::builder("event").field(Field::string("protocol")).build().unwrap());
//! db.delete(&DeleteQuery::new(event)).unwrap();
//! assert_eq!(
//!     server.statements(),
//!     vec![r#"ALTER TABLE "event" DELETE WHERE 1 SETTINGS mutations_sync=2"#]
//! );
//! ```

use std::sync::Arc;

use clickhouse_backend_core::{Params, Result, Value};
use clickhouse_backend_sql::{
    compiler::{Compiled, Compiler},
    ops,
    query::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery},
    schema::SchemaEditor
};

use crate::{
    client::ClientFactory,
    cursor::{Cursor, CursorDefaults},
    pool::{ConnectionPool, close_pool, pool_for},
    settings::DatabaseSettings
};

/// Connection to one database alias.
#[derive(Debug)]
pub struct DatabaseWrapper {
    settings: DatabaseSettings,
    pool:     Arc<ConnectionPool>,
    defaults: Arc<CursorDefaults>,
    compiler: Compiler,
    editor:   SchemaEditor
}

impl DatabaseWrapper {
    /// Vendor name reported to the ORM.
    pub const VENDOR: &'static str = ops::VENDOR;

    /// Connect `settings.alias` through the pool registry, creating the pool
    /// with `factory` on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](clickhouse_backend_core::Error::Config) for
    /// invalid settings.
    pub fn new(settings: DatabaseSettings, factory: Arc<dyn ClientFactory>) -> Result<Self> {
        settings.validate()?;
        let pool = pool_for(
            &settings.alias,
            factory,
            settings.options.connections_min,
            settings.options.connections_max
        )?;
        let defaults = Arc::new(CursorDefaults {
            settings:         settings.query_settings()?,
            fake_transaction: settings.options.fake_transaction
        });
        let compiler = Compiler::new(settings.compiler_options());
        let editor = SchemaEditor::new().with_mutations_sync(settings.options.mutations_sync);
        Ok(Self {
            settings,
            pool,
            defaults,
            compiler,
            editor
        })
    }

    /// Settings of this alias.
    #[must_use]
    pub const fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    /// Alias name.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.settings.alias
    }

    /// Pool of this alias.
    #[must_use]
    pub const fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Compiler configured with `mutations_sync` and `batch_threshold`.
    #[must_use]
    pub const fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// DDL builder.
    #[must_use]
    pub const fn schema_editor(&self) -> &SchemaEditor {
        &self.editor
    }

    /// Cursor on a fresh client.
    ///
    /// # Errors
    ///
    /// Returns the pool error.
    pub fn cursor(&self) -> Result<Cursor> {
        Cursor::with_defaults(Arc::clone(&self.pool), None, Arc::clone(&self.defaults))
    }

    /// Cursor on the client held by `key`, shared with other cursors of the
    /// same key.
    ///
    /// # Errors
    ///
    /// Returns the pool error.
    pub fn cursor_for(&self, key: &str) -> Result<Cursor> {
        Cursor::with_defaults(Arc::clone(&self.pool), Some(key), Arc::clone(&self.defaults))
    }

    /// Execute one statement and return its rows.
    ///
    /// # Errors
    ///
    /// Returns the pool, parameter or server error.
    pub fn execute(&self, sql: &str, params: impl Into<Params>) -> Result<Vec<Vec<Value>>> {
        let mut cursor = self.cursor()?;
        cursor.execute(sql, params)?;
        let rows = cursor.fetchall()?;
        cursor.close();
        Ok(rows)
    }

    /// Execute a compiled statement and return `(rowcount, rows)`.
    ///
    /// # Errors
    ///
    /// See [`DatabaseWrapper::execute`].
    pub fn run(&self, compiled: Compiled) -> Result<(i64, Vec<Vec<Value>>)> {
        let mut cursor = self.cursor()?;
        cursor.execute(&compiled.sql, compiled.params)?;
        let rowcount = cursor.rowcount();
        let rows = cursor.fetchall()?;
        cursor.close();
        Ok((rowcount, rows))
    }

    /// Execute DDL statements in order, without substitution.
    ///
    /// # Errors
    ///
    /// Stops at the first failing statement and returns its error.
    pub fn run_ddl(&self, statements: &[String]) -> Result<()> {
        let mut cursor = self.cursor()?;
        for sql in statements {
            cursor.execute(sql, Params::None)?;
        }
        cursor.close();
        Ok(())
    }

    /// Compile and run a `SELECT`.
    ///
    /// # Errors
    ///
    /// Returns the compile or execution error.
    pub fn select(&self, query: &SelectQuery) -> Result<Vec<Vec<Value>>> {
        self.run(self.compiler.select(query)?).map(|(_, rows)| rows)
    }

    /// Compile and run an `INSERT`; returns the written row count.
    ///
    /// # Errors
    ///
    /// Returns the compile or execution error.
    pub fn insert(&self, query: &InsertQuery) -> Result<i64> {
        self.run(self.compiler.insert(query)?).map(|(n, _)| n)
    }

    /// Compile and run an `UPDATE` mutation.
    ///
    /// # Errors
    ///
    /// Returns the compile or execution error.
    pub fn update(&self, query: &UpdateQuery) -> Result<()> {
        self.run(self.compiler.update(query)?).map(|_| ())
    }

    /// Compile and run a `DELETE` mutation.
    ///
    /// # Errors
    ///
    /// Returns the compile or execution error.
    pub fn delete(&self, query: &DeleteQuery) -> Result<()> {
        self.run(self.compiler.delete(query)?).map(|_| ())
    }

    /// Check if the server answers `SELECT 1`.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.execute("SELECT 1", Params::None).is_ok()
    }

    /// Disconnect every client and unregister the pool.
    pub fn close(&self) {
        close_pool(&self.settings.alias);
    }
}

#[cfg(test)]
mod tests {
    use clickhouse_backend_core::{DatabaseError, types::Field};
    use clickhouse_backend_sql::{expr::Q, model::ModelMeta};

    use super::*;
    use crate::{client::QueryResult, mock::MockServer};

    fn connect(alias: &str) -> (MockServer, DatabaseWrapper) {
        let mut settings = DatabaseSettings::default();
        settings.alias = alias.into();
        settings.options.connections_min = 1;
        settings.options.connections_max = 2;
        settings
            .options
            .settings
            .insert("max_threads".into(), serde_json::json!(2));
        let server = MockServer::new();
        let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).unwrap();
        (server, db)
    }

    fn event() -> Arc<ModelMeta> {
        Arc::new(
            ModelMeta::builder("event")
                .field(Field::uint16("port"))
                .field(Field::string("protocol"))
                .build()
                .unwrap()
        )
    }

    #[test]
    fn select_substitutes_and_sends_settings() {
        let (server, db) = connect("connection-select");
        server.respond("FROM \"event\"", QueryResult::rows(vec![vec![Value::from(80_u16)]], vec![]));
        let rows = db
            .select(&SelectQuery::new(event()).values(["port"]).filter(Q::filter("protocol", "TCP")))
            .unwrap();
        assert_eq!(rows, vec![vec![Value::from(80_u16)]]);
        let executed = &server.executed()[0];
        assert_eq!(
            executed.sql,
            "SELECT \"event\".\"port\" FROM \"event\" WHERE \"event\".\"protocol\" = 'TCP'"
        );
        assert_eq!(executed.settings[0].name, "max_threads");
        assert_eq!(db.pool().stats().in_use, 0);
    }

    #[test]
    fn ddl_is_not_substituted() {
        let (server, db) = connect("connection-ddl");
        db.run_ddl(&["ALTER TABLE \"t\" MODIFY COLUMN \"c\" DEFAULT '100%'".to_owned()])
            .unwrap();
        assert_eq!(server.statements()[0], "ALTER TABLE \"t\" MODIFY COLUMN \"c\" DEFAULT '100%'");
    }

    #[test]
    fn validation_happens_before_the_wire() {
        let (server, db) = connect("connection-validation");
        let query = InsertQuery::new(event()).row([("port", Value::from(70_000))]);
        assert!(db.insert(&query).unwrap_err().is_validation());
        assert!(server.statements().is_empty());
    }

    #[test]
    fn usable_and_close() {
        let (server, db) = connect("connection-close");
        assert!(db.is_usable());
        server.fail("SELECT 1", DatabaseError::operational("down"));
        assert!(!db.is_usable());
        assert!(db.pool().stats().issued >= 1);
        db.close();
        let stats = db.pool().stats();
        assert_eq!(stats.idle + stats.in_use, 0);
    }
}
