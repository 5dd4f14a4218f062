// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Driver layer of the ClickHouse ORM backend.
//!
//! Runs what [`clickhouse_backend_sql`] compiles: a per-alias connection
//! pool hands clients to cursors, cursors bind parameters into the SQL text
//! (or route insert rows to the native column path) and the connection
//! wrapper ties it to settings loaded from TOML and the environment.
//!
//! # Overview
//!
//! - [`settings`]: `DatabaseSettings`, TOML and `CLICKHOUSE_` loading
//! - [`client`]: The `Client` trait a native driver implements
//! - [`mock`]: In-memory client recording statements
//! - [`params`]: `%s` and `%(name)s` substitution
//! - [`wire`]: Settings block encoding for query parameters
//! - [`pool`]: Bounded pool and per-alias registry
//! - [`cursor`]: DB-API style cursor
//! - [`connection`]: `DatabaseWrapper`, one per alias
//! - [`transaction`]: Fake transactions
//! - [`migrations`]: Applied-migrations ledger and executor
//! - [`introspection`]: `system.tables`, `system.columns`, `SHOW CREATE TABLE`
//! - [`prelude`]: Convenient re-exports
//!
//! # Logging
//!
//! Executed statements are logged at `debug` under the
//! [`cursor::SQL_TARGET`] target with a `duration_ms` field. No subscriber
//! is installed.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_driver::prelude::*;
//!
//! let mut settings = DatabaseSettings::default();
//! settings.alias = "lib-doc".into();
//! let server = MockServer::new();
//! server.respond("SELECT 1", QueryResult::rows(vec![vec![Value::UInt(1)]], vec![]));
//! let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).unwrap();
//!
//! let mut cursor = db.cursor().unwrap();
//! cursor.execute("SELECT 1", Params::None).unwrap();
//! assert_eq!(cursor.fetchone().unwrap(), Some(vec![Value::UInt(1)]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod connection;
pub mod cursor;
pub mod introspection;
pub mod migrations;
pub mod mock;
pub mod params;
pub mod pool;
pub mod prelude;
pub mod settings;
pub mod transaction;
pub mod wire;
