// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for common usage.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clickhouse_backend_driver::prelude::*;
//! ```

pub use clickhouse_backend_sql::prelude::*;

pub use crate::{
    client::{Client, ClientFactory, Column, QueryOptions, QueryResult},
    connection::DatabaseWrapper,
    cursor::Cursor,
    migrations::{Migration, MigrationRecorder, Migrator, Operation},
    mock::MockServer,
    pool::ConnectionPool,
    settings::{DatabaseOptions, DatabaseSettings},
    transaction::{Transaction, TransactionError}
};
