// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! SQL compiler for the ClickHouse ORM backend.
//!
//! Models are plain [`model::ModelMeta`] values. Queries are built as IR
//! ([`query`]) over [`expr`] trees and compiled into SQL text plus
//! parameters by [`compiler::Compiler`]; schema changes are compiled into
//! DDL by [`schema::SchemaEditor`].
//!
//! # Overview
//!
//! - [`model`]: Model metadata and its builder
//! - [`expr`]: Expressions, filters and `__` paths
//! - [`lookups`]: Lookup and transform compilation per column kind
//! - [`functions`]: Aggregates, window functions, dates and hashes
//! - [`query`]: `SELECT`, `INSERT`, `UPDATE`, `DELETE` and `EXPLAIN` IR
//! - [`compiler`]: IR to SQL
//! - [`schema`]: Engines, skip-indexes, constraints and DDL
//! - [`introspection`]: Type strings and `SHOW CREATE TABLE` decoding
//! - [`settings`]: Query `SETTINGS`
//! - [`ops`]: Dialect tables exposed to the ORM
//! - [`prelude`]: Convenient re-exports
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_sql::prelude::*;
//!
//! let author = Arc::new(
//!     ModelMeta::builder("author")
//!         .field(Field::string("show"))
//!         .field(Field::int32("episode"))
//!         .build()
//!         .unwrap()
//! );
//! let query = SelectQuery::new(author)
//!     .values(["show", "episode"])
//!     .annotate("uid_count", functions::uniq(vec![Expr::Star]));
//! let compiled = Compiler::default().select(&query).unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     r#"SELECT "author"."show", "author"."episode", uniq(*) AS "uid_count" FROM "author" GROUP BY "author"."show", "author"."episode""#
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod expr;
pub mod functions;
pub mod introspection;
pub mod lookups;
pub mod model;
pub mod ops;
pub mod prelude;
pub mod query;
pub mod schema;
pub mod settings;
