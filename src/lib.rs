// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

//! # clickhouse-backend
//!
//! One crate, all layers. Re-exports:
//! - Field types, values, escaping and errors from `clickhouse-backend-core`
//! - The SQL compiler as [`sql`] (`clickhouse-backend-sql`)
//! - Pool, cursor, migrations and introspection as [`driver`]
//!   (`clickhouse-backend-driver`)
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend::prelude::*;
//!
//! let mut settings = DatabaseSettings::default();
//! settings.alias = "quick-start".into();
//! settings.options.mutations_sync = 2;
//! let server = MockServer::new();
//! let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).unwrap();
//!
//! let event = Arc::new(
//!     ModelMeta::builder("event")
//!         .field(Field::int32("id").primary_key())
//!         .field(Field::string("protocol"))
//!         .build()
//!         .unwrap()
//! );
//! db.update(&UpdateQuery::new(event).set("protocol", Value::from("TCP")).filter(Q::filter("id", 5)))
//!     .unwrap();
//! assert_eq!(
//!     server.statements(),
//!     vec![r#"ALTER TABLE "event" UPDATE "protocol" = 'TCP' WHERE "id" = 5 SETTINGS mutations_sync=2"#]
//! );
//! ```

pub mod prelude;

pub use clickhouse_backend_core::*;
pub use clickhouse_backend_driver as driver;
pub use clickhouse_backend_sql as sql;
