// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Core types for the ClickHouse ORM backend.
//!
//! This crate holds everything the SQL compiler and the driver layer share:
//! column types, values, literal escaping, errors and the Snowflake id
//! worker.
//!
//! # Overview
//!
//! - [`types::Field`]: Column descriptor with `db_type`, `prep_value`,
//!   `from_db` and `validate`
//! - [`Value`]: In-memory value exchanged with fields and drivers
//! - [`escape`]: Literal SQL rendering
//! - [`snowflake`]: Primary key synthesis
//! - [`Error`]: Error type used by every crate of the backend
//! - [`prelude`]: Convenient re-exports
//!
//! # Usage
//!
//! ```rust
//! use clickhouse_backend_core::prelude::*;
//!
//! let port = Field::uint16("port");
//! assert_eq!(port.clean(&Value::from("8080")).unwrap(), Value::Int(8080));
//! assert!(port.clean(&Value::from(70_000)).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub mod escape;
pub mod ident;
mod params;
pub mod prelude;
pub mod snowflake;
pub mod types;
mod value;

pub use error::{DatabaseError, DatabaseErrorKind, Error, Result, ValidationError};
pub use params::Params;
pub use value::Value;
