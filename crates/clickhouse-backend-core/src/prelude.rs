// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for common usage.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clickhouse_backend_core::prelude::*;
//! ```

pub use crate::{
    DatabaseError, DatabaseErrorKind, Error, Params, Result, ValidationError, Value,
    snowflake::IdWorker,
    types::{
        DbDefault, EnumChoice, EnumWidth, Field, FieldKind, HostFieldKind, IntWidth, IpProtocol,
        TupleElement
    }
};
