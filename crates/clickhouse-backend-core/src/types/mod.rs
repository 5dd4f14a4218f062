// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! ClickHouse column types.
//!
//! A [`Field`] pairs a logical [`FieldKind`] with the `Nullable` and
//! `LowCardinality` wrappers and exposes the operations every layer needs:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`Field::db_type`] | Column type string for DDL |
//! | [`Field::check`] | Declaration rules, at model build time |
//! | [`Field::prep_value`] | Host value to driver value |
//! | [`Field::from_db`] | Driver value to host value |
//! | [`Field::validate`] | Value rules before the wire |
//!
//! # Wrapper rules
//!
//! | Kind | `Nullable` | `LowCardinality` |
//! |------|------------|------------------|
//! | integers, floats, `Bool`, `String`, `FixedString`, `Date`, `Date32`, `DateTime` | yes | yes |
//! | `UUID`, `DateTime64`, `Enum`, `IPv4`, `IPv6`, `Decimal` | yes | no |
//! | `Array`, `Tuple`, `Map`, `JSON` | no | no |

mod convert;
mod field;
mod host;
mod kind;
mod validate;

pub(crate) use convert::scalar_text;
pub use field::{DbDefault, Field};
pub use host::HostFieldKind;
pub use kind::{EnumChoice, EnumWidth, FieldKind, IntWidth, IpProtocol, TupleElement};
