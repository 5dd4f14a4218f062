// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for common usage.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clickhouse_backend_sql::prelude::*;
//! ```

pub use clickhouse_backend_core::prelude::*;

pub use crate::{
    compiler::{Compiled, Compiler, CompilerOptions},
    expr::{Expr, Frame, FrameBound, NullsOrder, OrderBy, Q},
    functions,
    model::ModelMeta,
    query::{
        DeleteQuery, Explain, ExplainKind, InsertQuery, JoinKind, SelectQuery, UpdateQuery
    },
    schema::{Constraint, Engine, EngineKind, Index, IndexType, SchemaEditor},
    settings::QuerySettings
};
