// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Statement compiler.
//!
//! Compilation is a tree walk producing SQL text and positional parameters.
//! Every compiled `SELECT`, mutation and inline `INSERT` goes through
//! parameter substitution, so literal percent signs in the text are doubled.
//! Columnar inserts carry their rows as [`Params::Rows`] and are sent as is.
//!
//! # Statements
//!
//! | Query | SQL |
//! |-------|-----|
//! | [`SelectQuery`] | `[EXPLAIN ...] SELECT ... [SETTINGS ...] [FORMAT f]` |
//! | [`InsertQuery`] | `INSERT INTO "t"("a","b") [SETTINGS ...] VALUES ...` |
//! | [`UpdateQuery`] | `ALTER TABLE "t" [ON CLUSTER "c"] UPDATE ... WHERE ... SETTINGS mutations_sync=N` |
//! | [`DeleteQuery`] | `ALTER TABLE "t" [ON CLUSTER "c"] DELETE WHERE ... SETTINGS mutations_sync=N` |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_core::types::Field;
//! use clickhouse_backend_sql::{
//!     compiler::Compiler, expr::Q, model::ModelMeta, query::SelectQuery
//! };
//!
//! let event = Arc::new(
//!     ModelMeta::builder("event")
//!         .field(Field::uint16("port"))
//!         .build()
//!         .unwrap()
//! );
//! let compiled = Compiler::default()
//!     .delete(&SelectQuery::new(event).filter(Q::filter("port", 80)).delete())
//!     .unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     r#"ALTER TABLE "event" DELETE WHERE "port" = %s SETTINGS mutations_sync=1"#
//! );
//! ```

mod expr;
mod insert;
mod mutation;
mod scope;
mod select;

use clickhouse_backend_core::{Params, ident::quote_name};

#[cfg(doc)]
use crate::query::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};

/// Row count from which inserts take the columnar path.
pub const BATCH_THRESHOLD: usize = 1000;

/// Per-connection compiler options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// `mutations_sync` sent with every mutation.
    pub mutations_sync:  i64,
    /// Row count from which inserts take the columnar path.
    pub batch_threshold: usize
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            mutations_sync:  1,
            batch_threshold: BATCH_THRESHOLD
        }
    }
}

/// Compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// SQL text.
    pub sql:    String,
    /// Parameters for the driver.
    pub params: Params
}

/// Compiles query IR into SQL.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions
}

impl Compiler {
    /// Compiler with `options`.
    #[must_use]
    pub const fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    #[must_use]
    pub const fn options(&self) -> &CompilerOptions {
        &self.options
    }
}

/// Remove `"table".` qualifiers outside string literals.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_sql::compiler::strip_qualifiers;
///
/// assert_eq!(
///     strip_qualifiers(r#""tbl"."c" = '"tbl".x'"#, "tbl"),
///     r#""c" = '"tbl".x'"#
/// );
/// ```
#[must_use]
pub fn strip_qualifiers(sql: &str, table: &str) -> String {
    let prefix = format!("{}.", quote_name(table));
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    let mut in_string = false;
    while let Some(c) = rest.chars().next() {
        if in_string {
            if c == '\\' {
                let escaped: String = rest.chars().take(2).collect();
                out.push_str(&escaped);
                rest = &rest[escaped.len()..];
                continue;
            }
            if c == '\'' {
                in_string = false;
            }
        } else if c == '\'' {
            in_string = true;
        } else if rest.starts_with(&prefix) {
            rest = &rest[prefix.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn on_cluster(cluster: Option<&str>) -> String {
    cluster.map_or_else(String::new, |c| format!(" ON CLUSTER {}", quote_name(c)))
}
