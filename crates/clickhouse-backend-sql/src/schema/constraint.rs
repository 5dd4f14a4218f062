// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Table constraints.
//!
//! ClickHouse enforces `CHECK` constraints on insert. Unique constraints are
//! accepted so models stay portable, but no DDL is emitted for them.

use clickhouse_backend_core::ident::quote_name;

/// Table-level constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `CONSTRAINT name CHECK (expr)`.
    Check {
        /// Constraint name.
        name: String,
        /// Boolean SQL expression.
        expr: String
    },
    /// Unique constraint, never emitted.
    Unique {
        /// Constraint name.
        name:   String,
        /// Covered fields.
        fields: Vec<String>
    }
}

impl Constraint {
    /// Check constraint.
    pub fn check(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self::Check {
            name: name.into(),
            expr: expr.into()
        }
    }

    /// Unique constraint.
    pub fn unique<S: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self::Unique {
            name:   name.into(),
            fields: fields.into_iter().map(Into::into).collect()
        }
    }

    /// Constraint name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Check { name, .. } | Self::Unique { name, .. } => name
        }
    }

    /// Definition inside `CREATE TABLE` or after `ADD`, `None` when the
    /// constraint emits no DDL.
    #[must_use]
    pub fn definition(&self) -> Option<String> {
        match self {
            Self::Check { name, expr } => {
                Some(format!("CONSTRAINT {} CHECK ({expr})", quote_name(name)))
            }
            Self::Unique { .. } => None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_definition() {
        let c = Constraint::check("port_range", "port > 0");
        assert_eq!(
            c.definition().as_deref(),
            Some("CONSTRAINT \"port_range\" CHECK (port > 0)")
        );
        assert_eq!(c.name(), "port_range");
    }

    #[test]
    fn unique_emits_nothing() {
        assert_eq!(Constraint::unique("u", ["a", "b"]).definition(), None);
    }
}
