// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Statement parameters.
//!
//! Compiled statements carry `%s` (positional) or `%(name)s` (named)
//! placeholders. Batch inserts carry a row matrix that travels through the
//! native column path instead of being substituted into the text.

use indexmap::IndexMap;

use crate::Value;

/// Parameters bound to a statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// No parameters; the statement text is sent as-is.
    #[default]
    None,
    /// Values for `%s` placeholders, in order.
    Positional(Vec<Value>),
    /// Values for `%(name)s` placeholders.
    Named(IndexMap<String, Value>),
    /// Row matrix for `INSERT ... VALUES`.
    Rows(Vec<Vec<Value>>)
}

impl Params {
    /// Check if there is nothing to bind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Positional(v) => v.is_empty(),
            Self::Named(v) => v.is_empty(),
            Self::Rows(v) => v.is_empty()
        }
    }

    /// Number of bound values or rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Positional(v) => v.len(),
            Self::Named(v) => v.len(),
            Self::Rows(v) => v.len()
        }
    }

    /// Check if these parameters are an insert row matrix.
    #[must_use]
    pub const fn is_rows(&self) -> bool {
        matches!(self, Self::Rows(_))
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl From<Vec<Vec<Value>>> for Params {
    fn from(rows: Vec<Vec<Value>>) -> Self {
        Self::Rows(rows)
    }
}

impl From<IndexMap<String, Value>> for Params {
    fn from(values: IndexMap<String, Value>) -> Self {
        Self::Named(values)
    }
}
