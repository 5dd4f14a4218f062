// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Name resolution for one statement.

use clickhouse_backend_core::{Error, Result, ident::quote_name};
use indexmap::IndexMap;

use super::Compiler;
use crate::{
    expr::{Expr, Fragment},
    lookups::Column,
    model::ModelMeta,
    query::Join
};

const MAX_DEPTH: u8 = 16;

/// Clause an expression is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Clause {
    Select,
    Join,
    Prewhere,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Mutation,
    Insert
}

impl Clause {
    const fn name(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Join => "JOIN",
            Self::Prewhere => "PREWHERE",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::Mutation => "mutations",
            Self::Insert => "INSERT"
        }
    }

    /// Reject aggregate calls outside `SELECT`, `HAVING` and `ORDER BY`.
    pub(crate) fn check_aggregate(self, name: &str) -> Result<()> {
        match self {
            Self::Select | Self::Having | Self::OrderBy => Ok(()),
            Self::Prewhere => Err(Error::not_supported(format!(
                "aggregate {name} is not allowed in PREWHERE"
            ))),
            other => Err(Error::field(format!(
                "aggregate {name} is not allowed in {}",
                other.name()
            )))
        }
    }

    /// Reject window expressions outside `SELECT` and `ORDER BY`.
    pub(crate) fn check_window(self) -> Result<()> {
        match self {
            Self::Select | Self::OrderBy => Ok(()),
            Self::Prewhere => Err(Error::not_supported(
                "window expressions are not allowed in PREWHERE"
            )),
            other => Err(Error::field(format!(
                "window expressions are not allowed in {}",
                other.name()
            )))
        }
    }
}

/// What the first segment of a path names.
pub(crate) enum Target<'q> {
    Column(Column),
    Annotation(&'q Expr)
}

/// Names visible to one statement.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'q> {
    pub(crate) compiler:    &'q Compiler,
    pub(crate) model:       &'q ModelMeta,
    pub(crate) annotations: Option<&'q IndexMap<String, Expr>>,
    pub(crate) joins:       &'q [Join],
    pub(crate) depth:       u8
}

impl<'q> Scope<'q> {
    pub(crate) fn new(compiler: &'q Compiler, model: &'q ModelMeta) -> Self {
        Self {
            compiler,
            model,
            annotations: None,
            joins: &[],
            depth: 0
        }
    }

    pub(crate) const fn with_annotations(mut self, annotations: &'q IndexMap<String, Expr>) -> Self {
        self.annotations = Some(annotations);
        self
    }

    pub(crate) const fn with_joins(mut self, joins: &'q [Join]) -> Self {
        self.joins = joins;
        self
    }

    pub(crate) fn nested(self) -> Result<Self> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::field("annotations reference each other too deeply"));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..self
        })
    }

    pub(crate) fn annotation(&self, name: &str) -> Option<&'q Expr> {
        self.annotations.and_then(|a| a.get(name))
    }

    /// Resolve the leading segments of `segments`.
    ///
    /// Returns the target and the number of segments consumed.
    pub(crate) fn resolve(&self, segments: &[&str], clause: Clause) -> Result<(Target<'q>, usize)> {
        let Some(first) = segments.first().copied() else {
            return Err(Error::field("empty field path"));
        };
        if clause == Clause::Insert {
            return Err(Error::field(format!("INSERT values cannot reference field {first}")));
        }
        let table = quote_name(&self.model.db_table);
        let field = if first == "pk" {
            self.model.pk()
        } else {
            self.model.field(first)
        };
        if let Some(field) = field {
            let sql = format!("{table}.{}", quote_name(field.column_name()));
            return Ok((Target::Column(Column::new(Fragment::new(sql), Some(field.clone()))), 1));
        }
        if let Some(expr) = self.annotation(first) {
            return Ok((Target::Annotation(expr), 1));
        }
        if let Some(join) = self.joins.iter().find(|j| j.alias == first) {
            let name = segments.get(1).copied().ok_or_else(|| {
                Error::field(format!("{first} is a join, name one of its fields"))
            })?;
            let field = join.model.field(name).ok_or_else(|| {
                Error::field(format!("cannot resolve {name} on {}", join.model.name))
            })?;
            let sql = format!("{}.{}", quote_name(&join.alias), quote_name(field.column_name()));
            return Ok((Target::Column(Column::new(Fragment::new(sql), Some(field.clone()))), 2));
        }
        let mut choices: Vec<&str> = self.model.fields.iter().map(|f| f.name.as_str()).collect();
        if let Some(annotations) = self.annotations {
            choices.extend(annotations.keys().map(String::as_str));
        }
        choices.extend(self.joins.iter().map(|j| j.alias.as_str()));
        Err(Error::field(format!(
            "cannot resolve keyword {first} into field. Choices are: {}",
            choices.join(", ")
        )))
    }
}
