// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Query IR: select, insert, update and delete.
//!
//! Queries are plain values built with chained methods and compiled by
//! [`Compiler`](crate::compiler::Compiler).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_core::types::Field;
//! use clickhouse_backend_sql::{expr::Q, model::ModelMeta, query::SelectQuery};
//!
//! let event = Arc::new(
//!     ModelMeta::builder("event")
//!         .field(Field::uint16("port"))
//!         .build()
//!         .unwrap()
//! );
//! let recent = SelectQuery::new(event)
//!     .filter(Q::filter("port__gte", 1024))
//!     .order_by(["-id"])
//!     .limit(10);
//! let update = recent.clone().update([("port", 0)]);
//! # let _ = update;
//! ```

mod explain;

use std::sync::Arc;

use clickhouse_backend_core::Value;
pub use explain::{Explain, ExplainKind, FORMATS, check_format};
use indexmap::IndexMap;

use crate::{
    expr::{Expr, OrderBy, Q},
    model::ModelMeta,
    settings::QuerySettings
};

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`.
    Inner,
    /// `LEFT OUTER JOIN`.
    LeftOuter,
    /// `RIGHT OUTER JOIN`.
    RightOuter,
    /// `FULL OUTER JOIN`.
    FullOuter,
    /// `CROSS JOIN`, without condition.
    Cross
}

impl JoinKind {
    /// Keyword text.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::LeftOuter => "LEFT OUTER JOIN",
            Self::RightOuter => "RIGHT OUTER JOIN",
            Self::FullOuter => "FULL OUTER JOIN",
            Self::Cross => "CROSS JOIN"
        }
    }
}

/// Joined model, addressed in paths as `alias__field`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type.
    pub kind:  JoinKind,
    /// Joined model.
    pub model: Arc<ModelMeta>,
    /// Alias used in paths and in SQL.
    pub alias: String,
    /// Join condition.
    pub on:    Option<Q>
}

fn and(current: Option<Q>, q: Q) -> Option<Q> {
    Some(match current {
        Some(existing) => existing & q,
        None => q
    })
}

/// `SELECT` over one model.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Base model.
    pub model:       Arc<ModelMeta>,
    /// Selected paths; all model columns when `None`.
    pub columns:     Option<Vec<String>>,
    /// Computed columns, selected after `columns`.
    pub annotations: IndexMap<String, Expr>,
    /// Joined models.
    pub joins:       Vec<Join>,
    /// `PREWHERE` condition.
    pub prewhere:    Option<Q>,
    /// `WHERE` condition.
    pub filter:      Option<Q>,
    /// Explicit `GROUP BY`.
    pub group_by:    Vec<Expr>,
    /// `HAVING` condition.
    pub having:      Option<Q>,
    /// `ORDER BY` items.
    pub order_by:    Vec<OrderBy>,
    /// `LIMIT`.
    pub limit:       Option<u64>,
    /// `OFFSET`.
    pub offset:      Option<u64>,
    /// `SELECT DISTINCT`.
    pub distinct:    bool,
    /// `SELECT DISTINCT ON (...)`.
    pub distinct_on: Vec<Expr>,
    /// `FROM t FINAL`.
    pub final_:      bool,
    /// `SETTINGS`.
    pub settings:    QuerySettings,
    /// `EXPLAIN` prefix.
    pub explain:     Option<Explain>,
    /// `FORMAT` suffix.
    pub format:      Option<String>
}

impl SelectQuery {
    /// Select every column of `model`.
    #[must_use]
    pub fn new(model: Arc<ModelMeta>) -> Self {
        Self {
            model,
            columns: None,
            annotations: IndexMap::new(),
            joins: Vec::new(),
            prewhere: None,
            filter: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            distinct_on: Vec::new(),
            final_: false,
            settings: QuerySettings::new(),
            explain: None,
            format: None
        }
    }

    /// Select only `paths`. With aggregate annotations they become the
    /// implicit `GROUP BY`.
    #[must_use]
    pub fn values<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Add a computed column.
    #[must_use]
    pub fn annotate(mut self, alias: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.annotations.insert(alias.into(), expr.into());
        self
    }

    /// Join `model` as `alias`.
    #[must_use]
    pub fn join(
        mut self,
        kind: JoinKind,
        model: Arc<ModelMeta>,
        alias: impl Into<String>,
        on: Option<Q>
    ) -> Self {
        self.joins.push(Join {
            kind,
            model,
            alias: alias.into(),
            on
        });
        self
    }

    /// AND a `PREWHERE` condition.
    #[must_use]
    pub fn prewhere(mut self, q: Q) -> Self {
        self.prewhere = and(self.prewhere, q);
        self
    }

    /// AND a `WHERE` condition.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        self.filter = and(self.filter, q);
        self
    }

    /// AND a negated `WHERE` condition.
    #[must_use]
    pub fn exclude(self, q: Q) -> Self {
        self.filter(!q)
    }

    /// Explicit `GROUP BY`.
    #[must_use]
    pub fn group_by(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.group_by.extend(exprs);
        self
    }

    /// AND a `HAVING` condition.
    #[must_use]
    pub fn having(mut self, q: Q) -> Self {
        self.having = and(self.having, q);
        self
    }

    /// Order by `"path"` or `"-path"` items.
    #[must_use]
    pub fn order_by<S: AsRef<str>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.order_by
            .extend(items.into_iter().map(|s| OrderBy::parse(s.as_ref())));
        self
    }

    /// Order by arbitrary items.
    #[must_use]
    pub fn order_by_items(mut self, items: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by.extend(items);
        self
    }

    /// `LIMIT n`.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `OFFSET n`.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// `SELECT DISTINCT`.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `SELECT DISTINCT ON (exprs)`.
    #[must_use]
    pub fn distinct_on(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.distinct_on.extend(exprs);
        self
    }

    /// `FROM t FINAL`.
    #[must_use]
    pub const fn final_rows(mut self) -> Self {
        self.final_ = true;
        self
    }

    /// Add a query setting.
    #[must_use]
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(name, value);
        self
    }

    /// Prefix with `EXPLAIN`.
    #[must_use]
    pub fn explain(mut self, explain: Explain) -> Self {
        self.explain = Some(explain);
        self
    }

    /// Append `FORMAT format`.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Mutation updating the rows matched by this query.
    #[must_use]
    pub fn update<S, E>(self, assignments: impl IntoIterator<Item = (S, E)>) -> UpdateQuery
    where
        S: Into<String>,
        E: Into<Value>
    {
        UpdateQuery {
            model:       self.model,
            assignments: assignments
                .into_iter()
                .map(|(k, v)| (k.into(), Expr::Value(v.into())))
                .collect(),
            filter:      self.filter,
            settings:    self.settings
        }
    }

    /// Mutation deleting the rows matched by this query.
    #[must_use]
    pub fn delete(self) -> DeleteQuery {
        DeleteQuery {
            model:    self.model,
            filter:   self.filter,
            settings: self.settings
        }
    }
}

/// `INSERT` of rows into one model.
///
/// Rows map field names to values or expressions. Missing fields take the
/// field default, then `NULL`; a missing integer primary key is generated.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    /// Target model.
    pub model:    Arc<ModelMeta>,
    /// Inserted fields; all model fields when empty.
    pub fields:   Vec<String>,
    /// Rows keyed by field name.
    pub rows:     Vec<IndexMap<String, Expr>>,
    /// `SETTINGS`.
    pub settings: QuerySettings
}

impl InsertQuery {
    /// Insert into every column of `model`.
    #[must_use]
    pub fn new(model: Arc<ModelMeta>) -> Self {
        Self {
            model,
            fields: Vec::new(),
            rows: Vec::new(),
            settings: QuerySettings::new()
        }
    }

    /// Restrict the inserted fields.
    #[must_use]
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add a row of values.
    #[must_use]
    pub fn row<S, V>(mut self, values: impl IntoIterator<Item = (S, V)>) -> Self
    where
        S: Into<String>,
        V: Into<Value>
    {
        self.rows.push(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), Expr::Value(v.into())))
                .collect()
        );
        self
    }

    /// Add a row that may contain expressions.
    #[must_use]
    pub fn row_exprs<S: Into<String>>(mut self, values: impl IntoIterator<Item = (S, Expr)>) -> Self {
        self.rows
            .push(values.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Add a query setting.
    #[must_use]
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(name, value);
        self
    }
}

/// `ALTER TABLE ... UPDATE` mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    /// Target model.
    pub model:       Arc<ModelMeta>,
    /// Field name to new value.
    pub assignments: IndexMap<String, Expr>,
    /// Matched rows; every row when `None`.
    pub filter:      Option<Q>,
    /// `SETTINGS`, merged over `mutations_sync`.
    pub settings:    QuerySettings
}

impl UpdateQuery {
    /// Update without assignments.
    #[must_use]
    pub fn new(model: Arc<ModelMeta>) -> Self {
        Self {
            model,
            assignments: IndexMap::new(),
            filter: None,
            settings: QuerySettings::new()
        }
    }

    /// Assign an expression to a field.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.assignments.insert(field.into(), expr.into());
        self
    }

    /// AND a condition.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        self.filter = and(self.filter, q);
        self
    }

    /// Add a query setting.
    #[must_use]
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(name, value);
        self
    }
}

/// `ALTER TABLE ... DELETE` mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    /// Target model.
    pub model:    Arc<ModelMeta>,
    /// Matched rows; every row when `None`.
    pub filter:   Option<Q>,
    /// `SETTINGS`, merged over `mutations_sync`.
    pub settings: QuerySettings
}

impl DeleteQuery {
    /// Delete every row.
    #[must_use]
    pub fn new(model: Arc<ModelMeta>) -> Self {
        Self {
            model,
            filter: None,
            settings: QuerySettings::new()
        }
    }

    /// AND a condition.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        self.filter = and(self.filter, q);
        self
    }

    /// Add a query setting.
    #[must_use]
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(name, value);
        self
    }
}
