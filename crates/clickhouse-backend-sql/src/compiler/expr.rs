// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Expression and filter compilation.

use clickhouse_backend_core::{
    Error, Result,
    escape::{escape_value, quote_string},
    ident::quote_name
};

use super::scope::{Clause, Scope, Target};
use crate::{
    expr::{Expr, Fragment, Func, FuncKind, NullsOrder, OrderBy, Q, Rhs, Window},
    introspection::parse_type,
    lookups::{self, Column, Operand}
};

impl Scope<'_> {
    /// Compile a `__`-separated path used as a value.
    fn path(&self, path: &str, clause: Clause) -> Result<Column> {
        let segments: Vec<&str> = path.split("__").collect();
        let (column, consumed) = self.target(&segments, clause)?;
        segments[consumed..]
            .iter()
            .try_fold(column, |column, segment| lookups::transform(column, segment))
    }

    fn target(&self, segments: &[&str], clause: Clause) -> Result<(Column, usize)> {
        match self.resolve(segments, clause)? {
            (Target::Column(column), consumed) => Ok((column, consumed)),
            (Target::Annotation(expr), consumed) => Ok((self.nested()?.expr(expr, clause)?, consumed))
        }
    }

    /// Compile an expression.
    pub(crate) fn expr(&self, expr: &Expr, clause: Clause) -> Result<Column> {
        match expr {
            Expr::Field(path) => self.path(path, clause),
            Expr::Ref(alias) => Ok(Column::new(Fragment::new(quote_name(alias)), None)),
            Expr::Value(value) => Ok(Column::new(Fragment::param(value.clone()), None)),
            Expr::Literal(value) => Ok(Column::new(
                Fragment::new(escape_value(value).replace('%', "%%")),
                None
            )),
            Expr::Raw(fragment) => Ok(Column::new(fragment.clone(), None)),
            Expr::Star => Ok(Column::new(Fragment::new("*"), None)),
            Expr::Func(func) => self.func(func, clause, false),
            Expr::Window(window) => self.window(window, clause),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs, clause)?;
                let rhs = self.expr(rhs, clause)?;
                let sql = Fragment::join([lhs.sql, rhs.sql], &format!(" {} ", op.as_sql()));
                Ok(Column::new(sql.map(|s| format!("({s})")), None))
            }
            Expr::Cast { expr, db_type } => {
                let inner = self.expr(expr, clause)?;
                let field = parse_type(db_type).ok().and_then(|d| d.field(""));
                let db_type = quote_string(db_type).replace('%', "%%");
                Ok(Column::new(
                    inner.sql.map(|s| format!("CAST({s}, {db_type})")),
                    field
                ))
            }
            Expr::Case { whens, default } => {
                let mut parts = vec![Fragment::new("CASE")];
                let mut field = None;
                for (condition, result) in whens {
                    parts.push(Fragment::new("WHEN"));
                    parts.push(self.q(condition, clause)?);
                    parts.push(Fragment::new("THEN"));
                    let result = self.expr(result, clause)?;
                    field = field.or(result.field);
                    parts.push(result.sql);
                }
                if let Some(default) = default {
                    parts.push(Fragment::new("ELSE"));
                    parts.push(self.expr(default, clause)?.sql);
                }
                parts.push(Fragment::new("END"));
                Ok(Column::new(Fragment::join(parts, " "), field))
            }
            Expr::Subquery(query) => {
                let sql = self.compiler.select_fragment(query)?;
                Ok(Column::new(sql.map(|s| format!("({s})")), None))
            }
        }
    }

    fn func(&self, func: &Func, clause: Clause, windowed: bool) -> Result<Column> {
        match func.kind {
            FuncKind::Aggregate if !windowed => clause.check_aggregate(&func.name)?,
            FuncKind::Window if !windowed => {
                return Err(Error::field(format!("{} can only be used with OVER", func.name)));
            }
            _ => {}
        }
        let inner = if func.kind == FuncKind::Aggregate { Clause::Where } else { clause };
        let mut args = Vec::with_capacity(func.args.len() + 1);
        for arg in &func.args {
            args.push(self.expr(arg, inner)?.sql);
        }
        let mut name = func.name.clone();
        if let Some(filter) = &func.filter {
            if func.distinct {
                return Err(Error::not_supported(format!(
                    "{} cannot combine DISTINCT with a filter",
                    func.name
                )));
            }
            if matches!(func.args.as_slice(), [Expr::Star]) {
                args.clear();
            }
            name.push_str("If");
            args.push(self.q(filter, inner)?);
        }
        let mut head = Fragment::new(name);
        if !func.params.is_empty() {
            let mut params = Vec::with_capacity(func.params.len());
            for param in &func.params {
                params.push(self.expr(param, inner)?.sql);
            }
            head = Fragment::join([head, Fragment::join(params, ", ").map(|p| format!("({p})"))], "");
        }
        let args = Fragment::join(args, ", ").map(|a| {
            if func.distinct {
                format!("(DISTINCT {a})")
            } else {
                format!("({a})")
            }
        });
        Ok(Column::new(Fragment::join([head, args], ""), func.output.clone()))
    }

    fn window(&self, window: &Window, clause: Clause) -> Result<Column> {
        clause.check_window()?;
        let column = match window.expr.as_ref() {
            Expr::Func(func) => self.func(func, clause, true)?,
            other => {
                return Err(Error::field(format!(
                    "OVER needs an aggregate or window function, got {other:?}"
                )));
            }
        };
        let mut spec = Vec::new();
        if !window.partition_by.is_empty() {
            let mut parts = Vec::with_capacity(window.partition_by.len());
            for expr in &window.partition_by {
                parts.push(self.expr(expr, Clause::OrderBy)?.sql);
            }
            spec.push(Fragment::join(parts, ", ").map(|s| format!("PARTITION BY {s}")));
        }
        if !window.order_by.is_empty() {
            spec.push(self.order_by(&window.order_by)?.map(|s| format!("ORDER BY {s}")));
        }
        if let Some(frame) = &window.frame {
            spec.push(Fragment::new(frame.as_sql()));
        }
        let spec = Fragment::join(spec, " ").map(|s| format!("OVER ({s})"));
        Ok(Column::new(Fragment::join([column.sql, spec], " "), column.field))
    }

    /// Compile `ORDER BY` items without the keyword.
    pub(crate) fn order_by(&self, items: &[OrderBy]) -> Result<Fragment> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let column = self.expr(&item.expr, Clause::OrderBy)?;
            let direction = if item.descending { "DESC" } else { "ASC" };
            let nulls = match item.nulls {
                Some(NullsOrder::First) => " NULLS FIRST",
                Some(NullsOrder::Last) => " NULLS LAST",
                None => ""
            };
            parts.push(column.sql.map(|s| format!("{s} {direction}{nulls}")));
        }
        Ok(Fragment::join(parts, ", "))
    }

    /// Compile a filter tree.
    pub(crate) fn q(&self, q: &Q, clause: Clause) -> Result<Fragment> {
        match q {
            Q::Lookup { path, rhs } => self.lookup(path, rhs, clause),
            Q::And(items) if items.is_empty() => Ok(Fragment::new("1")),
            Q::Or(items) if items.is_empty() => Ok(Fragment::new("0")),
            Q::And(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    let part = self.q(item, clause)?;
                    parts.push(match item {
                        Q::Or(inner) if inner.len() > 1 => part.map(|s| format!("({s})")),
                        _ => part
                    });
                }
                Ok(Fragment::join(parts, " AND "))
            }
            Q::Or(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.q(item, clause)?);
                }
                Ok(Fragment::join(parts, " OR "))
            }
            Q::Not(inner) => Ok(self.q(inner, clause)?.map(|s| format!("NOT ({s})"))),
            Q::Expr(expr) => Ok(self.expr(expr, clause)?.sql)
        }
    }

    fn lookup(&self, path: &str, rhs: &Rhs, clause: Clause) -> Result<Fragment> {
        let segments: Vec<&str> = path.split("__").collect();
        let (column, consumed) = self.target(&segments, clause)?;
        let (transforms, lookup) = lookups::split_lookup(&segments[consumed..]);
        let column = transforms
            .iter()
            .try_fold(column, |column, segment| lookups::transform(column, segment))?;
        let operand = match rhs {
            Rhs::Value(value) => Operand::Value(value.clone()),
            Rhs::Expr(expr) => Operand::Sql(self.expr(expr, clause)?.sql),
            Rhs::Query(query) => Operand::Query(self.compiler.select_fragment(query)?)
        };
        lookups::compile(column, lookup, operand)
    }
}

/// Check if `expr` contains an aggregate outside a window.
pub(crate) fn contains_aggregate(expr: &Expr, scope: &Scope<'_>) -> bool {
    aggregate_in(expr, scope, 0)
}

fn aggregate_in(expr: &Expr, scope: &Scope<'_>, depth: u8) -> bool {
    if depth > 16 {
        return false;
    }
    let nested = |e: &Expr| aggregate_in(e, scope, depth + 1);
    match expr {
        Expr::Func(func) => func.kind == FuncKind::Aggregate || func.args.iter().any(nested),
        Expr::Field(path) => {
            let first = path.split("__").next().unwrap_or_default();
            scope.model.field(first).is_none() && scope.annotation(first).is_some_and(nested)
        }
        Expr::Binary { lhs, rhs, .. } => nested(lhs) || nested(rhs),
        Expr::Cast { expr, .. } => nested(expr),
        Expr::Case { whens, default } => {
            whens.iter().any(|(_, e)| nested(e)) || default.as_deref().is_some_and(nested)
        }
        Expr::Window(_)
        | Expr::Ref(_)
        | Expr::Value(_)
        | Expr::Literal(_)
        | Expr::Raw(_)
        | Expr::Star
        | Expr::Subquery(_) => false
    }
}
