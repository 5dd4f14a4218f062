// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use clickhouse_backend_core::{Error, Params, Result, ident::quote_name};

use super::{
    Compiled, Compiler,
    expr::contains_aggregate,
    scope::{Clause, Scope}
};
use crate::{
    expr::{Expr, Fragment},
    query::{JoinKind, SelectQuery, check_format}
};

impl Compiler {
    /// Compile a `SELECT`, with its `EXPLAIN` prefix and `FORMAT` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Field`] for unresolved paths and misplaced
    /// aggregates, [`Error::NotSupported`] for aggregates in `PREWHERE` and
    /// [`Error::Config`] for invalid settings, `EXPLAIN` options and formats.
    pub fn select(&self, query: &SelectQuery) -> Result<Compiled> {
        let body = self.select_fragment(query)?;
        let mut sql = body.sql;
        if let Some(explain) = &query.explain {
            sql = format!("{} {sql}", explain.render()?.replace('%', "%%"));
        }
        if let Some(format) = &query.format {
            check_format(format)?;
            sql.push_str(" FORMAT ");
            sql.push_str(format);
        }
        Ok(Compiled {
            sql,
            params: Params::Positional(body.params)
        })
    }

    /// Compile a `SELECT` body, as used by subqueries.
    pub(crate) fn select_fragment(&self, query: &SelectQuery) -> Result<Fragment> {
        let model = query.model.as_ref();
        let scope = Scope::new(self, model)
            .with_annotations(&query.annotations)
            .with_joins(&query.joins);
        let mut parts: Vec<Fragment> = Vec::new();

        let mut selected = Vec::new();
        let mut grouped = Vec::new();
        let mut has_aggregate = false;
        let columns: Vec<Expr> = match &query.columns {
            Some(paths) => paths
                .iter()
                .filter(|p| !query.annotations.contains_key(p.as_str()))
                .map(|p| Expr::field(p.as_str()))
                .collect(),
            None => model
                .fields
                .iter()
                .map(|f| Expr::field(f.name.as_str()))
                .collect()
        };
        for expr in &columns {
            let column = scope.expr(expr, Clause::Select)?;
            if contains_aggregate(expr, &scope) {
                has_aggregate = true;
            } else {
                grouped.push(column.sql.clone());
            }
            selected.push(column.sql);
        }
        for (alias, expr) in &query.annotations {
            let column = scope.expr(expr, Clause::Select)?;
            if contains_aggregate(expr, &scope) {
                has_aggregate = true;
            } else if !matches!(expr, Expr::Window(_)) {
                grouped.push(column.sql.clone());
            }
            selected.push(column.sql.map(|s| format!("{s} AS {}", quote_name(alias))));
        }
        if selected.is_empty() {
            return Err(Error::field(format!("{}: nothing to select", model.name)));
        }

        let mut head = String::from("SELECT");
        if !query.distinct_on.is_empty() {
            let mut exprs = Vec::with_capacity(query.distinct_on.len());
            for expr in &query.distinct_on {
                exprs.push(scope.expr(expr, Clause::Select)?.sql);
            }
            parts.push(Fragment::new(head));
            parts.push(Fragment::join(exprs, ", ").map(|s| format!("DISTINCT ON ({s})")));
            head = String::new();
        } else if query.distinct {
            head.push_str(" DISTINCT");
        }
        if !head.is_empty() {
            parts.push(Fragment::new(head));
        }
        parts.push(Fragment::join(selected, ", "));

        let mut from = format!("FROM {}", quote_name(&model.db_table));
        if query.final_ {
            from.push_str(" FINAL");
        }
        parts.push(Fragment::new(from));

        for join in &query.joins {
            let target = format!(
                "{} {} AS {}",
                join.kind.as_sql(),
                quote_name(&join.model.db_table),
                quote_name(&join.alias)
            );
            match (&join.on, join.kind) {
                (_, JoinKind::Cross) => parts.push(Fragment::new(target)),
                (Some(on), _) => {
                    let on = scope.q(on, Clause::Join)?;
                    parts.push(on.map(|s| format!("{target} ON {s}")));
                }
                (None, _) => {
                    return Err(Error::field(format!("join {} needs a condition", join.alias)));
                }
            }
        }

        if let Some(prewhere) = &query.prewhere {
            parts.push(scope.q(prewhere, Clause::Prewhere)?.map(|s| format!("PREWHERE {s}")));
        }
        if let Some(filter) = &query.filter {
            parts.push(scope.q(filter, Clause::Where)?.map(|s| format!("WHERE {s}")));
        }

        if !query.group_by.is_empty() {
            let mut exprs = Vec::with_capacity(query.group_by.len());
            for expr in &query.group_by {
                exprs.push(scope.expr(expr, Clause::GroupBy)?.sql);
            }
            parts.push(Fragment::join(exprs, ", ").map(|s| format!("GROUP BY {s}")));
        } else if has_aggregate && !grouped.is_empty() {
            parts.push(Fragment::join(grouped, ", ").map(|s| format!("GROUP BY {s}")));
        }

        if let Some(having) = &query.having {
            parts.push(scope.q(having, Clause::Having)?.map(|s| format!("HAVING {s}")));
        }
        if !query.order_by.is_empty() {
            parts.push(scope.order_by(&query.order_by)?.map(|s| format!("ORDER BY {s}")));
        }
        if let Some(limit) = query.limit {
            parts.push(Fragment::new(format!("LIMIT {limit}")));
        }
        if let Some(offset) = query.offset {
            parts.push(Fragment::new(format!("OFFSET {offset}")));
        }
        if !query.settings.is_empty() {
            parts.push(Fragment::new(format!(
                "SETTINGS {}",
                query.settings.render()?.replace('%', "%%")
            )));
        }
        Ok(Fragment::join(parts, " "))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clickhouse_backend_core::{
        Value,
        types::{EnumWidth, Field}
    };

    use super::*;
    use crate::{
        expr::{Frame, FrameBound, OrderBy, Q},
        functions,
        model::ModelMeta,
        query::{Explain, ExplainKind}
    };

    fn author() -> Arc<ModelMeta> {
        Arc::new(
            ModelMeta::builder("author")
                .field(Field::string("show"))
                .field(Field::int32("episode"))
                .field(Field::datetime("ts", None))
                .build()
                .unwrap()
        )
    }

    fn sql(query: &SelectQuery) -> String {
        Compiler::default().select(query).unwrap().sql
    }

    #[test]
    fn selects_all_columns() {
        assert_eq!(
            sql(&SelectQuery::new(author())),
            "SELECT \"author\".\"id\", \"author\".\"show\", \"author\".\"episode\", \
             \"author\".\"ts\" FROM \"author\""
        );
    }

    #[test]
    fn implicit_group_by_from_values() {
        let query = SelectQuery::new(author())
            .annotate("uid_count", functions::uniq(vec![Expr::Star]))
            .values(["show", "episode"]);
        assert_eq!(
            sql(&query),
            "SELECT \"author\".\"show\", \"author\".\"episode\", uniq(*) AS \"uid_count\" FROM \
             \"author\" GROUP BY \"author\".\"show\", \"author\".\"episode\""
        );
    }

    #[test]
    fn clause_order() {
        let query = SelectQuery::new(author())
            .values(["show"])
            .distinct()
            .final_rows()
            .prewhere(Q::filter("episode__gt", 1))
            .filter(Q::filter("show__startswith", "a"))
            .order_by(["-episode"])
            .limit(10)
            .offset(20)
            .setting("max_threads", 2);
        let compiled = Compiler::default().select(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT DISTINCT \"author\".\"show\" FROM \"author\" FINAL PREWHERE \
             \"author\".\"episode\" > %s WHERE \"author\".\"show\" LIKE %s ORDER BY \
             \"author\".\"episode\" DESC LIMIT 10 OFFSET 20 SETTINGS max_threads=2"
        );
        assert_eq!(
            compiled.params,
            Params::Positional(vec![Value::Int(1), Value::from("a%")])
        );
    }

    #[test]
    fn prewhere_rejects_aggregates() {
        let query = SelectQuery::new(author())
            .annotate("n", functions::count(vec![Expr::Star]))
            .prewhere(Q::filter("n__gt", 1));
        let err = Compiler::default().select(&query).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));

        let query = SelectQuery::new(author())
            .annotate("n", functions::count(vec![Expr::Star]))
            .filter(Q::filter("n__gt", 1));
        assert!(matches!(
            Compiler::default().select(&query).unwrap_err(),
            Error::Field(_)
        ));
    }

    #[test]
    fn having_accepts_aggregates() {
        let query = SelectQuery::new(author())
            .values(["show"])
            .annotate("n", functions::count(vec![Expr::Star]))
            .having(Q::filter("n__gt", 1));
        assert!(sql(&query).ends_with("GROUP BY \"author\".\"show\" HAVING count(*) > %s"));
    }

    #[test]
    fn window_expression() {
        let window = functions::row_number()
            .over()
            .partition_by([Expr::field("show")])
            .order_by([OrderBy::desc(Expr::field("ts"))])
            .frame(Frame::rows(FrameBound::UnboundedPreceding, FrameBound::CurrentRow));
        let query = SelectQuery::new(author())
            .values(["show"])
            .annotate("rn", window);
        assert_eq!(
            sql(&query),
            "SELECT \"author\".\"show\", row_number() OVER (PARTITION BY \"author\".\"show\" \
             ORDER BY \"author\".\"ts\" DESC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) \
             AS \"rn\" FROM \"author\""
        );
    }

    #[test]
    fn joins_and_distinct_on() {
        let tag = Arc::new(
            ModelMeta::builder("tag")
                .field(Field::int64("author_id"))
                .field(Field::enumeration("kind", EnumWidth::Enum8, [("a", 1)]))
                .build()
                .unwrap()
        );
        let query = SelectQuery::new(author())
            .values(["show", "t__kind"])
            .join(
                JoinKind::LeftOuter,
                tag,
                "t",
                Some(Q::compare("t__author_id", Expr::field("id")))
            )
            .distinct_on([Expr::field("show")]);
        assert_eq!(
            sql(&query),
            "SELECT DISTINCT ON (\"author\".\"show\") \"author\".\"show\", \"t\".\"kind\" FROM \
             \"author\" LEFT OUTER JOIN \"tag\" AS \"t\" ON \"t\".\"author_id\" = \
             \"author\".\"id\""
        );
    }

    #[test]
    fn explain_and_format() {
        let query = SelectQuery::new(author())
            .values(["id"])
            .explain(Explain::new(ExplainKind::Plan).option("indexes", 1))
            .format("JSONEachRow");
        assert_eq!(
            sql(&query),
            "EXPLAIN PLAN indexes=1 SELECT \"author\".\"id\" FROM \"author\" FORMAT JSONEachRow"
        );
        let bad = SelectQuery::new(author()).format("Excel");
        assert!(Compiler::default().select(&bad).unwrap_err().is_config());
    }

    #[test]
    fn subquery_filter() {
        let inner = SelectQuery::new(author())
            .values(["id"])
            .filter(Q::filter("episode", 3));
        let query = SelectQuery::new(author())
            .values(["show"])
            .filter(Q::subquery("id__in", inner));
        let compiled = Compiler::default().select(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT \"author\".\"show\" FROM \"author\" WHERE \"author\".\"id\" IN (SELECT \
             \"author\".\"id\" FROM \"author\" WHERE \"author\".\"episode\" = %s)"
        );
        assert_eq!(compiled.params, Params::Positional(vec![Value::Int(3)]));
    }

    #[test]
    fn literal_percent_is_doubled() {
        let query = SelectQuery::new(author())
            .values(Vec::<String>::new())
            .annotate("m", Expr::field("episode").modulo(Expr::literal("5%")));
        assert_eq!(
            sql(&query),
            "SELECT (\"author\".\"episode\" %% '5%%') AS \"m\" FROM \"author\""
        );
    }
}
