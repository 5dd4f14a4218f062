// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use clickhouse_backend_core::{Error, Params, Result, ident::quote_name};

use super::{
    Compiled, Compiler, on_cluster,
    scope::{Clause, Scope},
    strip_qualifiers
};
use crate::{
    expr::{Expr, Fragment, Q},
    model::ModelMeta,
    query::{DeleteQuery, UpdateQuery},
    settings::QuerySettings
};

impl Compiler {
    /// Compile an `ALTER TABLE ... UPDATE` mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Field`] for empty or unknown assignments and
    /// aggregates, and [`Error::Validation`] for rejected values.
    pub fn update(&self, query: &UpdateQuery) -> Result<Compiled> {
        let model = query.model.as_ref();
        if query.assignments.is_empty() {
            return Err(Error::field(format!("{}: update without assignments", model.name)));
        }
        let scope = Scope::new(self, model);
        let mut assignments = Vec::with_capacity(query.assignments.len());
        for (name, expr) in &query.assignments {
            let field = model
                .field(name)
                .ok_or_else(|| Error::field(format!("{}: unknown field {name}", model.name)))?;
            let value = match expr {
                Expr::Value(value) => {
                    let param = Fragment::param(field.prep_value(value)?);
                    if field.kind.is_composite() {
                        param.map(|s| format!("{s}::{}", field.db_type().replace('%', "%%")))
                    } else {
                        param
                    }
                }
                other => scope.expr(other, Clause::Mutation)?.sql
            };
            let column = quote_name(field.column_name());
            assignments.push(value.map(|s| format!("{column} = {s}")));
        }
        let set = Fragment::join(assignments, ", ");
        let condition = self.condition(&scope, query.filter.as_ref())?;
        let body = Fragment::join([set, condition], " WHERE ").map(|s| format!("UPDATE {s}"));
        self.mutation(model, body, &query.settings)
    }

    /// Compile an `ALTER TABLE ... DELETE` mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Field`] for unresolved paths and aggregates.
    pub fn delete(&self, query: &DeleteQuery) -> Result<Compiled> {
        let model = query.model.as_ref();
        let scope = Scope::new(self, model);
        let condition = self.condition(&scope, query.filter.as_ref())?;
        self.mutation(model, condition.map(|s| format!("DELETE WHERE {s}")), &query.settings)
    }

    fn condition(&self, scope: &Scope<'_>, filter: Option<&Q>) -> Result<Fragment> {
        match filter {
            Some(q) => scope.q(q, Clause::Mutation),
            None => Ok(Fragment::new("1"))
        }
    }

    fn mutation(
        &self,
        model: &ModelMeta,
        body: Fragment,
        settings: &QuerySettings
    ) -> Result<Compiled> {
        let mut merged = QuerySettings::new().with("mutations_sync", self.options.mutations_sync);
        merged.extend(settings);
        let (table, cluster) = model.mutation_target();
        let sql = format!(
            "ALTER TABLE {}{} {}{}",
            quote_name(table),
            on_cluster(cluster),
            strip_qualifiers(&body.sql, &model.db_table),
            merged.clause()?.replace('%', "%%")
        );
        Ok(Compiled {
            sql,
            params: Params::Positional(body.params)
        })
    }
}
