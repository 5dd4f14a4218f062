// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use clickhouse_backend_core::{
    Error, Params, Result, Value, ident::quote_name, snowflake::id_worker, types::Field
};
use tracing::debug;

use super::{
    Compiled, Compiler,
    scope::{Clause, Scope}
};
use crate::{
    expr::{Expr, Fragment},
    query::InsertQuery
};

impl Compiler {
    /// Compile an `INSERT`.
    ///
    /// Batches of at least `batch_threshold` plain-value rows take the
    /// columnar path: the statement ends at `VALUES` and the rows travel as
    /// [`Params::Rows`]. Smaller batches and rows with expressions are
    /// inlined as `VALUES (%s, ...), ...`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Field`] for unknown fields, empty batches and
    /// missing non-integer primary keys, and [`Error::Validation`] for values
    /// the column rejects, generated primary keys included.
    pub fn insert(&self, query: &InsertQuery) -> Result<Compiled> {
        let model = query.model.as_ref();
        if query.rows.is_empty() {
            return Err(Error::field(format!("{}: nothing to insert", model.name)));
        }
        let fields = insert_fields(query)?;
        for row in &query.rows {
            if let Some(unknown) = row.keys().find(|k| !fields.iter().any(|f| f.name == **k)) {
                return Err(Error::field(format!(
                    "{}: {unknown} is not an inserted field",
                    model.name
                )));
            }
        }

        let columns = fields
            .iter()
            .map(|f| quote_name(f.column_name()))
            .collect::<Vec<_>>()
            .join(",");
        let head = format!("INSERT INTO {}({columns})", quote_name(&model.db_table));

        let columnar = query.rows.len() >= self.options.batch_threshold
            && query
                .rows
                .iter()
                .all(|row| row.values().all(|e| matches!(e, Expr::Value(_))));
        if columnar {
            let mut rows = Vec::with_capacity(query.rows.len());
            for row in &query.rows {
                let mut values = Vec::with_capacity(fields.len());
                for field in &fields {
                    let value = match row.get(&field.name) {
                        Some(Expr::Value(value)) => value,
                        _ => &Value::Null
                    };
                    values.push(row_value(model.name.as_str(), field, value)?);
                }
                rows.push(values);
            }
            debug!(table = %model.db_table, rows = rows.len(), "columnar insert");
            return Ok(Compiled {
                sql:    format!("{head}{} VALUES", query.settings.clause()?),
                params: Params::Rows(rows)
            });
        }

        let scope = Scope::new(self, model);
        let mut tuples = Vec::with_capacity(query.rows.len());
        for row in &query.rows {
            let mut values = Vec::with_capacity(fields.len());
            for field in &fields {
                let fragment = match row.get(&field.name) {
                    Some(Expr::Value(value)) => {
                        Fragment::param(row_value(model.name.as_str(), field, value)?)
                    }
                    Some(expr) => scope.expr(expr, Clause::Insert)?.sql,
                    None => Fragment::param(row_value(model.name.as_str(), field, &Value::Null)?)
                };
                values.push(fragment);
            }
            tuples.push(Fragment::join(values, ", ").map(|s| format!("({s})")));
        }
        let body = Fragment::join(tuples, ", ");
        Ok(Compiled {
            sql:    format!(
                "{head}{} VALUES {}",
                query.settings.clause()?.replace('%', "%%"),
                body.sql
            ),
            params: Params::Positional(body.params)
        })
    }
}

/// Fields written by `query`, primary key first when it was not listed.
fn insert_fields(query: &InsertQuery) -> Result<Vec<&Field>> {
    let model = query.model.as_ref();
    let mut fields = Vec::new();
    if query.fields.is_empty() {
        for field in &model.fields {
            let supplied = query.rows.iter().any(|row| row.contains_key(&field.name));
            if field.db_default.is_some() && field.default.is_none() && !supplied {
                continue;
            }
            fields.push(field);
        }
    } else {
        for name in &query.fields {
            let field = model.field(name).ok_or_else(|| {
                Error::field(format!("{}: unknown field {name}", model.name))
            })?;
            fields.push(field);
        }
    }
    if let Some(pk) = model.pk()
        && !fields.iter().any(|f| f.name == pk.name)
    {
        fields.insert(0, pk);
    }
    Ok(fields)
}

/// Value stored for `field`: the given value, the field default, or a
/// generated primary key.
fn row_value(model: &str, field: &Field, value: &Value) -> Result<Value> {
    let value = match (value, &field.default) {
        (Value::Null, Some(default)) => default,
        _ => value
    };
    if field.primary_key && value.is_null() {
        if !field.kind.is_integer() {
            return Err(Error::field(format!(
                "{model}: primary key {} needs a value",
                field.name
            )));
        }
        // Generated ids are 64-bit, narrower columns reject them here.
        return field.clean(&Value::Int(i128::from(id_worker()?.next_id())));
    }
    field.clean(value)
}
