// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Live schema reads from `system.tables`, `system.columns` and
//! `SHOW CREATE TABLE`.
//!
//! Decoding of type strings and statements is done by
//! [`clickhouse_backend_sql::introspection`]; this module only runs the
//! queries.

use clickhouse_backend_core::{Error, Params, Result, Value, ident::quote_name, types::Field};
use clickhouse_backend_sql::introspection::{ColumnInfo, CreateTable, TableInfo};
use tracing::debug;

use crate::connection::DatabaseWrapper;

const TABLES_SQL: &str = "SELECT name, engine FROM system.tables \
                          WHERE database = currentDatabase() AND NOT is_temporary ORDER BY name";

const COLUMNS_SQL: &str = "SELECT name, type, default_kind, default_expression, is_in_primary_key \
                           FROM system.columns WHERE database = currentDatabase() AND table = %s \
                           ORDER BY position";

/// Everything known about one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescription {
    /// Table name.
    pub name:    String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnInfo>,
    /// Fields for columns whose type maps to a field kind.
    pub fields:  Vec<Field>,
    /// Parsed `SHOW CREATE TABLE`.
    pub create:  CreateTable
}

impl TableDescription {
    /// Names of the primary key columns.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_in_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn text(row: &[Value], at: usize) -> Result<String> {
    row.get(at)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::interface(format!("expected text in column {at}, got {row:?}")))
}

/// Tables and views of the current database.
///
/// # Errors
///
/// Returns the server error or [`Error::Interface`] for malformed rows.
pub fn table_list(connection: &DatabaseWrapper) -> Result<Vec<TableInfo>> {
    connection
        .execute(TABLES_SQL, Params::None)?
        .iter()
        .map(|row| Ok(TableInfo::new(text(row, 0)?, text(row, 1)?)))
        .collect()
}

/// Columns of `table` in declaration order.
///
/// # Errors
///
/// Returns the server error or [`Error::Interface`] for malformed rows.
pub fn columns(connection: &DatabaseWrapper, table: &str) -> Result<Vec<ColumnInfo>> {
    connection
        .execute(COLUMNS_SQL, Params::Positional(vec![Value::from(table)]))?
        .iter()
        .map(|row| {
            Ok(ColumnInfo {
                name:               text(row, 0)?,
                db_type:            text(row, 1)?,
                default_kind:       text(row, 2)?,
                default_expression: text(row, 3)?,
                is_in_primary_key:  row.get(4).and_then(Value::as_i128).is_some_and(|v| v != 0)
            })
        })
        .collect()
}

/// Parsed `SHOW CREATE TABLE` of `table`.
///
/// # Errors
///
/// Returns the server error, [`Error::Interface`] for an empty answer and
/// the parse error otherwise.
pub fn show_create_table(connection: &DatabaseWrapper, table: &str) -> Result<CreateTable> {
    let rows = connection.execute(&format!("SHOW CREATE TABLE {}", quote_name(table)), Params::None)?;
    let statement = rows
        .first()
        .map(|row| text(row, 0))
        .transpose()?
        .ok_or_else(|| Error::interface(format!("SHOW CREATE TABLE {table} returned nothing")))?;
    CreateTable::parse(&statement)
}

/// Columns, fields, skip-indexes and constraints of `table`.
///
/// # Errors
///
/// See [`columns`] and [`show_create_table`].
pub fn describe_table(connection: &DatabaseWrapper, table: &str) -> Result<TableDescription> {
    let columns = columns(connection, table)?;
    let mut fields = Vec::with_capacity(columns.len());
    for column in &columns {
        match column.field()? {
            Some(field) => fields.push(field),
            None => debug!(table, column = %column.name, db_type = %column.db_type, "no field kind")
        }
    }
    let create = show_create_table(connection, table)?;
    Ok(TableDescription {
        name: table.to_owned(),
        columns,
        fields,
        create
    })
}
