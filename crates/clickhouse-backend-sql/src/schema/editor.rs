// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! DDL generation for ClickHouse.
//!
//! Every operation returns the statements to execute, in order. Statements
//! carry no parameters and are executed without substitution.
//!
//! # Column alteration
//!
//! | Change | Statements |
//! |--------|------------|
//! | rename | `RENAME COLUMN "a" TO "b"` |
//! | type or nullability | `MODIFY COLUMN "c" T` |
//! | nullable to not null, with a default | default, backfill mutation, `MODIFY COLUMN "c" T`, `REMOVE DEFAULT` unless a db default remains |
//! | db default | `MODIFY COLUMN "c" DEFAULT x` or `MODIFY COLUMN "c" REMOVE DEFAULT` |
//! | check | `DROP CONSTRAINT` then `ADD CONSTRAINT` |

use clickhouse_backend_core::{
    Error, Result, Value,
    escape::escape_typed,
    ident::quote_name,
    types::{DbDefault, Field}
};

use crate::{
    model::ModelMeta,
    schema::{Constraint, Index}
};

/// Builds DDL statements for models and fields.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_core::types::Field;
/// use clickhouse_backend_sql::{model::ModelMeta, schema::SchemaEditor};
///
/// let model = ModelMeta::builder("t").build().unwrap();
/// let sql = SchemaEditor::new().add_field(&model, &Field::string("name")).unwrap();
/// assert_eq!(sql, vec![r#"ALTER TABLE "t" ADD COLUMN "name" String"#.to_owned()]);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaEditor {
    database:       Option<String>,
    mutations_sync: i64
}

impl Default for SchemaEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaEditor {
    /// Editor for unqualified tables with `mutations_sync=1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            database:       None,
            mutations_sync: 1
        }
    }

    /// Qualify table names with `database`.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// `mutations_sync` used by backfill mutations.
    #[must_use]
    pub const fn with_mutations_sync(mut self, mutations_sync: i64) -> Self {
        self.mutations_sync = mutations_sync;
        self
    }

    fn table(&self, table: &str) -> String {
        match &self.database {
            Some(db) => format!("{}.{}", quote_name(db), quote_name(table)),
            None => quote_name(table)
        }
    }

    fn on_cluster(cluster: Option<&str>) -> String {
        cluster.map_or_else(String::new, |c| format!(" ON CLUSTER {}", quote_name(c)))
    }

    fn alter(&self, model: &ModelMeta) -> String {
        format!(
            "ALTER TABLE {}{}",
            self.table(&model.db_table),
            Self::on_cluster(model.cluster.as_deref())
        )
    }

    fn default_sql(field: &Field, default: &DbDefault) -> Result<String> {
        match default {
            DbDefault::Value(value) => Self::literal(field, value),
            DbDefault::Expression(expr) => Ok(expr.clone())
        }
    }

    fn literal(field: &Field, value: &Value) -> Result<String> {
        let prepared = field.clean(value)?;
        Ok(escape_typed(&prepared, &field.db_type()))
    }

    /// Column definition: `"col" Type [DEFAULT x]`.
    ///
    /// # Errors
    ///
    /// Returns an error when the db default does not fit the column.
    pub fn column_sql(&self, field: &Field) -> Result<String> {
        let mut sql = format!("{} {}", quote_name(field.column_name()), field.db_type());
        if let Some(default) = &field.db_default {
            sql.push_str(&format!(" DEFAULT {}", Self::default_sql(field, default)?));
        }
        Ok(sql)
    }

    fn check_definition(field: &Field) -> Option<String> {
        field.check.as_ref().map(|expr| {
            format!(
                "CONSTRAINT {} CHECK ({expr})",
                quote_name(&field.check_constraint_name())
            )
        })
    }

    fn require_merge_tree(model: &ModelMeta, index: &Index) -> Result<()> {
        if model.engine.is_merge_tree() {
            Ok(())
        } else {
            Err(Error::UnsupportedEngineForIndex {
                table:  model.db_table.clone(),
                index:  index.name_or_default(&model.db_table),
                engine: model.engine.name()
            })
        }
    }

    /// `CREATE TABLE` with columns, checks, constraints, indexes and engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedEngineForIndex`] when the model declares
    /// indexes on an engine outside the MergeTree family.
    pub fn create_model(&self, model: &ModelMeta, if_not_exists: bool) -> Result<Vec<String>> {
        let mut defs = Vec::with_capacity(model.fields.len());
        for field in &model.fields {
            defs.push(self.column_sql(field)?);
        }
        defs.extend(model.fields.iter().filter_map(Self::check_definition));
        defs.extend(model.constraints.iter().filter_map(Constraint::definition));
        for index in &model.indexes {
            Self::require_merge_tree(model, index)?;
            defs.push(index.definition(&model.db_table, &model.fields));
        }
        let sql = format!(
            "CREATE TABLE {}{}{} ({}) {}",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            self.table(&model.db_table),
            Self::on_cluster(model.cluster.as_deref()),
            defs.join(", "),
            model.engine.render(&model.fields)?
        );
        tracing::debug!(table = %model.db_table, engine = %model.engine.name(), "compiled CREATE TABLE");
        Ok(vec![sql])
    }

    /// `DROP TABLE`, with `SYNC` for clustered, replicated and distributed
    /// tables.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other operations.
    pub fn delete_model(&self, model: &ModelMeta) -> Result<Vec<String>> {
        Ok(vec![format!(
            "DROP TABLE IF EXISTS {}{}{}",
            self.table(&model.db_table),
            Self::on_cluster(model.cluster.as_deref()),
            if model.needs_sync() { " SYNC" } else { "" }
        )])
    }

    /// `RENAME TABLE old TO new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty or too long name.
    pub fn rename_table(&self, model: &ModelMeta, new_table: &str) -> Result<Vec<String>> {
        if new_table.is_empty() || new_table.len() > clickhouse_backend_core::ident::MAX_NAME_LENGTH {
            return Err(Error::config(format!("invalid table name {new_table:?}")));
        }
        Ok(vec![format!(
            "RENAME TABLE {} TO {}{}",
            self.table(&model.db_table),
            self.table(new_table),
            Self::on_cluster(model.cluster.as_deref())
        )])
    }

    /// `TRUNCATE TABLE`.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other operations.
    pub fn truncate(&self, model: &ModelMeta) -> Result<Vec<String>> {
        Ok(vec![format!(
            "TRUNCATE TABLE IF EXISTS {}{}",
            self.table(&model.db_table),
            Self::on_cluster(model.cluster.as_deref())
        )])
    }

    /// Add a column.
    ///
    /// An application default without a db default is applied to existing
    /// rows, then removed from the column.
    ///
    /// # Errors
    ///
    /// Returns an error when the field is invalid or its default does not
    /// fit the column.
    pub fn add_field(&self, model: &ModelMeta, field: &Field) -> Result<Vec<String>> {
        field.check()?;
        let alter = self.alter(model);
        let column = quote_name(field.column_name());
        let mut sql = Vec::new();
        match (&field.db_default, &field.default) {
            (None, Some(default)) => {
                sql.push(format!(
                    "{alter} ADD COLUMN {} DEFAULT {}",
                    self.column_sql(field)?,
                    Self::literal(field, default)?
                ));
                sql.push(format!(
                    "{alter} MATERIALIZE COLUMN {column} SETTINGS mutations_sync={}",
                    self.mutations_sync
                ));
                sql.push(format!("{alter} MODIFY COLUMN {column} REMOVE DEFAULT"));
            }
            _ => sql.push(format!("{alter} ADD COLUMN {}", self.column_sql(field)?))
        }
        if let Some(check) = Self::check_definition(field) {
            sql.push(format!("{alter} ADD {check}"));
        }
        Ok(sql)
    }

    /// Drop a column and its column-level check.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other operations.
    pub fn remove_field(&self, model: &ModelMeta, field: &Field) -> Result<Vec<String>> {
        let alter = self.alter(model);
        let mut sql = Vec::new();
        if field.check.is_some() {
            sql.push(format!(
                "{alter} DROP CONSTRAINT {}",
                quote_name(&field.check_constraint_name())
            ));
        }
        sql.push(format!("{alter} DROP COLUMN {}", quote_name(field.column_name())));
        Ok(sql)
    }

    /// Turn `old` into `new`.
    ///
    /// # Errors
    ///
    /// Returns an error when `new` is invalid or its default does not fit the
    /// column.
    pub fn alter_field(&self, model: &ModelMeta, old: &Field, new: &Field) -> Result<Vec<String>> {
        new.check()?;
        let alter = self.alter(model);
        let column = quote_name(new.column_name());
        let mut sql = Vec::new();

        if old.column_name() != new.column_name() {
            sql.push(format!(
                "{alter} RENAME COLUMN {} TO {column}",
                quote_name(old.column_name())
            ));
        }

        let backfill = match (&new.db_default, &new.default) {
            (Some(default), _) => Some(Self::default_sql(new, default)?),
            (None, Some(value)) => Some(Self::literal(new, value)?),
            (None, None) => None
        };
        let type_changed = old.db_type() != new.db_type();

        if old.nullable && !new.nullable && let Some(default) = backfill {
            let (target, cluster) = model.mutation_target();
            sql.push(format!("{alter} MODIFY COLUMN {column} DEFAULT {default}"));
            sql.push(format!(
                "ALTER TABLE {}{} UPDATE {column} = {default} WHERE {column} IS NULL SETTINGS \
                 mutations_sync={}",
                self.table(target),
                Self::on_cluster(cluster),
                self.mutations_sync
            ));
            sql.push(format!("{alter} MODIFY COLUMN {column} {}", new.db_type()));
            if new.db_default.is_none() {
                sql.push(format!("{alter} MODIFY COLUMN {column} REMOVE DEFAULT"));
            }
        } else {
            if type_changed {
                sql.push(format!("{alter} MODIFY COLUMN {column} {}", new.db_type()));
            }
            if old.db_default != new.db_default {
                match &new.db_default {
                    Some(default) => sql.push(format!(
                        "{alter} MODIFY COLUMN {column} DEFAULT {}",
                        Self::default_sql(new, default)?
                    )),
                    None => sql.push(format!("{alter} MODIFY COLUMN {column} REMOVE DEFAULT"))
                }
            }
        }

        if old.check != new.check || old.column_name() != new.column_name() {
            if old.check.is_some() {
                sql.push(format!(
                    "{alter} DROP CONSTRAINT {}",
                    quote_name(&old.check_constraint_name())
                ));
            }
            if let Some(check) = Self::check_definition(new) {
                sql.push(format!("{alter} ADD {check}"));
            }
        }
        Ok(sql)
    }

    /// `ADD INDEX`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedEngineForIndex`] on engines outside the
    /// MergeTree family, without emitting DDL, and [`Error::Config`] for an
    /// invalid index.
    pub fn add_index(&self, model: &ModelMeta, index: &Index) -> Result<Vec<String>> {
        Self::require_merge_tree(model, index)?;
        index.check(&model.db_table)?;
        Ok(vec![format!(
            "{} ADD {}",
            self.alter(model),
            index.definition(&model.db_table, &model.fields)
        )])
    }

    /// `DROP INDEX`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedEngineForIndex`] on engines outside the
    /// MergeTree family.
    pub fn remove_index(&self, model: &ModelMeta, index: &Index) -> Result<Vec<String>> {
        Self::require_merge_tree(model, index)?;
        Ok(vec![format!(
            "{} DROP INDEX {}",
            self.alter(model),
            quote_name(&index.name_or_default(&model.db_table))
        )])
    }

    /// `ADD CONSTRAINT`; unique constraints emit nothing.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other operations.
    pub fn add_constraint(&self, model: &ModelMeta, constraint: &Constraint) -> Result<Vec<String>> {
        match constraint.definition() {
            Some(definition) => Ok(vec![format!("{} ADD {definition}", self.alter(model))]),
            None => {
                tracing::debug!(
                    table = %model.db_table,
                    constraint = constraint.name(),
                    "unique constraints are not supported, skipping"
                );
                Ok(Vec::new())
            }
        }
    }

    /// `DROP CONSTRAINT`; unique constraints emit nothing.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other operations.
    pub fn remove_constraint(
        &self,
        model: &ModelMeta,
        constraint: &Constraint
    ) -> Result<Vec<String>> {
        match constraint {
            Constraint::Check { name, .. } => Ok(vec![format!(
                "{} DROP CONSTRAINT {}",
                self.alter(model),
                quote_name(name)
            )]),
            Constraint::Unique { .. } => Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use clickhouse_backend_core::types::EnumWidth;

    use super::*;
    use crate::schema::{Engine, IndexType};

    fn event() -> ModelMeta {
        ModelMeta::builder("event")
            .field(Field::generic_ip("ip"))
            .field(Field::uint16("port").with_check("port > 0"))
            .field(
                Field::enumeration("protocol", EnumWidth::Enum8, [("UDP", 1), ("TCP", 2)])
                    .db_default("UDP")
            )
            .constraint(Constraint::unique("uniq_ip", ["ip"]))
            .index(Index::new(["port"], IndexType::Set(1000)).granularity(4))
            .engine(Engine::merge_tree().order_by(["id"]).setting("index_granularity", 8192))
            .build()
            .unwrap()
    }

    #[test]
    fn create_table_layout() {
        let sql = SchemaEditor::new().create_model(&event(), false).unwrap();
        assert_eq!(
            sql[0],
            "CREATE TABLE \"event\" (\"id\" Int64, \"ip\" IPv6, \"port\" UInt16, \"protocol\" \
             Enum8('UDP' = 1, 'TCP' = 2) DEFAULT 'UDP', CONSTRAINT \"_check_port\" CHECK (port > \
             0), INDEX \"idx_event_port\" (\"port\") TYPE set(1000) GRANULARITY 4) ENGINE = \
             MergeTree ORDER BY (\"id\") SETTINGS index_granularity=8192"
        );
    }

    #[test]
    fn create_table_on_cluster_with_database() {
        let model = ModelMeta::builder("t").cluster("c1").build().unwrap();
        let sql = SchemaEditor::new()
            .with_database("db")
            .create_model(&model, true)
            .unwrap();
        assert_eq!(
            sql[0],
            "CREATE TABLE IF NOT EXISTS \"db\".\"t\" ON CLUSTER \"c1\" (\"id\" Int64) ENGINE = \
             MergeTree ORDER BY tuple()"
        );
        assert_eq!(
            SchemaEditor::new().delete_model(&model).unwrap(),
            vec!["DROP TABLE IF EXISTS \"t\" ON CLUSTER \"c1\" SYNC".to_owned()]
        );
    }

    #[test]
    fn index_requires_merge_tree() {
        let model = ModelMeta::builder("log_t").engine(Engine::log()).build().unwrap();
        let index = Index::new(["id"], IndexType::MinMax);
        let err = SchemaEditor::new().add_index(&model, &index).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEngineForIndex { ref engine, .. } if engine == "Log"));
        assert_eq!(
            SchemaEditor::new().add_index(&event(), &index).unwrap(),
            vec!["ALTER TABLE \"event\" ADD INDEX \"idx_event_id\" (\"id\") TYPE minmax GRANULARITY 1"
                .to_owned()]
        );
    }

    #[test]
    fn nullable_to_not_null_uses_four_steps() {
        let model = event();
        let old = Field::int32("hits").nullable();
        let new = Field::int32("hits").default_value(0);
        let sql = SchemaEditor::new().alter_field(&model, &old, &new).unwrap();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"event\" MODIFY COLUMN \"hits\" DEFAULT 0".to_owned(),
                "ALTER TABLE \"event\" UPDATE \"hits\" = 0 WHERE \"hits\" IS NULL SETTINGS \
                 mutations_sync=1"
                    .to_owned(),
                "ALTER TABLE \"event\" MODIFY COLUMN \"hits\" Int32".to_owned(),
                "ALTER TABLE \"event\" MODIFY COLUMN \"hits\" REMOVE DEFAULT".to_owned()
            ]
        );
    }

    #[test]
    fn nullable_to_not_null_keeps_db_default() {
        let old = Field::int32("hits").nullable();
        let new = Field::int32("hits").db_default(1);
        let sql = SchemaEditor::new().alter_field(&event(), &old, &new).unwrap();
        assert_eq!(sql.len(), 3);
        assert!(sql[2].ends_with("MODIFY COLUMN \"hits\" Int32"));
    }

    #[test]
    fn type_default_and_rename_changes() {
        let editor = SchemaEditor::new();
        let model = event();
        let sql = editor
            .alter_field(&model, &Field::int32("n"), &Field::int64("n").nullable())
            .unwrap();
        assert_eq!(sql, vec!["ALTER TABLE \"event\" MODIFY COLUMN \"n\" Nullable(Int64)".to_owned()]);

        let sql = editor
            .alter_field(&model, &Field::string("s").db_default("a"), &Field::string("s"))
            .unwrap();
        assert_eq!(sql, vec!["ALTER TABLE \"event\" MODIFY COLUMN \"s\" REMOVE DEFAULT".to_owned()]);

        let sql = editor
            .alter_field(&model, &Field::string("s"), &Field::string("s").db_default_expr("now()"))
            .unwrap();
        assert_eq!(sql, vec!["ALTER TABLE \"event\" MODIFY COLUMN \"s\" DEFAULT now()".to_owned()]);

        let sql = editor
            .alter_field(&model, &Field::string("a"), &Field::string("a").db_column("b"))
            .unwrap();
        assert_eq!(sql, vec!["ALTER TABLE \"event\" RENAME COLUMN \"a\" TO \"b\"".to_owned()]);
    }

    #[test]
    fn add_field_with_app_default_backfills() {
        let sql = SchemaEditor::new()
            .with_mutations_sync(2)
            .add_field(&event(), &Field::string("tag").default_value("x"))
            .unwrap();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"event\" ADD COLUMN \"tag\" String DEFAULT 'x'".to_owned(),
                "ALTER TABLE \"event\" MATERIALIZE COLUMN \"tag\" SETTINGS mutations_sync=2"
                    .to_owned(),
                "ALTER TABLE \"event\" MODIFY COLUMN \"tag\" REMOVE DEFAULT".to_owned()
            ]
        );
    }

    #[test]
    fn remove_field_drops_check_first() {
        let field = Field::uint16("port").with_check("port > 0");
        let sql = SchemaEditor::new().remove_field(&event(), &field).unwrap();
        assert_eq!(sql[0], "ALTER TABLE \"event\" DROP CONSTRAINT \"_check_port\"");
        assert_eq!(sql[1], "ALTER TABLE \"event\" DROP COLUMN \"port\"");
    }

    #[test]
    fn constraints_and_tables() {
        let editor = SchemaEditor::new();
        let model = event();
        assert!(editor.add_constraint(&model, &Constraint::unique("u", ["ip"])).unwrap().is_empty());
        assert_eq!(
            editor.add_constraint(&model, &Constraint::check("c", "port < 100")).unwrap(),
            vec!["ALTER TABLE \"event\" ADD CONSTRAINT \"c\" CHECK (port < 100)".to_owned()]
        );
        assert_eq!(
            editor.remove_constraint(&model, &Constraint::check("c", "x")).unwrap(),
            vec!["ALTER TABLE \"event\" DROP CONSTRAINT \"c\"".to_owned()]
        );
        assert_eq!(
            editor.rename_table(&model, "event2").unwrap(),
            vec!["RENAME TABLE \"event\" TO \"event2\"".to_owned()]
        );
        assert_eq!(
            editor.truncate(&model).unwrap(),
            vec!["TRUNCATE TABLE IF EXISTS \"event\"".to_owned()]
        );
    }
}
