// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Model metadata: table, fields, engine, indexes, constraints and cluster.
//!
//! Models are built in code and verified once by [`ModelBuilder::build`], so
//! the compilers can rely on a consistent description.
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_core::types::Field;
//! use clickhouse_backend_sql::{model::ModelMeta, schema::Engine};
//!
//! let event = ModelMeta::builder("event")
//!     .field(Field::generic_ip("ip"))
//!     .field(Field::uint16("port"))
//!     .engine(Engine::merge_tree().order_by(["id"]))
//!     .build()
//!     .unwrap();
//! assert_eq!(event.name, "Event");
//! assert_eq!(event.pk().map(|f| f.column_name()), Some("id"));
//! ```

use std::collections::HashSet;

use clickhouse_backend_core::{Error, Result, ident::MAX_NAME_LENGTH, types::Field};
use convert_case::{Case, Casing};

use crate::schema::{Constraint, Engine, EngineKind, Index};

/// Verified description of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMeta {
    /// Model name.
    pub name:        String,
    /// Application label, used by the migration ledger.
    pub app_label:   String,
    /// Table name.
    pub db_table:    String,
    /// Columns in declaration order.
    pub fields:      Vec<Field>,
    /// Table engine.
    pub engine:      Engine,
    /// Data-skipping indexes.
    pub indexes:     Vec<Index>,
    /// Table constraints.
    pub constraints: Vec<Constraint>,
    /// Cluster for `ON CLUSTER` DDL and mutations.
    pub cluster:     Option<String>
}

impl ModelMeta {
    /// Start building a model on `db_table`.
    pub fn builder(db_table: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name:        None,
            app_label:   None,
            db_table:    db_table.into(),
            fields:      Vec::new(),
            engine:      Engine::default(),
            indexes:     Vec::new(),
            constraints: Vec::new(),
            cluster:     None
        }
    }

    /// Field by attribute or column name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.column_name() == name))
    }

    /// Primary key field.
    #[must_use]
    pub fn pk(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Table and cluster addressed by mutations.
    ///
    /// A `Distributed` table forwards mutations to its local table on the
    /// engine's cluster; other tables use their own name and model cluster.
    #[must_use]
    pub fn mutation_target(&self) -> (&str, Option<&str>) {
        match &self.engine.kind {
            EngineKind::Distributed { cluster, table, .. } => {
                (table.as_str(), Some(cluster.as_str()))
            }
            _ => (self.db_table.as_str(), self.cluster.as_deref())
        }
    }

    /// Check if destructive DDL needs `SYNC`.
    #[must_use]
    pub const fn needs_sync(&self) -> bool {
        self.cluster.is_some() || self.engine.is_replicated() || self.engine.is_distributed()
    }
}

/// Builder for [`ModelMeta`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name:        Option<String>,
    app_label:   Option<String>,
    db_table:    String,
    fields:      Vec<Field>,
    engine:      Engine,
    indexes:     Vec<Index>,
    constraints: Vec<Constraint>,
    cluster:     Option<String>
}

impl ModelBuilder {
    /// Model name; defaults to the table name in PascalCase.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Application label; defaults to `default`.
    #[must_use]
    pub fn app_label(mut self, app_label: impl Into<String>) -> Self {
        self.app_label = Some(app_label.into());
        self
    }

    /// Add a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add fields.
    #[must_use]
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Table engine; defaults to `MergeTree` ordered by `tuple()`.
    #[must_use]
    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Add a data-skipping index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Cluster for `ON CLUSTER` DDL.
    #[must_use]
    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Verify and build the model.
    ///
    /// Adds an `Int64` primary key named `id` when no field is marked as
    /// primary key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid fields, duplicate columns, more
    /// than one primary key, invalid indexes or an invalid engine.
    pub fn build(self) -> Result<ModelMeta> {
        let table = self.db_table;
        if table.is_empty() || table.len() > MAX_NAME_LENGTH {
            return Err(Error::config(format!(
                "table name must be 1 to {MAX_NAME_LENGTH} bytes, got {:?}",
                table
            )));
        }
        let mut fields = self.fields;
        match fields.iter().filter(|f| f.primary_key).count() {
            0 => fields.insert(0, Field::int64("id").primary_key()),
            1 => {}
            n => {
                return Err(Error::config(format!(
                    "{table}: {n} fields are marked as primary key"
                )));
            }
        }
        let mut columns = HashSet::new();
        for field in &fields {
            field.check()?;
            if !columns.insert(field.column_name()) {
                return Err(Error::config(format!(
                    "{table}: duplicate column {}",
                    field.column_name()
                )));
            }
        }
        let mut names = HashSet::new();
        for index in &self.indexes {
            index.check(&table)?;
            if !names.insert(index.name_or_default(&table)) {
                return Err(Error::config(format!(
                    "{table}: duplicate index {}",
                    index.name_or_default(&table)
                )));
            }
        }
        self.engine
            .check()
            .map_err(|e| Error::config(format!("{table}: {e}")))?;
        Ok(ModelMeta {
            name: self.name.unwrap_or_else(|| table.to_case(Case::Pascal)),
            app_label: self.app_label.unwrap_or_else(|| "default".into()),
            db_table: table,
            fields,
            engine: self.engine,
            indexes: self.indexes,
            constraints: self.constraints,
            cluster: self.cluster
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexType;

    #[test]
    fn adds_primary_key() {
        let m = ModelMeta::builder("page_view").field(Field::string("url")).build().unwrap();
        assert_eq!(m.fields[0].name, "id");
        assert!(m.fields[0].primary_key);
        assert_eq!(m.name, "PageView");
        assert_eq!(m.app_label, "default");
    }

    #[test]
    fn keeps_declared_primary_key() {
        let m = ModelMeta::builder("t")
            .field(Field::uuid("key").primary_key())
            .build()
            .unwrap();
        assert_eq!(m.fields.len(), 1);
        assert_eq!(m.pk().map(|f| f.name.as_str()), Some("key"));
    }

    #[test]
    fn rejects_duplicates() {
        let err = ModelMeta::builder("t")
            .field(Field::string("a"))
            .field(Field::int32("b").db_column("a"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column a"));

        let err = ModelMeta::builder("t")
            .field(Field::int32("a").primary_key())
            .field(Field::int32("b").primary_key())
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn checks_fields_indexes_and_engine() {
        assert!(ModelMeta::builder("t").field(Field::uuid("u").low_cardinality()).build().is_err());
        assert!(
            ModelMeta::builder("t")
                .index(Index::new(["id"], IndexType::MinMax).with_name("_x"))
                .build()
                .is_err()
        );
        assert!(
            ModelMeta::builder("t")
                .engine(Engine::merge_tree().order_by(["a"]).primary_key(["b"]))
                .build()
                .is_err()
        );
    }

    #[test]
    fn distributed_mutation_target() {
        let m = ModelMeta::builder("event")
            .engine(Engine::distributed("c1", "default", "event_local", None))
            .build()
            .unwrap();
        assert_eq!(m.mutation_target(), ("event_local", Some("c1")));
        assert!(m.needs_sync());

        let m = ModelMeta::builder("event").build().unwrap();
        assert_eq!(m.mutation_target(), ("event", None));
        assert!(!m.needs_sync());
    }
}
