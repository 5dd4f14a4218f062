// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Applied-migrations ledger and the operations it records.
//!
//! The ledger lives in `django_migrations` on a `MergeTree` ordered by
//! `(app, name)`. Rows are never deleted: unapplying a migration flips
//! `deleted` through a mutation and re-applying flips it back.
//!
//! On a cluster every replica keeps its own ledger. When the ledger is
//! created with `migration_cluster`, DDL targeting a model with a cluster is
//! sent once with `ON CLUSTER`; the other replicas learn about it through a
//! `clusterAllReplicas` probe and skip those operations.
//!
//! # Overview
//!
//! - [`ledger_model`]: Model of the ledger table
//! - [`MigrationRecorder`]: Reads and writes ledger rows
//! - [`Operation`]: One schema change and its reverse
//! - [`Migration`]: Named list of operations
//! - [`Migrator`]: Applies and unapplies migrations, recording each
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clickhouse_backend_driver::{
//!     connection::DatabaseWrapper,
//!     migrations::{Migration, Migrator, Operation},
//!     mock::MockServer,
//!     settings::DatabaseSettings
//! };
//! use clickhouse_backend_sql::prelude::*;
//!
//! let mut settings = DatabaseSettings::default();
//! settings.alias = "migrations-doc".into();
//! let server = MockServer::new();
//! let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).unwrap();
//!
//! let event = Arc::new(ModelMeta::builder("event").field(Field::string("protocol")).build().unwrap());
//! let initial = Migration::new("events", "0001_initial").operation(Operation::CreateModel(event));
//! assert!(Migrator::new(&db).unwrap().apply(&initial).unwrap());
//! assert!(server.statements().iter().any(|s| s.starts_with(r#"CREATE TABLE "event""#)));
//! ```

use std::{collections::BTreeSet, fmt, sync::Arc};

use chrono::Utc;
use clickhouse_backend_core::{
    Error, Params, Result, Value, escape::quote_string, types::Field
};
use clickhouse_backend_sql::{
    expr::Q,
    model::ModelMeta,
    query::{InsertQuery, SelectQuery, UpdateQuery},
    schema::{Constraint, Engine, Index, SchemaEditor}
};
use tracing::{debug, info};

use crate::connection::DatabaseWrapper;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "django_migrations";

/// Model of the ledger table, created `ON CLUSTER` when `cluster` is set.
///
/// # Errors
///
/// Returns [`Error::Config`] for an invalid cluster name.
pub fn ledger_model(cluster: Option<&str>) -> Result<ModelMeta> {
    let mut builder = ModelMeta::builder(LEDGER_TABLE)
        .name("Migration")
        .app_label("migrations")
        .field(Field::int64("id").primary_key())
        .field(Field::string("app"))
        .field(Field::string("name"))
        .field(Field::datetime64("applied", 6, Some("UTC")))
        .field(Field::bool("deleted").default_value(false))
        .engine(Engine::merge_tree().order_by(["app", "name"]));
    if let Some(cluster) = cluster {
        builder = builder.cluster(cluster);
    }
    builder.build()
}

/// Ledger reads and writes for one connection.
pub struct MigrationRecorder<'c> {
    connection: &'c DatabaseWrapper,
    cluster:    Option<String>,
    ledger:     ModelMeta,
    local:      Arc<ModelMeta>
}

impl<'c> MigrationRecorder<'c> {
    /// Recorder using the connection's `migration_cluster`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid cluster name.
    pub fn new(connection: &'c DatabaseWrapper) -> Result<Self> {
        let cluster = connection.settings().options.migration_cluster.clone();
        let ledger = ledger_model(cluster.as_deref())?;
        // Rows are written to the replica's own ledger only.
        let local = Arc::new(ledger_model(None)?);
        Ok(Self {
            connection,
            cluster,
            ledger,
            local
        })
    }

    /// Cluster the ledger is created on.
    #[must_use]
    pub fn cluster(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    /// Create the ledger table when missing.
    ///
    /// # Errors
    ///
    /// Returns the server error.
    pub fn ensure_schema(&self) -> Result<()> {
        let editor = self.connection.schema_editor();
        self.connection
            .run_ddl(&editor.create_model(&self.ledger, true)?)
    }

    /// Live `(app, name)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the server error, or [`Error::Migration`] for rows without
    /// text columns.
    pub fn applied_migrations(&self) -> Result<BTreeSet<(String, String)>> {
        let query = SelectQuery::new(Arc::clone(&self.local))
            .values(["app", "name"])
            .filter(Q::filter("deleted", false));
        let mut applied = BTreeSet::new();
        for row in self.connection.select(&query)? {
            match (row.first().and_then(Value::as_str), row.get(1).and_then(Value::as_str)) {
                (Some(app), Some(name)) => {
                    applied.insert((app.to_owned(), name.to_owned()));
                }
                _ => {
                    return Err(Error::migration(format!(
                        "{LEDGER_TABLE}: unexpected row {row:?}"
                    )));
                }
            }
        }
        Ok(applied)
    }

    /// Mark `app.name` applied, reviving a row left by an unapply.
    ///
    /// # Errors
    ///
    /// Returns the server error.
    pub fn record_applied(&self, app: &str, name: &str) -> Result<()> {
        let exists = SelectQuery::new(Arc::clone(&self.local))
            .values(["id"])
            .filter(Q::filter("app", app))
            .filter(Q::filter("name", name))
            .limit(1);
        let now = Value::from(Utc::now());
        if self.connection.select(&exists)?.is_empty() {
            let insert = InsertQuery::new(Arc::clone(&self.local)).row([
                ("app", Value::from(app)),
                ("name", Value::from(name)),
                ("applied", now),
                ("deleted", Value::from(false))
            ]);
            self.connection.insert(&insert)?;
        } else {
            let update = UpdateQuery::new(Arc::clone(&self.local))
                .set("deleted", Value::from(false))
                .set("applied", now)
                .filter(Q::filter("app", app))
                .filter(Q::filter("name", name));
            self.connection.update(&update)?;
        }
        debug!(app, name, "migration recorded as applied");
        Ok(())
    }

    /// Mark `app.name` unapplied.
    ///
    /// # Errors
    ///
    /// Returns the server error.
    pub fn record_unapplied(&self, app: &str, name: &str) -> Result<()> {
        let update = UpdateQuery::new(Arc::clone(&self.local))
            .set("deleted", Value::from(true))
            .filter(Q::filter("app", app))
            .filter(Q::filter("name", name));
        self.connection.update(&update)?;
        debug!(app, name, "migration recorded as unapplied");
        Ok(())
    }

    /// Remove every ledger row.
    ///
    /// # Errors
    ///
    /// Returns the server error.
    pub fn flush(&self) -> Result<()> {
        let editor = self.connection.schema_editor();
        self.connection.run_ddl(&editor.truncate(&self.local)?)
    }

    /// Check if any replica of the ledger cluster has `app.name` in the
    /// given state. Always `false` without a ledger cluster.
    ///
    /// # Errors
    ///
    /// Returns the server error.
    pub fn probe_cluster(&self, app: &str, name: &str, deleted: bool) -> Result<bool> {
        let Some(cluster) = &self.cluster else {
            return Ok(false);
        };
        let sql = format!(
            "SELECT count() FROM clusterAllReplicas({}, currentDatabase(), {}) \
             WHERE app = %s AND name = %s AND {}deleted",
            quote_string(cluster),
            quote_string(LEDGER_TABLE),
            if deleted { "" } else { "NOT " }
        );
        let rows = self.connection.execute(
            &sql,
            Params::Positional(vec![Value::from(app), Value::from(name)])
        )?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i128)
            .unwrap_or_default();
        Ok(count > 0)
    }
}

/// One schema change.
#[derive(Debug, Clone)]
pub enum Operation {
    /// `CREATE TABLE`.
    CreateModel(Arc<ModelMeta>),
    /// `DROP TABLE`.
    DeleteModel(Arc<ModelMeta>),
    /// `RENAME TABLE` to `new_table`.
    RenameTable {
        /// Model under its current table name.
        model:     Arc<ModelMeta>,
        /// Target table name.
        new_table: String
    },
    /// `ADD COLUMN`.
    AddField {
        /// Altered model.
        model: Arc<ModelMeta>,
        /// Added field.
        field: Field
    },
    /// `DROP COLUMN`.
    RemoveField {
        /// Altered model.
        model: Arc<ModelMeta>,
        /// Removed field.
        field: Field
    },
    /// `MODIFY COLUMN` and friends.
    AlterField {
        /// Altered model.
        model: Arc<ModelMeta>,
        /// Field before the change.
        old:   Field,
        /// Field after the change.
        new:   Field
    },
    /// `ADD INDEX`.
    AddIndex {
        /// Altered model.
        model: Arc<ModelMeta>,
        /// Added skip-index.
        index: Index
    },
    /// `DROP INDEX`.
    RemoveIndex {
        /// Altered model.
        model: Arc<ModelMeta>,
        /// Removed skip-index.
        index: Index
    },
    /// `ADD CONSTRAINT`.
    AddConstraint {
        /// Altered model.
        model:      Arc<ModelMeta>,
        /// Added constraint.
        constraint: Constraint
    },
    /// `DROP CONSTRAINT`.
    RemoveConstraint {
        /// Altered model.
        model:      Arc<ModelMeta>,
        /// Removed constraint.
        constraint: Constraint
    },
    /// Raw statements, sent without substitution.
    RunSql {
        /// Statements run on apply.
        forward:  Vec<String>,
        /// Statements run on unapply; `None` makes the operation
        /// irreversible.
        backward: Option<Vec<String>>
    }
}

impl Operation {
    /// Model the operation targets.
    #[must_use]
    pub fn model(&self) -> Option<&ModelMeta> {
        match self {
            Self::CreateModel(model) | Self::DeleteModel(model) => Some(model.as_ref()),
            Self::RenameTable { model, .. }
            | Self::AddField { model, .. }
            | Self::RemoveField { model, .. }
            | Self::AlterField { model, .. }
            | Self::AddIndex { model, .. }
            | Self::RemoveIndex { model, .. }
            | Self::AddConstraint { model, .. }
            | Self::RemoveConstraint { model, .. } => Some(model.as_ref()),
            Self::RunSql { .. } => None
        }
    }

    /// Check if the operation runs `ON CLUSTER`.
    #[must_use]
    pub fn is_cluster_scoped(&self) -> bool {
        self.model().is_some_and(|model| model.cluster.is_some())
    }

    /// Statements applying the operation.
    ///
    /// # Errors
    ///
    /// Returns the schema editor error.
    pub fn statements(&self, editor: &SchemaEditor) -> Result<Vec<String>> {
        match self {
            Self::CreateModel(model) => editor.create_model(model, false),
            Self::DeleteModel(model) => editor.delete_model(model),
            Self::RenameTable { model, new_table } => editor.rename_table(model, new_table),
            Self::AddField { model, field } => editor.add_field(model, field),
            Self::RemoveField { model, field } => editor.remove_field(model, field),
            Self::AlterField { model, old, new } => editor.alter_field(model, old, new),
            Self::AddIndex { model, index } => editor.add_index(model, index),
            Self::RemoveIndex { model, index } => editor.remove_index(model, index),
            Self::AddConstraint { model, constraint } => editor.add_constraint(model, constraint),
            Self::RemoveConstraint { model, constraint } => {
                editor.remove_constraint(model, constraint)
            }
            Self::RunSql { forward, .. } => Ok(forward.clone())
        }
    }

    /// Operation undoing this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Migration`] for `RunSql` without backward statements.
    pub fn reverse(&self) -> Result<Self> {
        Ok(match self {
            Self::CreateModel(model) => Self::DeleteModel(Arc::clone(model)),
            Self::DeleteModel(model) => Self::CreateModel(Arc::clone(model)),
            Self::RenameTable { model, new_table } => {
                let mut renamed = ModelMeta::clone(model);
                renamed.db_table.clone_from(new_table);
                Self::RenameTable {
                    model:     Arc::new(renamed),
                    new_table: model.db_table.clone()
                }
            }
            Self::AddField { model, field } => Self::RemoveField {
                model: Arc::clone(model),
                field: field.clone()
            },
            Self::RemoveField { model, field } => Self::AddField {
                model: Arc::clone(model),
                field: field.clone()
            },
            Self::AlterField { model, old, new } => Self::AlterField {
                model: Arc::clone(model),
                old:   new.clone(),
                new:   old.clone()
            },
            Self::AddIndex { model, index } => Self::RemoveIndex {
                model: Arc::clone(model),
                index: index.clone()
            },
            Self::RemoveIndex { model, index } => Self::AddIndex {
                model: Arc::clone(model),
                index: index.clone()
            },
            Self::AddConstraint { model, constraint } => Self::RemoveConstraint {
                model:      Arc::clone(model),
                constraint: constraint.clone()
            },
            Self::RemoveConstraint { model, constraint } => Self::AddConstraint {
                model:      Arc::clone(model),
                constraint: constraint.clone()
            },
            Self::RunSql { forward, backward } => match backward {
                Some(backward) => Self::RunSql {
                    forward:  backward.clone(),
                    backward: Some(forward.clone())
                },
                None => return Err(Error::migration("RunSql has no backward statements"))
            }
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateModel(model) => write!(f, "create model {}", model.name),
            Self::DeleteModel(model) => write!(f, "delete model {}", model.name),
            Self::RenameTable { model, new_table } => {
                write!(f, "rename table {} to {new_table}", model.db_table)
            }
            Self::AddField { model, field } => write!(f, "add field {} to {}", field.name, model.name),
            Self::RemoveField { model, field } => {
                write!(f, "remove field {} from {}", field.name, model.name)
            }
            Self::AlterField { model, new, .. } => {
                write!(f, "alter field {} on {}", new.name, model.name)
            }
            Self::AddIndex { model, index } => {
                write!(f, "add index {} to {}", index.name_or_default(&model.db_table), model.name)
            }
            Self::RemoveIndex { model, index } => write!(
                f,
                "remove index {} from {}",
                index.name_or_default(&model.db_table),
                model.name
            ),
            Self::AddConstraint { model, constraint } => {
                write!(f, "add constraint {} to {}", constraint.name(), model.name)
            }
            Self::RemoveConstraint { model, constraint } => {
                write!(f, "remove constraint {} from {}", constraint.name(), model.name)
            }
            Self::RunSql { forward, .. } => write!(f, "raw SQL ({} statements)", forward.len())
        }
    }
}

/// Named list of operations of one app.
#[derive(Debug, Clone)]
pub struct Migration {
    /// App label.
    pub app:        String,
    /// Migration name, unique within the app.
    pub name:       String,
    /// Operations in apply order.
    pub operations: Vec<Operation>
}

impl Migration {
    /// Empty migration.
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app:        app.into(),
            name:       name.into(),
            operations: Vec::new()
        }
    }

    /// Append an operation.
    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Check if any operation runs `ON CLUSTER`.
    #[must_use]
    pub fn is_cluster_scoped(&self) -> bool {
        self.operations.iter().any(Operation::is_cluster_scoped)
    }
}

/// Applies and unapplies migrations against one connection.
pub struct Migrator<'c> {
    connection: &'c DatabaseWrapper,
    recorder:   MigrationRecorder<'c>
}

impl<'c> Migrator<'c> {
    /// Migrator with a recorder on the same connection.
    ///
    /// # Errors
    ///
    /// See [`MigrationRecorder::new`].
    pub fn new(connection: &'c DatabaseWrapper) -> Result<Self> {
        Ok(Self {
            connection,
            recorder: MigrationRecorder::new(connection)?
        })
    }

    /// Ledger recorder.
    #[must_use]
    pub const fn recorder(&self) -> &MigrationRecorder<'c> {
        &self.recorder
    }

    /// Apply every migration not yet applied, in order.
    ///
    /// Returns the `(app, name)` pairs applied by this call.
    ///
    /// # Errors
    ///
    /// Stops at the first failing migration and returns its error.
    pub fn migrate(&self, migrations: &[Migration]) -> Result<Vec<(String, String)>> {
        let mut done = Vec::new();
        for migration in migrations {
            if self.apply(migration)? {
                done.push((migration.app.clone(), migration.name.clone()));
            }
        }
        Ok(done)
    }

    /// Apply `migration` and record it. `false` when already applied.
    ///
    /// Cluster-scoped operations are skipped when another replica has
    /// already applied the migration.
    ///
    /// # Errors
    ///
    /// Returns the failing statement's error; the migration is then left
    /// unrecorded.
    pub fn apply(&self, migration: &Migration) -> Result<bool> {
        self.recorder.ensure_schema()?;
        let key = (migration.app.clone(), migration.name.clone());
        if self.recorder.applied_migrations()?.contains(&key) {
            debug!(app = %migration.app, name = %migration.name, "already applied");
            return Ok(false);
        }
        let on_cluster = migration.is_cluster_scoped()
            && self
                .recorder
                .probe_cluster(&migration.app, &migration.name, false)?;
        let editor = self.connection.schema_editor();
        for operation in &migration.operations {
            if on_cluster && operation.is_cluster_scoped() {
                info!(
                    app = %migration.app,
                    name = %migration.name,
                    %operation,
                    "skipped, already applied on the cluster"
                );
                continue;
            }
            self.connection.run_ddl(&operation.statements(editor)?)?;
        }
        self.recorder
            .record_applied(&migration.app, &migration.name)?;
        info!(app = %migration.app, name = %migration.name, "applied");
        Ok(true)
    }

    /// Undo `migration` and record it. `false` when not applied.
    ///
    /// Cluster-scoped operations are skipped when another replica has
    /// already unapplied the migration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Migration`] for irreversible operations, checked
    /// before anything runs, and the failing statement's error otherwise.
    pub fn unapply(&self, migration: &Migration) -> Result<bool> {
        self.recorder.ensure_schema()?;
        let key = (migration.app.clone(), migration.name.clone());
        if !self.recorder.applied_migrations()?.contains(&key) {
            debug!(app = %migration.app, name = %migration.name, "not applied");
            return Ok(false);
        }
        let reversed = migration
            .operations
            .iter()
            .rev()
            .map(Operation::reverse)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::migration(format!("{}.{}: {e}", migration.app, migration.name)))?;
        let on_cluster = migration.is_cluster_scoped()
            && self
                .recorder
                .probe_cluster(&migration.app, &migration.name, true)?;
        let editor = self.connection.schema_editor();
        for operation in &reversed {
            if on_cluster && operation.is_cluster_scoped() {
                info!(
                    app = %migration.app,
                    name = %migration.name,
                    %operation,
                    "skipped, already unapplied on the cluster"
                );
                continue;
            }
            self.connection.run_ddl(&operation.statements(editor)?)?;
        }
        self.recorder
            .record_unapplied(&migration.app, &migration.name)?;
        info!(app = %migration.app, name = %migration.name, "unapplied");
        Ok(true)
    }
}
