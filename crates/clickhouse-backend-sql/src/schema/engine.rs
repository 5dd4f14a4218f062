// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Table engines.
//!
//! | Engine | Arguments | Clauses |
//! |--------|-----------|---------|
//! | `MergeTree` family | variant specific | `ORDER BY` (required), `PARTITION BY`, `PRIMARY KEY`, `SETTINGS` |
//! | `Replicated*` | `'zoo_path', 'replica'` then the variant arguments | as the base variant |
//! | `Distributed` | `'cluster', 'database', 'table'[, sharding_key[, 'policy']]` | `SETTINGS` |
//! | `Log`, `TinyLog`, `StripeLog`, `Memory` | none | `SETTINGS` |
//!
//! Clause items naming a model field are rendered as the quoted column; any
//! other item is kept as a raw expression.

use clickhouse_backend_core::{
    Error, Result,
    escape::quote_string,
    ident::quote_name,
    types::Field
};

use crate::settings::QuerySettings;

/// Engine variant with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineKind {
    /// `MergeTree`.
    MergeTree,
    /// `ReplacingMergeTree([ver[, is_deleted]])`.
    ReplacingMergeTree {
        /// Version column.
        ver:        Option<String>,
        /// Deletion marker column, requires `ver`.
        is_deleted: Option<String>
    },
    /// `SummingMergeTree([columns])`.
    SummingMergeTree {
        /// Columns to sum.
        columns: Vec<String>
    },
    /// `AggregatingMergeTree`.
    AggregatingMergeTree,
    /// `CollapsingMergeTree(sign)`.
    CollapsingMergeTree {
        /// Sign column.
        sign: String
    },
    /// `VersionedCollapsingMergeTree(sign, version)`.
    VersionedCollapsingMergeTree {
        /// Sign column.
        sign:    String,
        /// Version column.
        version: String
    },
    /// `GraphiteMergeTree('config_section')`.
    GraphiteMergeTree {
        /// Rollup configuration section.
        config_section: String
    },
    /// `Distributed(cluster, database, table[, sharding_key[, policy]])`.
    Distributed {
        /// Cluster name.
        cluster:      String,
        /// Database of the local table.
        database:     String,
        /// Local table.
        table:        String,
        /// Sharding expression.
        sharding_key: Option<String>,
        /// Storage policy.
        policy_name:  Option<String>
    },
    /// `Log`.
    Log,
    /// `TinyLog`.
    TinyLog,
    /// `StripeLog`.
    StripeLog,
    /// `Memory`.
    Memory
}

impl EngineKind {
    /// Engine name without the `Replicated` prefix.
    #[must_use]
    pub const fn base_name(&self) -> &'static str {
        match self {
            Self::MergeTree => "MergeTree",
            Self::ReplacingMergeTree { .. } => "ReplacingMergeTree",
            Self::SummingMergeTree { .. } => "SummingMergeTree",
            Self::AggregatingMergeTree => "AggregatingMergeTree",
            Self::CollapsingMergeTree { .. } => "CollapsingMergeTree",
            Self::VersionedCollapsingMergeTree { .. } => "VersionedCollapsingMergeTree",
            Self::GraphiteMergeTree { .. } => "GraphiteMergeTree",
            Self::Distributed { .. } => "Distributed",
            Self::Log => "Log",
            Self::TinyLog => "TinyLog",
            Self::StripeLog => "StripeLog",
            Self::Memory => "Memory"
        }
    }

    /// Check if the variant belongs to the MergeTree family.
    #[must_use]
    pub const fn is_merge_tree(&self) -> bool {
        !matches!(
            self,
            Self::Distributed { .. } | Self::Log | Self::TinyLog | Self::StripeLog | Self::Memory
        )
    }
}

/// `Replicated*` coordination arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replication {
    /// ZooKeeper path template, such as `/clickhouse/tables/{shard}/t`.
    pub zoo_path:     String,
    /// Replica name template, such as `{replica}`.
    pub replica_name: String
}

/// Table engine with its clauses.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_sql::schema::Engine;
///
/// let engine = Engine::replacing_merge_tree(Some("ver"))
///     .replicated("/clickhouse/tables/{shard}/event", "{replica}")
///     .order_by(["ts", "id"])
///     .partition_by(["toYYYYMM(ts)"]);
/// assert_eq!(engine.name(), "ReplicatedReplacingMergeTree");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    /// Variant.
    pub kind:         EngineKind,
    /// Replication, for the `Replicated*` variants.
    pub replication:  Option<Replication>,
    /// `ORDER BY` items.
    pub order_by:     Vec<String>,
    /// `PARTITION BY` items.
    pub partition_by: Vec<String>,
    /// `PRIMARY KEY` items, a prefix of `order_by`.
    pub primary_key:  Vec<String>,
    /// Table `SETTINGS`.
    pub settings:     QuerySettings
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineKind::MergeTree)
    }
}

impl Engine {
    /// Engine of the given variant without clauses.
    #[must_use]
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            replication: None,
            order_by: Vec::new(),
            partition_by: Vec::new(),
            primary_key: Vec::new(),
            settings: QuerySettings::new()
        }
    }

    /// `MergeTree`.
    #[must_use]
    pub fn merge_tree() -> Self {
        Self::new(EngineKind::MergeTree)
    }

    /// `ReplacingMergeTree([ver])`.
    #[must_use]
    pub fn replacing_merge_tree(ver: Option<&str>) -> Self {
        Self::new(EngineKind::ReplacingMergeTree {
            ver:        ver.map(str::to_owned),
            is_deleted: None
        })
    }

    /// `SummingMergeTree([columns])`.
    pub fn summing_merge_tree<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::new(EngineKind::SummingMergeTree {
            columns: columns.into_iter().map(Into::into).collect()
        })
    }

    /// `AggregatingMergeTree`.
    #[must_use]
    pub fn aggregating_merge_tree() -> Self {
        Self::new(EngineKind::AggregatingMergeTree)
    }

    /// `CollapsingMergeTree(sign)`.
    pub fn collapsing_merge_tree(sign: impl Into<String>) -> Self {
        Self::new(EngineKind::CollapsingMergeTree { sign: sign.into() })
    }

    /// `VersionedCollapsingMergeTree(sign, version)`.
    pub fn versioned_collapsing_merge_tree(
        sign: impl Into<String>,
        version: impl Into<String>
    ) -> Self {
        Self::new(EngineKind::VersionedCollapsingMergeTree {
            sign:    sign.into(),
            version: version.into()
        })
    }

    /// `GraphiteMergeTree('config_section')`.
    pub fn graphite_merge_tree(config_section: impl Into<String>) -> Self {
        Self::new(EngineKind::GraphiteMergeTree {
            config_section: config_section.into()
        })
    }

    /// `Distributed(cluster, database, table[, sharding_key])`.
    pub fn distributed(
        cluster: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        sharding_key: Option<&str>
    ) -> Self {
        Self::new(EngineKind::Distributed {
            cluster:      cluster.into(),
            database:     database.into(),
            table:        table.into(),
            sharding_key: sharding_key.map(str::to_owned),
            policy_name:  None
        })
    }

    /// `Log`.
    #[must_use]
    pub fn log() -> Self {
        Self::new(EngineKind::Log)
    }

    /// `Memory`.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(EngineKind::Memory)
    }

    /// Turn into the `Replicated*` variant.
    #[must_use]
    pub fn replicated(mut self, zoo_path: impl Into<String>, replica_name: impl Into<String>) -> Self {
        self.replication = Some(Replication {
            zoo_path:     zoo_path.into(),
            replica_name: replica_name.into()
        });
        self
    }

    /// Set `ORDER BY`.
    #[must_use]
    pub fn order_by<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.order_by = items.into_iter().map(Into::into).collect();
        self
    }

    /// Set `PARTITION BY`.
    #[must_use]
    pub fn partition_by<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.partition_by = items.into_iter().map(Into::into).collect();
        self
    }

    /// Set `PRIMARY KEY`.
    #[must_use]
    pub fn primary_key<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = items.into_iter().map(Into::into).collect();
        self
    }

    /// Add a table setting.
    #[must_use]
    pub fn setting(
        mut self,
        name: impl Into<String>,
        value: impl Into<clickhouse_backend_core::Value>
    ) -> Self {
        self.settings.insert(name, value);
        self
    }

    /// Full engine name.
    #[must_use]
    pub fn name(&self) -> String {
        if self.replication.is_some() {
            format!("Replicated{}", self.kind.base_name())
        } else {
            self.kind.base_name().to_owned()
        }
    }

    /// Check if the engine belongs to the MergeTree family.
    #[must_use]
    pub const fn is_merge_tree(&self) -> bool {
        self.kind.is_merge_tree()
    }

    /// Check if the engine is a `Replicated*` variant.
    #[must_use]
    pub const fn is_replicated(&self) -> bool {
        self.replication.is_some()
    }

    /// Check if the engine is `Distributed`.
    #[must_use]
    pub const fn is_distributed(&self) -> bool {
        matches!(self.kind, EngineKind::Distributed { .. })
    }

    /// Verify the engine against its variant rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when clauses are set on an engine that does
    /// not take them, when `PRIMARY KEY` is not a prefix of `ORDER BY`, or
    /// when `is_deleted` is set without `ver`.
    pub fn check(&self) -> Result<()> {
        let name = self.name();
        if !self.is_merge_tree() {
            if self.replication.is_some() {
                return Err(Error::config(format!(
                    "{} cannot be replicated",
                    self.kind.base_name()
                )));
            }
            if !self.order_by.is_empty() || !self.partition_by.is_empty() || !self.primary_key.is_empty() {
                return Err(Error::config(format!(
                    "{name} does not accept ORDER BY, PARTITION BY or PRIMARY KEY"
                )));
            }
        }
        if !self.primary_key.is_empty() {
            let order_by = if self.order_by.is_empty() {
                &self.primary_key
            } else {
                &self.order_by
            };
            if !order_by.starts_with(&self.primary_key) {
                return Err(Error::config(format!(
                    "{name}: primary key ({}) must be a prefix of the sorting key ({})",
                    self.primary_key.join(", "),
                    order_by.join(", ")
                )));
            }
        }
        if let EngineKind::ReplacingMergeTree {
            ver: None,
            is_deleted: Some(_)
        } = &self.kind
        {
            return Err(Error::config(format!("{name}: is_deleted requires ver")));
        }
        Ok(())
    }

    fn args(&self, fields: &[Field]) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(r) = &self.replication {
            args.push(quote_string(&r.zoo_path));
            args.push(quote_string(&r.replica_name));
        }
        match &self.kind {
            EngineKind::ReplacingMergeTree { ver, is_deleted } => {
                args.extend(ver.iter().chain(is_deleted).map(|c| column_expr(c, fields)));
            }
            EngineKind::SummingMergeTree { columns } if !columns.is_empty() => {
                args.push(parenthesized(columns, fields));
            }
            EngineKind::CollapsingMergeTree { sign } => args.push(column_expr(sign, fields)),
            EngineKind::VersionedCollapsingMergeTree { sign, version } => {
                args.push(column_expr(sign, fields));
                args.push(column_expr(version, fields));
            }
            EngineKind::GraphiteMergeTree { config_section } => {
                args.push(quote_string(config_section));
            }
            EngineKind::Distributed {
                cluster,
                database,
                table,
                sharding_key,
                policy_name
            } => {
                args.push(quote_string(cluster));
                args.push(quote_string(database));
                args.push(quote_string(table));
                if let Some(key) = sharding_key {
                    args.push(column_expr(key, fields));
                    if let Some(policy) = policy_name {
                        args.push(quote_string(policy));
                    }
                }
            }
            _ => {}
        }
        args
    }

    /// Render `ENGINE = ...` with its clauses for a table with `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid setting names or values.
    pub fn render(&self, fields: &[Field]) -> Result<String> {
        let args = self.args(fields);
        let mut sql = if args.is_empty() {
            format!("ENGINE = {}", self.name())
        } else {
            format!("ENGINE = {}({})", self.name(), args.join(", "))
        };
        if self.is_merge_tree() {
            if self.order_by.is_empty() {
                sql.push_str(" ORDER BY tuple()");
            } else {
                sql.push_str(&format!(" ORDER BY {}", parenthesized(&self.order_by, fields)));
            }
            if !self.partition_by.is_empty() {
                sql.push_str(&format!(
                    " PARTITION BY {}",
                    parenthesized(&self.partition_by, fields)
                ));
            }
            if !self.primary_key.is_empty() {
                sql.push_str(&format!(
                    " PRIMARY KEY {}",
                    parenthesized(&self.primary_key, fields)
                ));
            }
        }
        sql.push_str(&self.settings.clause()?);
        Ok(sql)
    }
}

/// Quoted column when `item` names a field, the raw expression otherwise.
pub(crate) fn column_expr(item: &str, fields: &[Field]) -> String {
    fields
        .iter()
        .find(|f| f.name == item || f.column_name() == item)
        .map_or_else(|| item.to_owned(), |f| quote_name(f.column_name()))
}

fn parenthesized(items: &[String], fields: &[Field]) -> String {
    let rendered: Vec<String> = items.iter().map(|i| column_expr(i, fields)).collect();
    format!("({})", rendered.join(", "))
}
