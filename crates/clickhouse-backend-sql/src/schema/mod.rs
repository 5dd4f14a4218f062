// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Schema compiler: engines, skip-indexes, constraints and DDL.
//!
//! # Overview
//!
//! - [`Engine`]: Table engine with `ORDER BY`, `PARTITION BY`, `PRIMARY KEY` and `SETTINGS`
//! - [`Index`]: Data-skipping index
//! - [`Constraint`]: `CHECK` or no-op unique constraint
//! - [`SchemaEditor`]: DDL statements for model and field operations

mod constraint;
mod editor;
mod engine;
mod index;

pub use constraint::Constraint;
pub use editor::SchemaEditor;
pub use engine::{Engine, EngineKind, Replication};
pub use index::{Index, IndexType, MAX_INDEX_NAME_LENGTH};
