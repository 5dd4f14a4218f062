// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `EXPLAIN` prefix and `FORMAT` suffix.
//!
//! | Kind | Options |
//! |------|---------|
//! | `AST` | `graph`, `optimize` |
//! | `SYNTAX` | none |
//! | `QUERY TREE` | `run_passes`, `dump_passes`, `passes` |
//! | `PLAN` | `header`, `description`, `indexes`, `actions`, `json` |
//! | `PIPELINE` | `header`, `graph`, `compact` |
//! | `ESTIMATE` | none |
//! | `TABLE OVERRIDE` | none |

use std::{fmt, str::FromStr};

use clickhouse_backend_core::{Error, Result, Value};
use indexmap::IndexMap;

/// Output formats accepted after `FORMAT`.
pub const FORMATS: &[&str] = &[
    "Arrow",
    "ArrowStream",
    "Avro",
    "CSV",
    "CSVWithNames",
    "CSVWithNamesAndTypes",
    "CustomSeparated",
    "CustomSeparatedWithNames",
    "CustomSeparatedWithNamesAndTypes",
    "JSON",
    "JSONAsObject",
    "JSONAsString",
    "JSONColumns",
    "JSONColumnsWithMetadata",
    "JSONCompact",
    "JSONCompactColumns",
    "JSONCompactEachRow",
    "JSONCompactEachRowWithNames",
    "JSONCompactEachRowWithNamesAndTypes",
    "JSONCompactStrings",
    "JSONCompactStringsEachRow",
    "JSONCompactStringsEachRowWithNames",
    "JSONCompactStringsEachRowWithNamesAndTypes",
    "JSONEachRow",
    "JSONEachRowWithProgress",
    "JSONLines",
    "JSONObjectEachRow",
    "JSONStrings",
    "JSONStringsEachRow",
    "JSONStringsEachRowWithProgress",
    "Markdown",
    "MsgPack",
    "MySQLDump",
    "Native",
    "Null",
    "ORC",
    "Parquet",
    "Pretty",
    "PrettyCompact",
    "PrettyCompactMonoBlock",
    "PrettyCompactNoEscapes",
    "PrettyCompactNoEscapesMonoBlock",
    "PrettyMonoBlock",
    "PrettyNoEscapes",
    "PrettyNoEscapesMonoBlock",
    "PrettySpace",
    "PrettySpaceMonoBlock",
    "PrettySpaceNoEscapes",
    "PrettySpaceNoEscapesMonoBlock",
    "Protobuf",
    "ProtobufSingle",
    "Raw",
    "RawWithNames",
    "RawWithNamesAndTypes",
    "RowBinary",
    "RowBinaryWithNames",
    "RowBinaryWithNamesAndTypes",
    "SQLInsert",
    "TSKV",
    "TSV",
    "TSVRaw",
    "TSVRawWithNames",
    "TSVRawWithNamesAndTypes",
    "TSVWithNames",
    "TSVWithNamesAndTypes",
    "TabSeparated",
    "TabSeparatedRaw",
    "TabSeparatedRawWithNames",
    "TabSeparatedRawWithNamesAndTypes",
    "TabSeparatedWithNames",
    "TabSeparatedWithNamesAndTypes",
    "Template",
    "Values",
    "Vertical",
    "XML"
];

/// Check that `format` is a supported output format.
///
/// # Errors
///
/// Returns [`Error::Config`] for unknown formats.
pub fn check_format(format: &str) -> Result<()> {
    if FORMATS.contains(&format) {
        Ok(())
    } else {
        Err(Error::config(format!("unknown output format {format}")))
    }
}

/// What `EXPLAIN` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplainKind {
    /// `AST`.
    Ast,
    /// `SYNTAX`.
    Syntax,
    /// `QUERY TREE`.
    QueryTree,
    /// `PLAN`.
    #[default]
    Plan,
    /// `PIPELINE`.
    Pipeline,
    /// `ESTIMATE`.
    Estimate,
    /// `TABLE OVERRIDE`.
    TableOverride
}

impl ExplainKind {
    /// Keyword text.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ast => "AST",
            Self::Syntax => "SYNTAX",
            Self::QueryTree => "QUERY TREE",
            Self::Plan => "PLAN",
            Self::Pipeline => "PIPELINE",
            Self::Estimate => "ESTIMATE",
            Self::TableOverride => "TABLE OVERRIDE"
        }
    }

    /// Options accepted by this kind.
    #[must_use]
    pub const fn options(&self) -> &'static [&'static str] {
        match self {
            Self::Ast => &["graph", "optimize"],
            Self::QueryTree => &["run_passes", "dump_passes", "passes"],
            Self::Plan => &["header", "description", "indexes", "actions", "json"],
            Self::Pipeline => &["header", "graph", "compact"],
            Self::Syntax | Self::Estimate | Self::TableOverride => &[]
        }
    }
}

impl fmt::Display for ExplainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplainKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(match normalized.to_ascii_uppercase().as_str() {
            "AST" => Self::Ast,
            "SYNTAX" => Self::Syntax,
            "QUERY TREE" => Self::QueryTree,
            "PLAN" => Self::Plan,
            "PIPELINE" => Self::Pipeline,
            "ESTIMATE" => Self::Estimate,
            "TABLE OVERRIDE" => Self::TableOverride,
            _ => return Err(Error::config(format!("unknown EXPLAIN type {s}")))
        })
    }
}

/// `EXPLAIN` request attached to a select.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_sql::query::{Explain, ExplainKind};
///
/// let explain = Explain::new(ExplainKind::Plan).option("indexes", 1);
/// assert_eq!(explain.render().unwrap(), "EXPLAIN PLAN indexes=1");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Explain {
    /// Kind.
    pub kind:    ExplainKind,
    /// Options in insertion order.
    pub options: IndexMap<String, Value>
}

impl Explain {
    /// Explain without options.
    #[must_use]
    pub fn new(kind: ExplainKind) -> Self {
        Self {
            kind,
            options: IndexMap::new()
        }
    }

    /// Add an option.
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Render `EXPLAIN KIND [k=v, ...]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for options the kind does not accept and for
    /// values that are not booleans or integers.
    pub fn render(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.options.len());
        for (name, value) in &self.options {
            if !self.kind.options().contains(&name.as_str()) {
                return Err(Error::config(format!(
                    "EXPLAIN {} does not accept option {name}",
                    self.kind
                )));
            }
            let value = match value {
                Value::Bool(b) => u8::from(*b).to_string(),
                Value::Int(_) | Value::UInt(_) => value.to_text().unwrap_or_default(),
                other => {
                    return Err(Error::config(format!(
                        "EXPLAIN option {name} must be a boolean or an integer, got {}",
                        other.type_name()
                    )));
                }
            };
            parts.push(format!("{name}={value}"));
        }
        if parts.is_empty() {
            Ok(format!("EXPLAIN {}", self.kind))
        } else {
            Ok(format!("EXPLAIN {} {}", self.kind, parts.join(", ")))
        }
    }
}
