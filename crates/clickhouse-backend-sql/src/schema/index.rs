// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Data-skipping index definitions.
//!
//! # Examples
//!
//! ```rust
//! use clickhouse_backend_sql::schema::{Index, IndexType};
//!
//! let idx = Index::new(["name"], IndexType::TokenBf {
//!     size:   10240,
//!     hashes: 3,
//!     seed:   0
//! })
//! .granularity(4);
//! assert_eq!(idx.name_or_default("user"), "idx_user_name");
//! assert_eq!(idx.index_type.as_sql(), "tokenbf_v1(10240, 3, 0)");
//! ```

use std::fmt;

use clickhouse_backend_core::{Error, Result, ident::quote_name, types::Field};

use super::engine::column_expr;

/// Longest index name accepted.
pub const MAX_INDEX_NAME_LENGTH: usize = 30;

/// Skip-index type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexType {
    /// `minmax`.
    MinMax,
    /// `set(max_rows)`.
    Set(u64),
    /// `ngrambf_v1(n, size, hashes, seed)`.
    NgramBf {
        /// Gram length.
        n:      u64,
        /// Filter size in bytes.
        size:   u64,
        /// Number of hash functions.
        hashes: u64,
        /// Hash seed.
        seed:   u64
    },
    /// `tokenbf_v1(size, hashes, seed)`.
    TokenBf {
        /// Filter size in bytes.
        size:   u64,
        /// Number of hash functions.
        hashes: u64,
        /// Hash seed.
        seed:   u64
    },
    /// `bloom_filter([false_positive])`.
    BloomFilter(Option<f64>)
}

impl IndexType {
    /// SQL text of the type.
    #[must_use]
    pub fn as_sql(&self) -> String {
        match self {
            Self::MinMax => "minmax".into(),
            Self::Set(n) => format!("set({n})"),
            Self::NgramBf {
                n,
                size,
                hashes,
                seed
            } => format!("ngrambf_v1({n}, {size}, {hashes}, {seed})"),
            Self::TokenBf { size, hashes, seed } => format!("tokenbf_v1({size}, {hashes}, {seed})"),
            Self::BloomFilter(None) => "bloom_filter".into(),
            Self::BloomFilter(Some(p)) => format!("bloom_filter({p})")
        }
    }

    /// Parse `name[(args)]` as rendered by the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unknown types and wrong arities.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (name, args) = match text.split_once('(') {
            Some((name, rest)) => {
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| Error::config(format!("unbalanced index type {text}")))?;
                let args: Vec<&str> = inner
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .collect();
                (name.trim(), args)
            }
            None => (text, Vec::new())
        };
        let int = |s: &str| {
            s.parse::<u64>()
                .map_err(|_| Error::config(format!("invalid {name} argument {s}")))
        };
        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(Error::config(format!(
                    "{name} takes {expected} arguments, got {}",
                    args.len()
                )))
            }
        };
        match name {
            "minmax" => arity(0).map(|()| Self::MinMax),
            "set" => {
                arity(1)?;
                Ok(Self::Set(int(args[0])?))
            }
            "ngrambf_v1" => {
                arity(4)?;
                Ok(Self::NgramBf {
                    n:      int(args[0])?,
                    size:   int(args[1])?,
                    hashes: int(args[2])?,
                    seed:   int(args[3])?
                })
            }
            "tokenbf_v1" => {
                arity(3)?;
                Ok(Self::TokenBf {
                    size:   int(args[0])?,
                    hashes: int(args[1])?,
                    seed:   int(args[2])?
                })
            }
            "bloom_filter" => match args.as_slice() {
                [] => Ok(Self::BloomFilter(None)),
                [p] => p
                    .parse::<f64>()
                    .map(|p| Self::BloomFilter(Some(p)))
                    .map_err(|_| Error::config(format!("invalid bloom_filter argument {p}"))),
                _ => Err(Error::config("bloom_filter takes at most 1 argument"))
            },
            other => Err(Error::config(format!("unknown index type {other}")))
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_sql())
    }
}

/// Data-skipping index over columns or expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Index name. Generated when not specified.
    ///
    /// Format: `idx_{table}_{col1}_{col2}_...`, cut to 30 bytes.
    pub name:        Option<String>,
    /// Field names or raw expressions.
    pub expressions: Vec<String>,
    /// Index type.
    pub index_type:  IndexType,
    /// Granules per index block.
    pub granularity: u64
}

impl Index {
    /// Create an index with granularity 1.
    pub fn new<S: Into<String>>(expressions: impl IntoIterator<Item = S>, index_type: IndexType) -> Self {
        Self {
            name: None,
            expressions: expressions.into_iter().map(Into::into).collect(),
            index_type,
            granularity: 1
        }
    }

    /// Set the index name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the granularity.
    #[must_use]
    pub const fn granularity(mut self, granularity: u64) -> Self {
        self.granularity = granularity;
        self
    }

    /// Generate the default index name.
    #[must_use]
    pub fn default_name(&self, table: &str) -> String {
        let columns: Vec<String> = self
            .expressions
            .iter()
            .map(|e| {
                e.chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                    .collect::<String>()
                    .trim_matches('_')
                    .to_owned()
            })
            .collect();
        let mut name = format!("idx_{}_{}", table, columns.join("_"));
        name.truncate(MAX_INDEX_NAME_LENGTH);
        name.trim_end_matches('_').to_owned()
    }

    /// Get the index name, using the default if not set.
    #[must_use]
    pub fn name_or_default(&self, table: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.default_name(table))
    }

    /// Verify name, expressions and granularity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the violation.
    pub fn check(&self, table: &str) -> Result<()> {
        let name = self.name_or_default(table);
        if name.len() > MAX_INDEX_NAME_LENGTH {
            return Err(Error::config(format!(
                "index name {name} is longer than {MAX_INDEX_NAME_LENGTH} bytes"
            )));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(Error::config(format!("index name {name} must start with a letter")));
        }
        if self.expressions.is_empty() {
            return Err(Error::config(format!("index {name} needs at least one expression")));
        }
        if self.granularity == 0 {
            return Err(Error::config(format!("index {name}: granularity must be positive")));
        }
        Ok(())
    }

    /// `INDEX "name" (exprs) TYPE t GRANULARITY n`.
    #[must_use]
    pub fn definition(&self, table: &str, fields: &[Field]) -> String {
        let exprs: Vec<String> = self
            .expressions
            .iter()
            .map(|e| column_expr(e, fields))
            .collect();
        format!(
            "INDEX {} ({}) TYPE {} GRANULARITY {}",
            quote_name(&self.name_or_default(table)),
            exprs.join(", "),
            self.index_type,
            self.granularity
        )
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("minmax" => IndexType::MinMax)]
    #[test_case("set(100)" => IndexType::Set(100))]
    #[test_case("bloom_filter" => IndexType::BloomFilter(None))]
    #[test_case("bloom_filter(0.025)" => IndexType::BloomFilter(Some(0.025)))]
    #[test_case("ngrambf_v1(3, 256, 2, 0)" => IndexType::NgramBf { n: 3, size: 256, hashes: 2, seed: 0 })]
    #[test_case("tokenbf_v1(256, 2, 0)" => IndexType::TokenBf { size: 256, hashes: 2, seed: 0 })]
    fn parse_types(text: &str) -> IndexType {
        IndexType::parse(text).unwrap()
    }

    #[test_case("set" ; "set without argument")]
    #[test_case("minmax(1)" ; "minmax with argument")]
    #[test_case("tokenbf_v1(1, 2)" ; "tokenbf short")]
    #[test_case("hash(1)" ; "unknown type")]
    fn parse_rejects(text: &str) {
        assert!(IndexType::parse(text).unwrap_err().is_config());
    }

    #[test]
    fn default_name_format() {
        let idx = Index::new(["name", "email"], IndexType::MinMax);
        assert_eq!(idx.default_name("users"), "idx_users_name_email");
        let idx = Index::new(["lower(name)"], IndexType::MinMax);
        assert_eq!(idx.default_name("u"), "idx_u_lower_name");
    }

    #[test]
    fn default_name_is_cut() {
        let idx = Index::new(["a_very_long_column_name"], IndexType::MinMax);
        let name = idx.default_name("a_long_table");
        assert!(name.len() <= MAX_INDEX_NAME_LENGTH);
        assert!(idx.check("a_long_table").is_ok());
    }

    #[test]
    fn check_name_rules() {
        let idx = Index::new(["a"], IndexType::MinMax).with_name("1idx");
        assert!(idx.check("t").is_err());
        let idx = Index::new(["a"], IndexType::MinMax).with_name("x".repeat(31));
        assert!(idx.check("t").is_err());
        let idx = Index::new(["a"], IndexType::MinMax).granularity(0);
        assert!(idx.check("t").is_err());
    }

    #[test]
    fn definition_quotes_columns() {
        let fields = vec![Field::string("name").db_column("user_name")];
        let idx = Index::new(["name", "length(user_name)"], IndexType::Set(1000)).granularity(4);
        assert_eq!(
            idx.definition("u", &fields),
            "INDEX \"idx_u_name_length_user_name\" (\"user_name\", length(user_name)) TYPE \
             set(1000) GRANULARITY 4"
        );
    }
}
