// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Query-level `SETTINGS` clause.
//!
//! Keys must be plain identifiers. Booleans render as `1`/`0`, other scalars
//! through the literal escape. Composite values are rejected.

use clickhouse_backend_core::{Error, Result, Value, escape::escape_value, ident::is_identifier};
use indexmap::IndexMap;

/// Ordered `name = value` settings attached to a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySettings(IndexMap<String, Value>);

impl QuerySettings {
    /// Empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a setting.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a setting in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Merge `other` over `self`; keys of `other` win.
    pub fn extend(&mut self, other: &Self) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Setting value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Check if no setting is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Render as `k=v, k=v`, without the keyword.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for keys that are not identifiers and for
    /// composite or null values.
    pub fn render(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            if !is_identifier(name) {
                return Err(Error::config(format!("invalid setting name {name:?}")));
            }
            let literal = match value {
                Value::Bool(b) => u8::from(*b).to_string(),
                Value::Null => {
                    return Err(Error::config(format!("setting {name} cannot be NULL")));
                }
                v if v.is_composite() => {
                    return Err(Error::config(format!(
                        "setting {name} must be a scalar, got {}",
                        v.type_name()
                    )));
                }
                v => escape_value(v)
            };
            parts.push(format!("{name}={literal}"));
        }
        Ok(parts.join(", "))
    }

    /// Render as ` SETTINGS k=v, ...`, or an empty string when empty.
    ///
    /// # Errors
    ///
    /// See [`QuerySettings::render`].
    pub fn clause(&self) -> Result<String> {
        if self.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(" SETTINGS {}", self.render()?))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QuerySettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_order() {
        let s = QuerySettings::new()
            .with("max_threads", 4)
            .with("final", true)
            .with("load_balancing", "random");
        assert_eq!(
            s.clause().unwrap(),
            " SETTINGS max_threads=4, final=1, load_balancing='random'"
        );
    }

    #[test]
    fn empty_renders_nothing() {
        assert_eq!(QuerySettings::new().clause().unwrap(), "");
    }

    #[test]
    fn rejects_bad_keys_and_values() {
        let s = QuerySettings::new().with("max threads; DROP", 1);
        assert!(s.render().unwrap_err().is_config());
        let s = QuerySettings::new().with("x", vec![1_i32]);
        assert!(s.render().is_err());
        let s = QuerySettings::new().with("x", Value::Null);
        assert!(s.render().is_err());
    }

    #[test]
    fn extend_overrides() {
        let mut base: QuerySettings = [("mutations_sync", 1)].into_iter().collect();
        base.extend(&QuerySettings::new().with("mutations_sync", 2));
        assert_eq!(base.get("mutations_sync"), Some(&Value::Int(2)));
    }
}
