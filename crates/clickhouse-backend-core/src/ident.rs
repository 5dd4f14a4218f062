// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Identifier rules and quoting.

use std::sync::LazyLock;

use regex::Regex;

/// Longest identifier ClickHouse accepts, in bytes.
pub const MAX_NAME_LENGTH: usize = 251;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Check if `name` is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Quote a table, column or index name with double quotes.
///
/// Names that are already quoted are returned unchanged; embedded quotes and
/// backslashes are escaped.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_core::ident::quote_name;
///
/// assert_eq!(quote_name("event"), "\"event\"");
/// assert_eq!(quote_name("\"event\""), "\"event\"");
/// ```
#[must_use]
pub fn quote_name(name: &str) -> String {
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        return name.to_owned();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c)
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("ts" => true)]
    #[test_case("_private" => true)]
    #[test_case("col2" => true)]
    #[test_case("2col" => false)]
    #[test_case("with space" => false)]
    #[test_case("" => false)]
    #[test_case("dash-ed" => false)]
    fn identifiers(name: &str) -> bool {
        is_identifier(name)
    }

    #[test]
    fn quoting_escapes_and_never_doubles() {
        assert_eq!(quote_name("a\"b"), r#""a\"b""#);
        assert_eq!(quote_name(&quote_name("x")), "\"x\"");
    }
}
