// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Client-side parameter substitution.
//!
//! Compiled statements use `%s` and `%(name)s` placeholders with `%%` for a
//! literal percent sign. Substitution renders every value through
//! [`escape_value`], so the server only ever sees literals.
//!
//! | Params | Placeholders accepted |
//! |--------|-----------------------|
//! | [`Params::None`] | none; the text is sent untouched, `%%` included |
//! | [`Params::Positional`] | `%s`, `%%` |
//! | [`Params::Named`] | `%(name)s`, `%%` |
//! | [`Params::Rows`] | rejected; rows travel through the insert path |
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_core::{Params, Value};
//! use clickhouse_backend_driver::params::substitute;
//!
//! let sql = substitute(
//!     "SELECT %s LIKE '%%x'",
//!     &Params::Positional(vec![Value::from("it's")])
//! )
//! .unwrap();
//! assert_eq!(sql, r"SELECT 'it\'s' LIKE '%x'");
//! ```

use clickhouse_backend_core::{Error, Params, Result, Value, escape::escape_value};

/// Replace placeholders in `query` with escaped literals.
///
/// # Errors
///
/// Returns [`Error::Interface`] when placeholders and parameters disagree:
/// too few or too many values, a missing name, a mixed style, an unknown
/// `%` directive, or a row matrix.
pub fn substitute(query: &str, params: &Params) -> Result<String> {
    match params {
        Params::None => Ok(query.to_owned()),
        Params::Positional(values) => {
            let mut next = values.iter();
            let out = render(query, |placeholder| match placeholder {
                Placeholder::Positional => next
                    .next()
                    .map(escape_value)
                    .ok_or_else(|| Error::interface("not enough parameters for the query")),
                Placeholder::Named(name) => Err(Error::interface(format!(
                    "named placeholder %({name})s used with positional parameters"
                )))
            })?;
            if next.next().is_some() {
                return Err(Error::interface(format!(
                    "{} parameters given, query uses fewer",
                    values.len()
                )));
            }
            Ok(out)
        }
        Params::Named(values) => render(query, |placeholder| match placeholder {
            Placeholder::Named(name) => values
                .get(name)
                .map(escape_value)
                .ok_or_else(|| Error::interface(format!("missing parameter {name}"))),
            Placeholder::Positional => Err(Error::interface(
                "positional placeholder %s used with named parameters"
            ))
        }),
        Params::Rows(_) => Err(Error::interface(
            "row parameters are only accepted by INSERT ... VALUES"
        ))
    }
}

/// Check if `query` is an `INSERT ... VALUES` statement whose rows are
/// sent through the native column path.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_driver::params::is_insert_query;
///
/// assert!(is_insert_query(r#"INSERT INTO "t"("a") VALUES"#));
/// assert!(!is_insert_query(r#"INSERT INTO "t"("a") VALUES (%s)"#));
/// assert!(!is_insert_query("SELECT 1"));
/// ```
#[must_use]
pub fn is_insert_query(query: &str) -> bool {
    let trimmed = query.trim();
    starts_with_keyword(trimmed, "INSERT") && ends_with_keyword(trimmed, "VALUES")
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
}

fn ends_with_keyword(text: &str, keyword: &str) -> bool {
    text.len() >= keyword.len()
        && text
            .get(text.len() - keyword.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(keyword))
}

/// Literal form of a parameter for log records, truncated.
#[must_use]
pub fn preview(value: &Value) -> String {
    const LIMIT: usize = 64;
    let literal = escape_value(value);
    match literal.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &literal[..cut]),
        None => literal
    }
}

enum Placeholder<'q> {
    Positional,
    Named(&'q str)
}

fn render<'q>(
    query: &'q str,
    mut bind: impl FnMut(Placeholder<'q>) -> Result<String>
) -> Result<String> {
    let mut out = String::with_capacity(query.len());
    let mut rest = query;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if let Some(after) = tail.strip_prefix('%') {
            out.push('%');
            rest = after;
        } else if let Some(after) = tail.strip_prefix('s') {
            out.push_str(&bind(Placeholder::Positional)?);
            rest = after;
        } else if let Some(named) = tail.strip_prefix('(') {
            let close = named
                .find(")s")
                .ok_or_else(|| Error::interface("unterminated %(name)s placeholder"))?;
            out.push_str(&bind(Placeholder::Named(&named[..close]))?);
            rest = &named[close + 2..];
        } else {
            return Err(Error::interface(format!(
                "unsupported format directive at byte {}",
                query.len() - rest.len() + pos
            )));
        }
    }
    out.push_str(rest);
    Ok(out)
}
