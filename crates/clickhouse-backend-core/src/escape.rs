// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Literal SQL rendering of values.
//!
//! Used for column defaults in DDL and for client-side parameter
//! substitution.
//!
//! | Value | Literal |
//! |-------|---------|
//! | `NULL` | `NULL` |
//! | text, UUID | `'...'` with `\` and `'` escaped |
//! | naive datetime | `toDateTime64('YYYY-MM-DD HH:MM:SS.ffffff', 6)` |
//! | aware datetime | `toDateTime64('...', 6, 'UTC')` after conversion to UTC |
//! | date | `toDate32('YYYY-MM-DD')` |
//! | IPv4 / IPv6 | `toIPv4('...')` / `toIPv6('...')` |
//! | array, tuple, map | `[...]`, `(...)`, `map(...)`; with a target type `<literal>::<type>` |
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_core::{Value, escape::{escape_typed, escape_value}};
//!
//! assert_eq!(escape_value(&Value::from("it's")), r"'it\'s'");
//! assert_eq!(escape_typed(&Value::from(vec![1_i32, 2]), "Array(Int32)"), "[1, 2]::Array(Int32)");
//! ```

use chrono::Utc;

use crate::Value;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Quote text as a single-quoted string literal.
#[must_use]
pub fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        push_escaped(&mut out, c);
    }
    out.push('\'');
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\'' => out.push_str("\\'"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\0' => out.push_str("\\0"),
        '\u{7}' => out.push_str("\\a"),
        '\u{8}' => out.push_str("\\b"),
        '\u{b}' => out.push_str("\\v"),
        '\u{c}' => out.push_str("\\f"),
        _ => out.push(c)
    }
}

fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('\'');
    for b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            0x20..=0x7e => out.push(char::from(*b)),
            _ => out.push_str(&format!("\\x{b:02x}"))
        }
    }
    out.push('\'');
    out
}

/// Render a value as a SQL literal.
#[must_use]
pub fn escape_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Bool(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::BigInt(v) => v.clone(),
        Value::Float(v) => escape_float(*v),
        Value::Decimal(v) => v.to_string(),
        Value::String(v) => quote_string(v),
        Value::Bytes(v) => quote_bytes(v),
        Value::Uuid(v) => quote_string(&v.to_string()),
        Value::Date(v) => format!("toDate32('{}')", v.format("%Y-%m-%d")),
        Value::DateTime(v) => format!("toDateTime64('{}', 6)", v.format(DATETIME_FORMAT)),
        Value::DateTimeTz(v) => format!(
            "toDateTime64('{}', 6, 'UTC')",
            v.with_timezone(&Utc).format(DATETIME_FORMAT)
        ),
        Value::Ipv4(v) => format!("toIPv4('{v}')"),
        Value::Ipv6(v) => format!("toIPv6('{v}')"),
        Value::Array(items) => format!("[{}]", join(items.iter())),
        Value::Tuple(items) => escape_tuple(items.iter()),
        Value::NamedTuple(items) => escape_tuple(items.iter().map(|(_, v)| v)),
        Value::Map(pairs) => {
            let parts: Vec<String> = pairs
                .iter()
                .flat_map(|(k, v)| [escape_value(k), escape_value(v)])
                .collect();
            format!("map({})", parts.join(", "))
        }
        Value::Json(v) => quote_string(&v.to_string())
    }
}

/// Render a value as a literal cast to `db_type` when it is a composite.
///
/// Scalars are rendered exactly as [`escape_value`] does.
#[must_use]
pub fn escape_typed(value: &Value, db_type: &str) -> String {
    let literal = escape_value(value);
    if value.is_composite() {
        format!("{literal}::{db_type}")
    } else {
        literal
    }
}

fn escape_float(v: f64) -> String {
    if v.is_nan() {
        "nan".into()
    } else if v.is_infinite() {
        if v.is_sign_positive() {
            "inf".into()
        } else {
            "-inf".into()
        }
    } else {
        format!("{v:?}")
    }
}

fn escape_tuple<'a>(items: impl ExactSizeIterator<Item = &'a Value>) -> String {
    if items.len() == 1 {
        format!("tuple({})", join(items))
    } else {
        format!("({})", join(items))
    }
}

fn join<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items.map(escape_value).collect::<Vec<_>>().join(", ")
}

/// Escape `\`, `%` and `_` so text matches literally inside `LIKE`.
#[must_use]
pub fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Wrap a SQL expression so its value matches literally inside `LIKE`.
///
/// The percent signs are doubled because the result is part of a statement
/// that goes through parameter substitution.
#[must_use]
pub fn pattern_escape(expr: &str) -> String {
    format!(r"replaceRegexpAll({expr}, '\\\\|%%|_', '\\\\\\0')")
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use test_case::test_case;
    use uuid::Uuid;

    use super::*;

    #[test_case(Value::Null => "NULL")]
    #[test_case(Value::Bool(true) => "true")]
    #[test_case(Value::Int(-5) => "-5")]
    #[test_case(Value::Float(1.5) => "1.5")]
    #[test_case(Value::Float(f64::NAN) => "nan")]
    #[test_case(Value::Float(f64::NEG_INFINITY) => "-inf")]
    #[test_case(Value::from("a'b\\c") => r"'a\'b\\c'")]
    #[test_case(Value::from("line\nbreak") => r"'line\nbreak'")]
    #[test_case(Value::Bytes(vec![0, b'a', 0xff]) => r"'\x00a\xff'")]
    #[test_case(Value::Ipv4(Ipv4Addr::new(10, 0, 0, 1)) => "toIPv4('10.0.0.1')")]
    #[test_case(Value::Ipv6(Ipv6Addr::LOCALHOST) => "toIPv6('::1')")]
    #[test_case(Value::Uuid(Uuid::nil()) => "'00000000-0000-0000-0000-000000000000'")]
    #[test_case(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()) => "toDate32('2024-02-29')")]
    fn scalars(value: Value) -> String {
        escape_value(&value)
    }

    #[test]
    fn naive_datetime_has_no_timezone() {
        let dt = NaiveDateTime::parse_from_str("2024-01-02 03:04:05.1234567", "%Y-%m-%d %H:%M:%S%.f")
            .unwrap();
        assert_eq!(
            escape_value(&Value::DateTime(dt)),
            "toDateTime64('2024-01-02 03:04:05.123456', 6)"
        );
    }

    #[test]
    fn aware_datetime_is_converted_to_utc() {
        let dt = DateTime::parse_from_rfc3339("2024-01-02T03:04:05+02:00").unwrap();
        assert_eq!(
            escape_value(&Value::DateTimeTz(dt)),
            "toDateTime64('2024-01-02 01:04:05.000000', 6, 'UTC')"
        );
    }

    #[test]
    fn composites() {
        let tuple = Value::Tuple(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(escape_value(&tuple), "(1, 'a')");
        assert_eq!(escape_value(&Value::Tuple(vec![Value::Int(1)])), "tuple(1)");

        let map: Value = [("k", 1_i32)].into_iter().collect();
        assert_eq!(escape_typed(&map, "Map(String, Int32)"), "map('k', 1)::Map(String, Int32)");

        let nested = Value::Array(vec![Value::from(vec![1_i32]), Value::Array(vec![])]);
        assert_eq!(escape_typed(&nested, "Array(Array(Int32))"), "[[1], []]::Array(Array(Int32))");
        assert_eq!(escape_typed(&Value::Int(1), "Int32"), "1");
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like(r"50%_a\b"), r"50\%\_a\\b");
        assert_eq!(
            pattern_escape("\"t\".\"name\""),
            r#"replaceRegexpAll("t"."name", '\\\\|%%|_', '\\\\\\0')"#
        );
    }
}
