// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Transforms and lookups on compiled columns.
//!
//! # Transforms
//!
//! | Kind | Segment | SQL |
//! |------|---------|-----|
//! | `Array` | `i` | `x[i+1]` |
//! | `Array` | `i_j` | `arraySlice(x, i+1, j-i+1)` |
//! | `Array`, `Map` | `len` | `length(x)` |
//! | `Map` | `keys`, `values` | `mapKeys(x)`, `mapValues(x)` |
//! | `Map` | any other key | `x[key]` |
//! | `Tuple` | `i`, `name` | `tupleElement(x, i+1)`, `tupleElement(x, 'name')` |
//! | dates | `year` ... `second` | see [`date_extract_sql`](crate::ops::date_extract_sql) |
//! | dates | `date` | `toDate(x)` |
//!
//! # Lookups
//!
//! | Kind | Lookup | SQL |
//! |------|--------|-----|
//! | `Array` | `contains`, `contained_by`, `overlap`, `any` | `hasAll(x, y)`, `hasAll(y, x)`, `hasAny(x, y)`, `has(x, y)` |
//! | `Map` | `has_key`, `has_keys`, `has_any_keys` | `mapContains`, `hasAll(mapKeys(x), y)`, `hasAny(mapKeys(x), y)` |
//! | `Tuple` | `exact` | `x = y`, `0` for a different arity |
//! | any | text lookups | `LIKE`, `ILIKE`, `match` |
//! | any | `exact`, `gt`, `gte`, `lt`, `lte`, `in`, `range`, `isnull` | comparisons |

use clickhouse_backend_core::{
    Error, Result, Value,
    escape::{escape_like, pattern_escape, quote_string},
    types::{Field, FieldKind, IntWidth}
};

use crate::{
    expr::Fragment,
    ops::{TEXT_LOOKUPS, apply_template, date_extract_sql, lookup_cast, operator, pattern_op}
};

/// Lookup names recognized as the last path segment.
pub const LOOKUPS: &[&str] = &[
    "exact",
    "iexact",
    "contains",
    "icontains",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "regex",
    "iregex",
    "gt",
    "gte",
    "lt",
    "lte",
    "in",
    "range",
    "isnull",
    "contained_by",
    "overlap",
    "any",
    "has_key",
    "has_keys",
    "has_any_keys"
];

const DATE_PARTS: &[&str] = &[
    "year",
    "iso_year",
    "quarter",
    "month",
    "week",
    "day",
    "week_day",
    "iso_week_day",
    "hour",
    "minute",
    "second"
];

/// Compiled column with the field describing its values.
///
/// `field` is `None` for expressions of unknown type; only generic lookups
/// apply to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column SQL.
    pub sql:   Fragment,
    /// Value descriptor.
    pub field: Option<Field>
}

impl Column {
    /// Column with a known field.
    #[must_use]
    pub const fn new(sql: Fragment, field: Option<Field>) -> Self {
        Self { sql, field }
    }
}

/// Right-hand side of a lookup, after compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Host value, prepared by the field.
    Value(Value),
    /// Compiled expression.
    Sql(Fragment),
    /// Compiled subquery.
    Query(Fragment)
}

/// Split the segments after the field into transforms and a lookup.
///
/// The last segment is the lookup when it is a known lookup name; `exact`
/// is implied otherwise.
#[must_use]
pub fn split_lookup<'a>(segments: &'a [&'a str]) -> (&'a [&'a str], &'a str) {
    match segments.split_last() {
        Some((last, rest)) if LOOKUPS.contains(last) => (rest, last),
        _ => (segments, "exact")
    }
}

fn output(kind: FieldKind) -> Field {
    Field::of(kind)
}

fn index(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn escaped_type(field: &Field) -> String {
    field.db_type().replace('%', "%%")
}

/// Apply one transform segment.
///
/// # Errors
///
/// Returns [`Error::Field`] when the segment is not a transform of the
/// column kind.
pub fn transform(column: Column, segment: &str) -> Result<Column> {
    let Some(field) = column.field else {
        return Err(Error::field(format!(
            "cannot apply {segment} to an expression of unknown type"
        )));
    };
    let sql = column.sql;
    match &field.kind {
        FieldKind::Array(inner) => {
            if segment == "len" {
                return Ok(Column::new(
                    sql.map(|s| format!("length({s})")),
                    Some(output(FieldKind::UInt(IntWidth::W64)))
                ));
            }
            if let Some(i) = index(segment) {
                return Ok(Column::new(
                    sql.map(|s| format!("{s}[{}]", i + 1)),
                    Some(inner.as_ref().clone())
                ));
            }
            if let Some((start, end)) = segment.split_once('_')
                && let (Some(start), Some(end)) = (index(start), index(end))
                && end >= start
            {
                return Ok(Column::new(
                    sql.map(|s| format!("arraySlice({s}, {}, {})", start + 1, end - start + 1)),
                    Some(field.clone())
                ));
            }
            Err(unsupported_transform(&field, segment))
        }
        FieldKind::Map { key, value } => match segment {
            "len" => Ok(Column::new(
                sql.map(|s| format!("length({s})")),
                Some(output(FieldKind::UInt(IntWidth::W64)))
            )),
            "keys" => Ok(Column::new(
                sql.map(|s| format!("mapKeys({s})")),
                Some(output(FieldKind::Array(key.clone())))
            )),
            "values" => Ok(Column::new(
                sql.map(|s| format!("mapValues({s})")),
                Some(output(FieldKind::Array(value.clone())))
            )),
            other => {
                let prepared = key.prep_value(&Value::String(other.to_owned()))?;
                let mut params = sql.params;
                params.push(prepared);
                Ok(Column::new(
                    Fragment::with_params(format!("{}[%s]", sql.sql), params),
                    Some(value.as_ref().clone())
                ))
            }
        },
        FieldKind::Tuple(elements) => {
            if let Some(i) = index(segment) {
                let element = elements
                    .get(usize::try_from(i).unwrap_or(usize::MAX))
                    .ok_or_else(|| {
                        Error::field(format!(
                            "{}: tuple has {} elements, got index {i}",
                            field.name,
                            elements.len()
                        ))
                    })?;
                return Ok(Column::new(
                    sql.map(|s| format!("tupleElement({s}, {})", i + 1)),
                    Some(element.field.clone())
                ));
            }
            match elements
                .iter()
                .find(|e| e.name.as_deref() == Some(segment))
            {
                Some(element) => Ok(Column::new(
                    sql.map(|s| format!("tupleElement({s}, {})", quote_string(segment))),
                    Some(element.field.clone())
                )),
                None => Err(unsupported_transform(&field, segment))
            }
        }
        kind if kind.is_temporal() => {
            if segment == "date" {
                return Ok(Column::new(
                    sql.map(|s| format!("toDate({s})")),
                    Some(output(FieldKind::Date))
                ));
            }
            if DATE_PARTS.contains(&segment) {
                let Fragment { sql, params } = sql;
                let extracted = date_extract_sql(segment, &sql)
                    .ok_or_else(|| unsupported_transform(&field, segment))?;
                return Ok(Column::new(
                    Fragment::with_params(extracted, params),
                    Some(output(FieldKind::Int(IntWidth::W32)))
                ));
            }
            Err(unsupported_transform(&field, segment))
        }
        _ => Err(unsupported_transform(&field, segment))
    }
}

fn unsupported_transform(field: &Field, segment: &str) -> Error {
    Error::field(format!(
        "unsupported lookup or transform {segment} on {} {}",
        field.kind.class_name(),
        field.name
    ))
}

fn prep(field: Option<&Field>, value: &Value) -> Result<Value> {
    match field {
        Some(field) => field.prep_value(value),
        None => Ok(value.clone())
    }
}

/// `%s`, cast to the column type when the value is a composite.
fn placeholder(field: Option<&Field>, value: Value) -> Fragment {
    match field {
        Some(field) if value.is_composite() => Fragment::with_params(
            format!("%s::{}", escaped_type(field)),
            vec![value]
        ),
        _ => Fragment::param(value)
    }
}

fn combine(lhs: Fragment, rhs: Fragment, f: impl FnOnce(&str, &str) -> String) -> Fragment {
    let sql = f(&lhs.sql, &rhs.sql);
    let mut params = lhs.params;
    params.extend(rhs.params);
    Fragment::with_params(sql, params)
}

/// Compile `lhs <lookup> rhs`.
///
/// # Errors
///
/// Returns [`Error::Field`] for unknown lookups and right-hand sides of the
/// wrong shape, and validation errors from preparing values.
pub fn compile(lhs: Column, lookup: &str, rhs: Operand) -> Result<Fragment> {
    let kind = lhs.field.as_ref().map(|f| f.kind.clone());
    match kind {
        Some(FieldKind::Array(inner)) => {
            if let Some(fragment) = array_lookup(&lhs, &inner, lookup, &rhs)? {
                return Ok(fragment);
            }
        }
        Some(FieldKind::Map { key, .. }) => {
            if let Some(fragment) = map_lookup(&lhs, &key, lookup, &rhs)? {
                return Ok(fragment);
            }
        }
        Some(FieldKind::Tuple(elements)) if lookup == "exact" => {
            if let Operand::Value(value) = &rhs
                && let Some(items) = value.elements()
                && items.len() != elements.len()
            {
                return Ok(Fragment::new("0"));
            }
        }
        _ => {}
    }
    if TEXT_LOOKUPS.contains(&lookup) {
        return text_lookup(lhs, lookup, rhs);
    }
    generic_lookup(lhs, lookup, rhs)
}

fn array_lookup(lhs: &Column, inner: &Field, lookup: &str, rhs: &Operand) -> Result<Option<Fragment>> {
    if !matches!(lookup, "contains" | "contained_by" | "overlap" | "any") {
        return Ok(None);
    }
    let field = lhs.field.as_ref();
    let rhs = match rhs {
        Operand::Value(value) if lookup == "any" => Fragment::param(inner.prep_value(value)?),
        Operand::Value(value) => placeholder(field, prep(field, value)?),
        Operand::Sql(fragment) | Operand::Query(fragment) => fragment.clone()
    };
    if lookup == "contained_by" {
        return Ok(Some(combine(rhs, lhs.sql.clone(), |r, l| format!("hasAll({r}, {l})"))));
    }
    Ok(Some(combine(lhs.sql.clone(), rhs, |l, r| match lookup {
        "contains" => format!("hasAll({l}, {r})"),
        "overlap" => format!("hasAny({l}, {r})"),
        _ => format!("has({l}, {r})")
    })))
}

fn map_lookup(lhs: &Column, key: &Field, lookup: &str, rhs: &Operand) -> Result<Option<Fragment>> {
    let rhs = match (lookup, rhs) {
        ("has_key", Operand::Value(value)) => Fragment::param(key.prep_value(value)?),
        ("has_keys" | "has_any_keys", Operand::Value(value)) => {
            let keys = output(FieldKind::Array(Box::new(key.clone())));
            let prepared = keys.prep_value(value)?;
            placeholder(Some(&keys), prepared)
        }
        ("has_key" | "has_keys" | "has_any_keys", Operand::Sql(fragment) | Operand::Query(fragment)) => {
            fragment.clone()
        }
        _ => return Ok(None)
    };
    Ok(Some(combine(lhs.sql.clone(), rhs, |l, r| match lookup {
        "has_key" => format!("mapContains({l}, {r})"),
        "has_keys" => format!("hasAll(mapKeys({l}), {r})"),
        _ => format!("hasAny(mapKeys({l}), {r})")
    })))
}

fn text_lookup(lhs: Column, lookup: &str, rhs: Operand) -> Result<Fragment> {
    let lhs_sql = match &lhs.field {
        Some(field) => lhs
            .sql
            .map(|s| apply_template(lookup_cast(lookup, &field.kind), &s)),
        None => lhs.sql
    };
    match rhs {
        Operand::Value(value) => {
            let text = value
                .to_text()
                .ok_or_else(|| Error::field(format!("{lookup} needs a text value, got {}", value.type_name())))?;
            let (template, param) = match lookup {
                "iexact" => ("{} ILIKE %s", escape_like(&text)),
                "contains" => ("{} LIKE %s", format!("%{}%", escape_like(&text))),
                "icontains" => ("{} ILIKE %s", format!("%{}%", escape_like(&text))),
                "startswith" => ("{} LIKE %s", format!("{}%", escape_like(&text))),
                "istartswith" => ("{} ILIKE %s", format!("{}%", escape_like(&text))),
                "endswith" => ("{} LIKE %s", format!("%{}", escape_like(&text))),
                "iendswith" => ("{} ILIKE %s", format!("%{}", escape_like(&text))),
                "regex" => ("match({}, %s)", text),
                _ => ("match({}, %s)", format!("(?i){text}"))
            };
            Ok(combine(lhs_sql, Fragment::param(Value::String(param)), |l, r| {
                apply_template(&template.replacen("%s", r, 1), l)
            }))
        }
        Operand::Sql(rhs) | Operand::Query(rhs) => {
            let rhs = match lookup {
                "iexact" => rhs.map(|r| format!("ILIKE {}", pattern_escape(&r))),
                "regex" => rhs,
                "iregex" => rhs.map(|r| format!("concat('(?i)', {r})")),
                other => {
                    let template = pattern_op(other)
                        .ok_or_else(|| Error::field(format!("unsupported lookup {other}")))?;
                    rhs.map(|r| apply_template(template, &pattern_escape(&r)))
                }
            };
            if lookup == "regex" || lookup == "iregex" {
                Ok(combine(lhs_sql, rhs, |l, r| format!("match({l}, {r})")))
            } else {
                Ok(combine(lhs_sql, rhs, |l, r| format!("{l} {r}")))
            }
        }
    }
}

fn generic_lookup(lhs: Column, lookup: &str, rhs: Operand) -> Result<Fragment> {
    let field = lhs.field.as_ref();
    match (lookup, rhs) {
        ("isnull", Operand::Value(Value::Bool(is_null))) => Ok(lhs.sql.map(|s| {
            if is_null {
                format!("{s} IS NULL")
            } else {
                format!("{s} IS NOT NULL")
            }
        })),
        ("isnull", _) => Err(Error::field("isnull needs a boolean")),
        ("exact", Operand::Value(Value::Null)) => Ok(lhs.sql.map(|s| format!("{s} IS NULL"))),
        ("in", Operand::Value(value)) => {
            let items = value
                .elements()
                .ok_or_else(|| Error::field(format!("in needs a list, got {}", value.type_name())))?;
            if items.is_empty() {
                return Ok(Fragment::new("0"));
            }
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(placeholder(field, prep(field, item)?));
            }
            let list = Fragment::join(parts, ", ");
            Ok(combine(lhs.sql, list, |l, r| format!("{l} IN ({r})")))
        }
        ("in", Operand::Sql(rhs) | Operand::Query(rhs)) => {
            Ok(combine(lhs.sql, rhs, |l, r| format!("{l} IN ({r})")))
        }
        ("range", Operand::Value(value)) => match value.elements().as_deref() {
            Some([low, high]) => {
                let bounds = Fragment::join(
                    [
                        placeholder(field, prep(field, low)?),
                        placeholder(field, prep(field, high)?)
                    ],
                    " AND "
                );
                Ok(combine(lhs.sql, bounds, |l, r| format!("{l} BETWEEN {r}")))
            }
            _ => Err(Error::field("range needs exactly two bounds"))
        },
        ("range", _) => Err(Error::field("range needs a pair of values")),
        (lookup, rhs) => {
            let template = match lookup {
                "exact" | "gt" | "gte" | "lt" | "lte" => operator(lookup).unwrap_or("= %s"),
                other => return Err(Error::field(format!("unsupported lookup {other}")))
            };
            let rhs = match rhs {
                Operand::Value(value) => placeholder(field, prep(field, &value)?),
                Operand::Sql(fragment) => fragment,
                Operand::Query(fragment) => fragment.map(|s| format!("({s})"))
            };
            Ok(combine(lhs.sql, rhs, |l, r| {
                format!("{l} {}", template.replacen("%s", r, 1))
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn col(name: &str, field: Field) -> Column {
        Column::new(Fragment::new(format!("\"{name}\"")), Some(field))
    }

    fn ip() -> Column {
        col("ip", Field::generic_ip("ip"))
    }

    #[test_case(&["year"] => (0, "exact") ; "transform only")]
    #[test_case(&["gt"] => (0, "gt") ; "lookup only")]
    #[test_case(&["0", "contains"] => (1, "contains") ; "transform then lookup")]
    fn split(segments: &[&str]) -> (usize, &'static str) {
        let (transforms, lookup) = split_lookup(segments);
        let lookup = LOOKUPS.iter().find(|l| **l == lookup).copied().unwrap_or("exact");
        (transforms.len(), lookup)
    }

    #[test]
    fn ip_contains_casts_lhs() {
        let f = compile(ip(), "contains", Operand::Value("1.2".into())).unwrap();
        assert_eq!(
            f.sql,
            "replaceRegexpOne(IPv6NumToString(\"ip\"),'^::ffff:','') LIKE %s"
        );
        assert_eq!(f.params, vec![Value::from("%1.2%")]);

        let f = compile(ip(), "icontains", Operand::Value("1.2".into())).unwrap();
        assert!(f.sql.ends_with("ILIKE %s"));
    }

    #[test]
    fn text_lookup_escapes_pattern() {
        let f = compile(col("s", Field::string("s")), "startswith", Operand::Value("50%_".into()))
            .unwrap();
        assert_eq!(f.sql, "\"s\" LIKE %s");
        assert_eq!(f.params, vec![Value::from("50\\%\\_%")]);

        let f = compile(col("n", Field::int32("n")), "contains", Operand::Sql(Fragment::new("\"s\"")))
            .unwrap();
        assert_eq!(
            f.sql,
            r"CAST(`n`, 'Nullable(String)') LIKE concat('%%', replaceRegexpAll(`s`, '\\\\|%%|_', '\\\\\\0'), '%%')"
                .replace('`', "\"")
        );
    }

    #[test]
    fn regex_lookups() {
        let f = compile(col("s", Field::string("s")), "iregex", Operand::Value("^a".into())).unwrap();
        assert_eq!(f.sql, "match(\"s\", %s)");
        assert_eq!(f.params, vec![Value::from("(?i)^a")]);
    }

    #[test]
    fn array_lookups() {
        let tags = || col("tags", Field::array("tags", Field::string("")));
        let value = Value::from(vec!["a", "b"]);

        let f = compile(tags(), "contains", Operand::Value(value.clone())).unwrap();
        assert_eq!(f.sql, "hasAll(\"tags\", %s::Array(String))");
        let f = compile(tags(), "contained_by", Operand::Value(value.clone())).unwrap();
        assert_eq!(f.sql, "hasAll(%s::Array(String), \"tags\")");
        let f = compile(tags(), "overlap", Operand::Value(value)).unwrap();
        assert_eq!(f.sql, "hasAny(\"tags\", %s::Array(String))");
        let f = compile(tags(), "any", Operand::Value("a".into())).unwrap();
        assert_eq!(f.sql, "has(\"tags\", %s)");
    }

    #[test]
    fn array_transforms() {
        let tags = col("tags", Field::array("tags", Field::int32("")));
        let first = transform(tags.clone(), "0").unwrap();
        assert_eq!(first.sql.sql, "\"tags\"[1]");
        assert_eq!(first.field.map(|f| f.db_type()), Some("Int32".into()));

        let slice = transform(tags.clone(), "1_3").unwrap();
        assert_eq!(slice.sql.sql, "arraySlice(\"tags\", 2, 3)");

        let len = transform(tags, "len").unwrap();
        let f = compile(len, "gt", Operand::Value(Value::Int(2))).unwrap();
        assert_eq!(f.sql, "length(\"tags\") > %s");
    }

    #[test]
    fn map_lookups_and_transforms() {
        let attrs = || col("attrs", Field::map("attrs", Field::string(""), Field::int32("")));
        let f = compile(attrs(), "has_key", Operand::Value("k".into())).unwrap();
        assert_eq!(f.sql, "mapContains(\"attrs\", %s)");
        let f = compile(attrs(), "has_keys", Operand::Value(Value::from(vec!["a"]))).unwrap();
        assert_eq!(f.sql, "hasAll(mapKeys(\"attrs\"), %s::Array(String))");

        let value = transform(attrs(), "color").unwrap();
        assert_eq!(value.sql.sql, "\"attrs\"[%s]");
        assert_eq!(value.sql.params, vec![Value::from("color")]);
        let f = compile(value, "exact", Operand::Value(Value::Int(1))).unwrap();
        assert_eq!(f.sql, "\"attrs\"[%s] = %s");
        assert_eq!(f.params.len(), 2);

        assert_eq!(transform(attrs(), "keys").unwrap().sql.sql, "mapKeys(\"attrs\")");
    }

    #[test]
    fn tuple_exact_and_elements() {
        let point = || {
            col(
                "p",
                Field::named_tuple("p", [("x", Field::int32("")), ("y", Field::int32(""))])
            )
        };
        let short = Value::Tuple(vec![Value::Int(1)]);
        assert_eq!(compile(point(), "exact", Operand::Value(short)).unwrap().sql, "0");

        let pair = Value::Tuple(vec![Value::Int(1), Value::Int(2)]);
        let f = compile(point(), "exact", Operand::Value(pair)).unwrap();
        assert_eq!(f.sql, "\"p\" = %s::Tuple(x Int32, y Int32)");

        assert_eq!(transform(point(), "y").unwrap().sql.sql, "tupleElement(\"p\", 'y')");
        assert_eq!(transform(point(), "0").unwrap().sql.sql, "tupleElement(\"p\", 1)");
        assert!(transform(point(), "z").unwrap_err().to_string().contains("z"));
    }

    #[test]
    fn date_transforms() {
        let ts = || col("ts", Field::datetime("ts", None));
        assert_eq!(transform(ts(), "week_day").unwrap().sql.sql, "toDayOfWeek(\"ts\", 3)");
        assert_eq!(transform(ts(), "date").unwrap().sql.sql, "toDate(\"ts\")");
        assert!(transform(ts(), "fortnight").is_err());
    }

    #[test]
    fn generic_lookups() {
        let n = || col("n", Field::int32("n"));
        assert_eq!(compile(n(), "exact", Operand::Value(Value::Null)).unwrap().sql, "\"n\" IS NULL");
        assert_eq!(
            compile(n(), "isnull", Operand::Value(Value::Bool(false))).unwrap().sql,
            "\"n\" IS NOT NULL"
        );
        assert_eq!(compile(n(), "in", Operand::Value(Value::Array(vec![]))).unwrap().sql, "0");
        let f = compile(n(), "in", Operand::Value(Value::from(vec![1_i32, 2]))).unwrap();
        assert_eq!(f.sql, "\"n\" IN (%s, %s)");
        let f = compile(n(), "range", Operand::Value(Value::from(vec![1_i32, 9]))).unwrap();
        assert_eq!(f.sql, "\"n\" BETWEEN %s AND %s");
        let f = compile(n(), "in", Operand::Query(Fragment::new("SELECT 1"))).unwrap();
        assert_eq!(f.sql, "\"n\" IN (SELECT 1)");
    }

    #[test]
    fn unknown_lookup_is_field_error() {
        let err = compile(col("n", Field::int32("n")), "has_key", Operand::Value(Value::Int(1)))
            .unwrap_err();
        assert!(err.is_dialect());
        assert!(transform(col("n", Field::int32("n")), "len").is_err());
    }

    #[test]
    fn values_are_prepared_by_the_field() {
        let f = compile(ip(), "exact", Operand::Value("::ffff:1.2.3.4".into())).unwrap();
        assert_eq!(f.params, vec![Value::from("::ffff:1.2.3.4")]);
        let err = compile(col("n", Field::int32("n")), "gt", Operand::Value("x".into()));
        assert!(err.is_err());
    }
}
