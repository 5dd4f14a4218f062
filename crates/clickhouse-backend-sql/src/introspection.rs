// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Decoding of server metadata back into field descriptors.
//!
//! # Overview
//!
//! - [`parse_type`]: `system.columns.type` into a [`TypeDescriptor`]
//! - [`ColumnInfo`]: One `system.columns` row
//! - [`TableInfo`]: One `system.tables` row
//! - [`CreateTable`]: Columns, skip-indexes, check constraints and engine
//!   clauses of a `SHOW CREATE TABLE` statement
//!
//! Wrappers are peeled outside-in: `LowCardinality(Nullable(String))` is a
//! low-cardinality, nullable `String`. Types the crate does not model keep
//! their name as a `<Name>Field` class and have no [`FieldKind`].
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_sql::introspection::parse_type;
//!
//! let ty = parse_type("LowCardinality(Nullable(String))").unwrap();
//! assert_eq!(ty.class_name, "StringField");
//! assert!(ty.nullable && ty.low_cardinality);
//!
//! let ty = parse_type("AggregateFunction(uniq, UInt64)").unwrap();
//! assert_eq!(ty.class_name, "AggregateFunctionField");
//! assert!(ty.kind.is_none());
//! ```

use clickhouse_backend_core::{
    Error, Result,
    ident::is_identifier,
    types::{EnumChoice, EnumWidth, Field, FieldKind, IntWidth, TupleElement}
};
use convert_case::{Case, Casing};

use crate::schema::{Constraint, Index, IndexType};

/// Decoded column type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type string as reported by the server.
    pub raw:             String,
    /// Field class, `<Name>Field` for types without a kind.
    pub class_name:      String,
    /// Logical kind, `None` for types the crate does not model.
    pub kind:            Option<FieldKind>,
    /// Wrapped in `Nullable`.
    pub nullable:        bool,
    /// Wrapped in `LowCardinality`.
    pub low_cardinality: bool,
    /// Top-level arguments of the innermost type.
    pub params:          Vec<String>
}

impl TypeDescriptor {
    /// Field named `name` with this type, when the kind is known.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Field> {
        let mut field = Field::new(name, self.kind.clone()?);
        if self.nullable {
            field = field.nullable();
        }
        if self.low_cardinality {
            field = field.low_cardinality();
        }
        Some(field)
    }
}

/// Parse a ClickHouse type string.
///
/// # Errors
///
/// Returns [`Error::Config`] for unbalanced parentheses and malformed
/// arguments of known types.
pub fn parse_type(text: &str) -> Result<TypeDescriptor> {
    let raw = text.trim();
    let (name, params) = split_call(raw)?;
    match name {
        "LowCardinality" | "Nullable" => {
            let [inner] = params.as_slice() else {
                return Err(Error::config(format!("{name} takes one type, got {raw}")));
            };
            let mut descriptor = parse_type(inner)?;
            if name == "Nullable" {
                descriptor.nullable = true;
            } else {
                descriptor.low_cardinality = true;
            }
            descriptor.raw = raw.to_owned();
            return Ok(descriptor);
        }
        _ => {}
    }
    let kind = kind_of(name, &params, raw)?;
    let class_name = kind
        .as_ref()
        .map_or_else(|| format!("{name}Field"), FieldKind::class_name);
    Ok(TypeDescriptor {
        raw: raw.to_owned(),
        class_name,
        kind,
        nullable: false,
        low_cardinality: false,
        params: params.into_iter().map(str::to_owned).collect()
    })
}

fn kind_of(name: &str, params: &[&str], raw: &str) -> Result<Option<FieldKind>> {
    let bad = || Error::config(format!("invalid type arguments in {raw}"));
    let number = |s: &str| s.trim().parse::<u32>().map_err(|_| bad());
    let width = |digits: &str| {
        digits
            .parse::<u32>()
            .ok()
            .and_then(IntWidth::from_bits)
    };
    let kind = match (name, params) {
        ("Float32", []) => FieldKind::Float32,
        ("Float64", []) => FieldKind::Float64,
        ("Bool", []) => FieldKind::Bool,
        ("String", []) => FieldKind::String,
        ("UUID", []) => FieldKind::Uuid,
        ("Date", []) => FieldKind::Date,
        ("Date32", []) => FieldKind::Date32,
        ("IPv4", []) => FieldKind::Ipv4,
        ("IPv6", []) => FieldKind::Ipv6,
        ("JSON", _) => FieldKind::Json,
        ("Object", [arg]) if unquote(arg).is_ok_and(|s| s.eq_ignore_ascii_case("json")) => {
            FieldKind::Json
        }
        ("FixedString", [n]) => FieldKind::FixedString {
            max_bytes: number(n)? as usize
        },
        ("DateTime", []) => FieldKind::DateTime { timezone: None },
        ("DateTime", [tz]) => FieldKind::DateTime {
            timezone: Some(unquote(tz)?)
        },
        ("DateTime64", [p, rest @ ..]) if rest.len() <= 1 => FieldKind::DateTime64 {
            precision: u8::try_from(number(p)?).map_err(|_| bad())?,
            timezone:  rest.first().map(|tz| unquote(tz)).transpose()?
        },
        ("Decimal", [p, s]) => FieldKind::Decimal {
            max_digits:     u8::try_from(number(p)?).map_err(|_| bad())?,
            decimal_places: u8::try_from(number(s)?).map_err(|_| bad())?
        },
        ("Decimal32" | "Decimal64" | "Decimal128" | "Decimal256", [s]) => {
            let max_digits = match name {
                "Decimal32" => 9,
                "Decimal64" => 18,
                "Decimal128" => 38,
                _ => 76
            };
            FieldKind::Decimal {
                max_digits,
                decimal_places: u8::try_from(number(s)?).map_err(|_| bad())?
            }
        }
        ("Enum8" | "Enum16", choices) => {
            let width = if name == "Enum8" {
                EnumWidth::Enum8
            } else {
                EnumWidth::Enum16
            };
            let mut parsed = Vec::with_capacity(choices.len());
            for choice in choices {
                let (label, value) = choice.rsplit_once('=').ok_or_else(bad)?;
                let value = value.trim().parse::<i32>().map_err(|_| bad())?;
                parsed.push(EnumChoice::new(unquote(label)?, value));
            }
            FieldKind::Enum {
                width,
                choices: parsed,
                return_int: true
            }
        }
        ("Array", [inner]) => match parse_type(inner)?.field("") {
            Some(field) => FieldKind::Array(Box::new(field)),
            None => return Ok(None)
        },
        ("Tuple", elements) if !elements.is_empty() => {
            let mut parsed = Vec::with_capacity(elements.len());
            for element in elements {
                let (label, ty) = match top_level_space(element) {
                    Some(at) if is_identifier(&element[..at]) => {
                        (Some(&element[..at]), element[at..].trim())
                    }
                    _ => (None, *element)
                };
                let Some(field) = parse_type(ty)?.field("") else {
                    return Ok(None);
                };
                parsed.push(match label {
                    Some(label) => TupleElement::named(label, field),
                    None => TupleElement::positional(field)
                });
            }
            FieldKind::Tuple(parsed)
        }
        ("Map", [key, value]) => {
            match (parse_type(key)?.field(""), parse_type(value)?.field("")) {
                (Some(key), Some(value)) => FieldKind::Map {
                    key:   Box::new(key),
                    value: Box::new(value)
                },
                _ => return Ok(None)
            }
        }
        (other, []) if other.starts_with("UInt") => match width(&other[4..]) {
            Some(w) => FieldKind::UInt(w),
            None => return Ok(None)
        },
        (other, []) if other.starts_with("Int") => match width(&other[3..]) {
            Some(w) => FieldKind::Int(w),
            None => return Ok(None)
        },
        _ => return Ok(None)
    };
    Ok(Some(kind))
}

/// Split `Name(a, b)` into the name and its top-level arguments.
fn split_call(text: &str) -> Result<(&str, Vec<&str>)> {
    let Some(open) = text.find('(') else {
        return Ok((text, Vec::new()));
    };
    let inner = text[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| Error::config(format!("unbalanced type {text}")))?;
    let args = split_top_level(inner, ',')?;
    Ok((text[..open].trim(), args))
}

/// Split on `sep` outside parentheses and quotes, trimming each part.
fn split_top_level(text: &str, sep: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '`' | '"' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::config(format!("unbalanced parentheses in {text}")));
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return Err(Error::config(format!("unbalanced parentheses in {text}")));
    }
    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    Ok(parts)
}

fn top_level_space(text: &str) -> Option<usize> {
    let open = text.find('(').unwrap_or(text.len());
    text[..open].find(char::is_whitespace)
}

/// Decode a single-quoted literal.
fn unquote(text: &str) -> Result<String> {
    let text = text.trim();
    let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(|| Error::config(format!("expected a quoted string, got {text}")))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\')
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn unquote_name(text: &str) -> String {
    let text = text.trim();
    for q in ['`', '"'] {
        if let Some(inner) = text.strip_prefix(q).and_then(|t| t.strip_suffix(q)) {
            return inner.replace(&format!("\\{q}"), &q.to_string());
        }
    }
    text.to_owned()
}

/// Model name for a table name.
///
/// ```rust
/// use clickhouse_backend_sql::introspection::model_name;
///
/// assert_eq!(model_name("page_view_log"), "PageViewLog");
/// ```
#[must_use]
pub fn model_name(table: &str) -> String {
    table.to_case(Case::Pascal)
}

/// Row of `system.tables`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name.
    pub name:    String,
    /// Engine name.
    pub engine:  String,
    /// Views and materialized views.
    pub is_view: bool
}

impl TableInfo {
    /// Create from a table name and its engine name.
    pub fn new(name: impl Into<String>, engine: impl Into<String>) -> Self {
        let engine = engine.into();
        let is_view = engine.ends_with("View");
        Self {
            name: name.into(),
            engine,
            is_view
        }
    }

    /// Model name for this table.
    #[must_use]
    pub fn model_name(&self) -> String {
        model_name(&self.name)
    }
}

/// Row of `system.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnInfo {
    /// Column name.
    pub name:               String,
    /// Type string.
    pub db_type:            String,
    /// `DEFAULT`, `MATERIALIZED`, `ALIAS` or empty.
    pub default_kind:       String,
    /// Default expression.
    pub default_expression: String,
    /// Part of the primary key.
    pub is_in_primary_key:  bool
}

impl ColumnInfo {
    /// Decoded type.
    ///
    /// # Errors
    ///
    /// See [`parse_type`].
    pub fn descriptor(&self) -> Result<TypeDescriptor> {
        parse_type(&self.db_type)
    }

    /// Field equivalent to this column, `None` when the type has no kind.
    ///
    /// # Errors
    ///
    /// See [`parse_type`].
    pub fn field(&self) -> Result<Option<Field>> {
        let Some(mut field) = self.descriptor()?.field(&self.name) else {
            return Ok(None);
        };
        if self.is_in_primary_key {
            field = field.primary_key();
        }
        if self.default_kind == "DEFAULT" && !self.default_expression.is_empty() {
            field = field.db_default_expr(self.default_expression.clone());
        }
        Ok(Some(field))
    }
}

/// Parsed `SHOW CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateTable {
    /// Column names and type strings in declaration order.
    pub columns:      Vec<(String, String)>,
    /// Skip-indexes.
    pub indexes:      Vec<Index>,
    /// Check constraints.
    pub constraints:  Vec<Constraint>,
    /// Engine expression, such as `ReplacingMergeTree(ver)`.
    pub engine:       String,
    /// `ORDER BY` text.
    pub order_by:     Option<String>,
    /// `PARTITION BY` text.
    pub partition_by: Option<String>,
    /// `PRIMARY KEY` text.
    pub primary_key:  Option<String>,
    /// `SETTINGS` text.
    pub settings:     Option<String>
}

const ENGINE_CLAUSES: [&str; 6] = [
    "PARTITION BY",
    "PRIMARY KEY",
    "ORDER BY",
    "SAMPLE BY",
    "TTL",
    "SETTINGS"
];

impl CreateTable {
    /// Parse a `CREATE TABLE` statement as printed by the server.
    ///
    /// Projections and column modifiers other than the type are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for statements without a column list,
    /// unbalanced parentheses and unknown index types.
    pub fn parse(sql: &str) -> Result<Self> {
        let open = sql
            .find('(')
            .ok_or_else(|| Error::config("CREATE TABLE without a column list"))?;
        let close = matching_paren(sql, open)?;
        let mut table = Self::default();
        for item in split_top_level(&sql[open + 1..close], ',')? {
            let upper = item.to_ascii_uppercase();
            if upper.starts_with("INDEX ") {
                table.indexes.push(parse_index(&item[6..])?);
            } else if upper.starts_with("CONSTRAINT ") {
                if let Some(check) = parse_check(&item[11..]) {
                    table.constraints.push(check);
                }
            } else if upper.starts_with("PROJECTION ") || item.is_empty() {
                continue;
            } else {
                table.columns.push(parse_column(item)?);
            }
        }
        table.parse_tail(sql[close + 1..].trim());
        Ok(table)
    }

    fn parse_tail(&mut self, tail: &str) {
        let Some(rest) = tail.strip_prefix("ENGINE") else {
            return;
        };
        let rest = rest.trim_start().trim_start_matches('=').trim();
        let mut marks: Vec<(usize, &str)> = ENGINE_CLAUSES
            .iter()
            .filter_map(|kw| find_keyword(rest, kw).map(|at| (at, *kw)))
            .collect();
        marks.sort_unstable();
        let end = marks.first().map_or(rest.len(), |(at, _)| *at);
        self.engine = rest[..end].trim().to_owned();
        for (i, (at, kw)) in marks.iter().enumerate() {
            let stop = marks.get(i + 1).map_or(rest.len(), |(next, _)| *next);
            let text = rest[at + kw.len()..stop].trim().to_owned();
            match *kw {
                "PARTITION BY" => self.partition_by = Some(text),
                "PRIMARY KEY" => self.primary_key = Some(text),
                "ORDER BY" => self.order_by = Some(text),
                "SETTINGS" => self.settings = Some(text),
                _ => {}
            }
        }
    }

    /// Column type by column name.
    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }
}

fn matching_paren(text: &str, open: usize) -> Result<usize> {
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '`' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + i);
                }
            }
            _ => {}
        }
    }
    Err(Error::config("unbalanced parentheses in CREATE TABLE"))
}

/// Byte offset of ` keyword ` outside parentheses and quotes.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '`' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0
                && text[i..].starts_with(keyword)
                && (i == 0 || bytes[i - 1].is_ascii_whitespace())
                && text[i + keyword.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| !(c.is_alphanumeric() || c == '_')) =>
            {
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

/// Split a leading quoted or bare name from `text`.
fn leading_name(text: &str) -> (String, &str) {
    let text = text.trim_start();
    for q in ['`', '"'] {
        if let Some(rest) = text.strip_prefix(q) {
            let mut escaped = false;
            for (i, c) in rest.char_indices() {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    return (unquote_name(&text[..i + 2]), &rest[i + 1..]);
                }
            }
        }
    }
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    (text[..end].to_owned(), &text[end..])
}

fn parse_column(item: &str) -> Result<(String, String)> {
    let (name, rest) = leading_name(item);
    let rest = rest.trim_start();
    let end = ["DEFAULT", "MATERIALIZED", "ALIAS", "EPHEMERAL", "CODEC", "COMMENT", "TTL"]
        .iter()
        .filter_map(|kw| find_keyword(rest, kw))
        .min()
        .unwrap_or(rest.len());
    let db_type = rest[..end].trim();
    if db_type.is_empty() {
        return Err(Error::config(format!("column {name} has no type")));
    }
    Ok((name, db_type.to_owned()))
}

fn parse_index(item: &str) -> Result<Index> {
    let (name, rest) = leading_name(item);
    let ty_at = find_keyword(rest, "TYPE")
        .ok_or_else(|| Error::config(format!("index {name} has no TYPE")))?;
    let expr = rest[..ty_at].trim();
    let after = &rest[ty_at + 4..];
    let (ty, granularity) = match find_keyword(after, "GRANULARITY") {
        Some(at) => (
            after[..at].trim(),
            after[at + 11..]
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::config(format!("index {name} has an invalid GRANULARITY")))?
        ),
        None => (after.trim(), 1)
    };
    let expressions: Vec<String> = match expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        Some(inner) if matching_paren(expr, 0).is_ok_and(|end| end == expr.len() - 1) => {
            split_top_level(inner, ',')?
                .into_iter()
                .map(unquote_name)
                .collect()
        }
        _ => vec![unquote_name(expr)]
    };
    Ok(Index::new(expressions, IndexType::parse(ty)?)
        .with_name(name)
        .granularity(granularity))
}

fn parse_check(item: &str) -> Option<Constraint> {
    let (name, rest) = leading_name(item);
    let rest = rest.trim_start();
    let expr = rest
        .get(..5)
        .filter(|kw| kw.eq_ignore_ascii_case("CHECK"))
        .map(|_| rest[5..].trim())?;
    Some(Constraint::check(name, expr))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("UInt64" => "UInt64Field")]
    #[test_case("Int256" => "Int256Field")]
    #[test_case("Nullable(Float32)" => "Float32Field")]
    #[test_case("FixedString(16)" => "FixedStringField")]
    #[test_case("DateTime64(6, 'UTC')" => "DateTime64Field")]
    #[test_case("Decimal(10, 2)" => "DecimalField")]
    #[test_case("Decimal64(4)" => "DecimalField")]
    #[test_case("Enum8('a' = 1, 'b' = 2)" => "Enum8Field")]
    #[test_case("Array(Nullable(String))" => "ArrayField")]
    #[test_case("Tuple(a String, b UInt8)" => "TupleField")]
    #[test_case("Map(String, Array(UInt8))" => "MapField")]
    #[test_case("IPv6" => "IPv6Field")]
    #[test_case("Object('json')" => "JSONField")]
    #[test_case("Nothing" => "NothingField")]
    #[test_case("Array(Nothing)" => "ArrayField")]
    fn class_names(ty: &str) -> String {
        parse_type(ty).unwrap().class_name
    }

    #[test]
    fn round_trips_db_types() {
        for ty in [
            "LowCardinality(Nullable(String))",
            "Nullable(DateTime('Europe/Moscow'))",
            "DateTime64(3, 'UTC')",
            "Decimal(38, 10)",
            "Enum16('x' = -5, 'y' = 300)",
            "Array(Array(Int8))",
            "Tuple(a String, b Nullable(UInt8))",
            "Tuple(String, Int32)",
            "Map(LowCardinality(String), UInt64)",
            "FixedString(3)"
        ] {
            let field = parse_type(ty).unwrap().field("c").unwrap();
            assert_eq!(field.db_type(), ty);
        }
    }

    #[test]
    fn unknown_types_have_no_field() {
        let ty = parse_type("Array(AggregateFunction(uniq, String))").unwrap();
        assert!(ty.kind.is_none());
        assert!(ty.field("x").is_none());
        assert_eq!(ty.class_name, "ArrayField");
    }

    #[test]
    fn enum_labels_with_quotes() {
        let ty = parse_type(r"Enum8('it\'s' = 1, 'a=b' = 2)").unwrap();
        let Some(FieldKind::Enum { choices, .. }) = ty.kind else {
            panic!("enum expected");
        };
        assert_eq!(choices[0].name, "it's");
        assert_eq!(choices[1].name, "a=b");
    }

    #[test]
    fn rejects_unbalanced() {
        assert!(parse_type("Array(String").is_err());
        assert!(parse_type("FixedString(x)").is_err());
    }

    #[test]
    fn column_info_field() {
        let column = ColumnInfo {
            name:               "ts".into(),
            db_type:            "DateTime".into(),
            default_kind:       "DEFAULT".into(),
            default_expression: "now()".into(),
            is_in_primary_key:  true
        };
        let field = column.field().unwrap().unwrap();
        assert!(field.primary_key);
        assert!(field.db_default.is_some());
    }

    #[test]
    fn views_are_flagged() {
        assert!(TableInfo::new("v", "MaterializedView").is_view);
        assert!(!TableInfo::new("t", "MergeTree").is_view);
        assert_eq!(TableInfo::new("web_event", "MergeTree").model_name(), "WebEvent");
    }

    const CREATE: &str = "CREATE TABLE default.event (`id` Int64, `ip` IPv6 DEFAULT \
                          toIPv6('::'), `port` UInt16 CODEC(Delta, ZSTD(1)), `tags` \
                          Array(String), INDEX port_idx port TYPE minmax GRANULARITY 1, INDEX \
                          pair_idx (ip, port) TYPE bloom_filter(0.01) GRANULARITY 4, \
                          CONSTRAINT port_range CHECK (port > 0) AND (port < 65535), \
                          PROJECTION p (SELECT port ORDER BY port)) ENGINE = \
                          ReplacingMergeTree(id) PARTITION BY toYYYYMM(now()) ORDER BY (id, \
                          port) SETTINGS index_granularity = 8192";

    #[test]
    fn parses_show_create_table() {
        let table = CreateTable::parse(CREATE).unwrap();
        assert_eq!(
            table.columns,
            vec![
                ("id".into(), "Int64".into()),
                ("ip".into(), "IPv6".into()),
                ("port".into(), "UInt16".into()),
                ("tags".into(), "Array(String)".into()),
            ]
        );
        assert_eq!(table.indexes.len(), 2);
        assert_eq!(table.indexes[0].name.as_deref(), Some("port_idx"));
        assert_eq!(table.indexes[0].index_type, IndexType::MinMax);
        assert_eq!(table.indexes[1].expressions, vec!["ip".to_owned(), "port".to_owned()]);
        assert_eq!(table.indexes[1].granularity, 4);
        assert_eq!(
            table.constraints,
            vec![Constraint::check("port_range", "(port > 0) AND (port < 65535)")]
        );
        assert_eq!(table.engine, "ReplacingMergeTree(id)");
        assert_eq!(table.partition_by.as_deref(), Some("toYYYYMM(now())"));
        assert_eq!(table.order_by.as_deref(), Some("(id, port)"));
        assert_eq!(table.settings.as_deref(), Some("index_granularity = 8192"));
        assert_eq!(table.column_type("tags"), Some("Array(String)"));
    }

    #[test]
    fn rejects_missing_column_list() {
        assert!(CreateTable::parse("CREATE VIEW v AS SELECT 1").is_err());
    }
}
