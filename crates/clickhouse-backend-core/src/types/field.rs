// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Column descriptor.

use std::{collections::HashSet, str::FromStr};

use chrono_tz::Tz;

use super::{EnumChoice, EnumWidth, FieldKind, IntWidth, IpProtocol, TupleElement};
use crate::{
    Error, Result, Value,
    ident::{MAX_NAME_LENGTH, is_identifier}
};

/// Default stored in the column definition.
#[derive(Debug, Clone, PartialEq)]
pub enum DbDefault {
    /// Literal value, rendered through the literal escape.
    Value(Value),
    /// Raw SQL expression such as `now()`.
    Expression(String)
}

/// A column of a model.
///
/// Composite kinds own their inner fields, so a field is a tree.
///
/// # Example
///
/// ```rust
/// use clickhouse_backend_core::types::Field;
///
/// let ip = Field::generic_ip("ip").low_cardinality();
/// assert!(ip.check().is_err());
///
/// let name = Field::string("name").nullable().low_cardinality();
/// assert_eq!(name.db_type(), "LowCardinality(Nullable(String))");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Attribute name in the model.
    pub name:            String,
    /// Column name when it differs from `name`.
    pub column:          Option<String>,
    /// Logical kind.
    pub kind:            FieldKind,
    /// Wrap in `Nullable`.
    pub nullable:        bool,
    /// Wrap in `LowCardinality`.
    pub low_cardinality: bool,
    /// Primary key column.
    pub primary_key:     bool,
    /// Application-side default, used to backfill rows.
    pub default:         Option<Value>,
    /// Default written into the column definition.
    pub db_default:      Option<DbDefault>,
    /// Column-level check expression.
    pub check:           Option<String>
}

impl Field {
    /// Create a field of any kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind,
            nullable: false,
            low_cardinality: false,
            primary_key: false,
            default: None,
            db_default: None,
            check: None
        }
    }

    /// Create an unnamed field, used as the element of a composite.
    #[must_use]
    pub fn of(kind: FieldKind) -> Self {
        Self::new("", kind)
    }

    /// Signed integer column.
    pub fn int(name: impl Into<String>, width: IntWidth) -> Self {
        Self::new(name, FieldKind::Int(width))
    }

    /// Unsigned integer column.
    pub fn uint(name: impl Into<String>, width: IntWidth) -> Self {
        Self::new(name, FieldKind::UInt(width))
    }

    /// `Int32` column.
    pub fn int32(name: impl Into<String>) -> Self {
        Self::int(name, IntWidth::W32)
    }

    /// `Int64` column.
    pub fn int64(name: impl Into<String>) -> Self {
        Self::int(name, IntWidth::W64)
    }

    /// `UInt16` column.
    pub fn uint16(name: impl Into<String>) -> Self {
        Self::uint(name, IntWidth::W16)
    }

    /// `Float64` column.
    pub fn float64(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float64)
    }

    /// `Decimal(P, S)` column.
    pub fn decimal(name: impl Into<String>, max_digits: u8, decimal_places: u8) -> Self {
        Self::new(
            name,
            FieldKind::Decimal {
                max_digits,
                decimal_places
            }
        )
    }

    /// `Bool` column.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    /// `String` column.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// `FixedString(N)` column.
    pub fn fixed_string(name: impl Into<String>, max_bytes: usize) -> Self {
        Self::new(name, FieldKind::FixedString { max_bytes })
    }

    /// `UUID` column.
    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Uuid)
    }

    /// `Date` column.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    /// `Date32` column.
    pub fn date32(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date32)
    }

    /// `DateTime` column.
    pub fn datetime(name: impl Into<String>, timezone: Option<&str>) -> Self {
        Self::new(
            name,
            FieldKind::DateTime {
                timezone: timezone.map(str::to_owned)
            }
        )
    }

    /// `DateTime64(P[, 'tz'])` column.
    pub fn datetime64(name: impl Into<String>, precision: u8, timezone: Option<&str>) -> Self {
        Self::new(
            name,
            FieldKind::DateTime64 {
                precision,
                timezone: timezone.map(str::to_owned)
            }
        )
    }

    /// `Enum8`/`Enum16` column.
    pub fn enumeration(
        name: impl Into<String>,
        width: EnumWidth,
        choices: impl IntoIterator<Item = (&'static str, i32)>
    ) -> Self {
        Self::new(
            name,
            FieldKind::Enum {
                width,
                choices: choices
                    .into_iter()
                    .map(|(n, v)| EnumChoice::new(n, v))
                    .collect(),
                return_int: true
            }
        )
    }

    /// `Array(T)` column.
    pub fn array(name: impl Into<String>, inner: Self) -> Self {
        Self::new(name, FieldKind::Array(Box::new(inner)))
    }

    /// `Tuple(T1, T2, ...)` column.
    pub fn tuple(name: impl Into<String>, elements: impl IntoIterator<Item = Self>) -> Self {
        Self::new(
            name,
            FieldKind::Tuple(elements.into_iter().map(TupleElement::positional).collect())
        )
    }

    /// `Tuple(a T1, b T2, ...)` column.
    pub fn named_tuple(
        name: impl Into<String>,
        elements: impl IntoIterator<Item = (&'static str, Self)>
    ) -> Self {
        Self::new(
            name,
            FieldKind::Tuple(
                elements
                    .into_iter()
                    .map(|(n, f)| TupleElement::named(n, f))
                    .collect()
            )
        )
    }

    /// `Map(K, V)` column.
    pub fn map(name: impl Into<String>, key: Self, value: Self) -> Self {
        Self::new(
            name,
            FieldKind::Map {
                key:   Box::new(key),
                value: Box::new(value)
            }
        )
    }

    /// `IPv4` column.
    pub fn ipv4(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Ipv4)
    }

    /// `IPv6` column.
    pub fn ipv6(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Ipv6)
    }

    /// Generic IP column accepting both families.
    pub fn generic_ip(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::GenericIp {
                protocol:    IpProtocol::Both,
                unpack_ipv4: false
            }
        )
    }

    /// `JSON` column.
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// Allow `NULL`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Wrap in `LowCardinality`.
    #[must_use]
    pub fn low_cardinality(mut self) -> Self {
        self.low_cardinality = true;
        self
    }

    /// Mark as primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Use a column name different from the attribute name.
    #[must_use]
    pub fn db_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Application-side default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Literal default in the column definition.
    #[must_use]
    pub fn db_default(mut self, value: impl Into<Value>) -> Self {
        self.db_default = Some(DbDefault::Value(value.into()));
        self
    }

    /// Expression default in the column definition.
    #[must_use]
    pub fn db_default_expr(mut self, expr: impl Into<String>) -> Self {
        self.db_default = Some(DbDefault::Expression(expr.into()));
        self
    }

    /// Column-level check expression.
    #[must_use]
    pub fn with_check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Read enum values back as names instead of numbers.
    #[must_use]
    pub fn return_names(mut self) -> Self {
        if let FieldKind::Enum { return_int, .. } = &mut self.kind {
            *return_int = false;
        }
        self
    }

    /// Restrict a generic IP column to one family.
    #[must_use]
    pub fn protocol(mut self, value: IpProtocol) -> Self {
        if let FieldKind::GenericIp { protocol, .. } = &mut self.kind {
            *protocol = value;
        }
        self
    }

    /// Read IPv4-mapped addresses of a generic IP column back as IPv4.
    #[must_use]
    pub fn unpack_ipv4(mut self) -> Self {
        if let FieldKind::GenericIp { unpack_ipv4, .. } = &mut self.kind {
            *unpack_ipv4 = true;
        }
        self
    }

    /// Column name in the table.
    #[must_use]
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    /// Full column type.
    ///
    /// `LowCardinality` is always the outermost wrapper.
    #[must_use]
    pub fn db_type(&self) -> String {
        let base = self.kind.base_db_type();
        let inner = if self.nullable {
            format!("Nullable({base})")
        } else {
            base
        };
        if self.low_cardinality {
            format!("LowCardinality({inner})")
        } else {
            inner
        }
    }

    /// Name of the default constraint for the column-level check.
    #[must_use]
    pub fn check_constraint_name(&self) -> String {
        format!("_check_{}", self.column_name())
    }

    /// Verify the declaration against ClickHouse type rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first violation found.
    pub fn check(&self) -> Result<()> {
        let label = if self.name.is_empty() {
            self.kind.base_db_type()
        } else {
            self.name.clone()
        };
        if self.column_name().len() > MAX_NAME_LENGTH {
            return Err(Error::config(format!(
                "{label}: column name is longer than {MAX_NAME_LENGTH} bytes"
            )));
        }
        if self.nullable && !self.kind.supports_nullable() {
            return Err(Error::config(format!(
                "{label}: {} cannot be nullable",
                self.kind.class_name()
            )));
        }
        if self.low_cardinality && !self.kind.supports_low_cardinality() {
            return Err(Error::config(format!(
                "{label}: {} does not support low_cardinality",
                self.kind.class_name()
            )));
        }
        match &self.kind {
            FieldKind::Decimal {
                max_digits,
                decimal_places
            } => {
                if !(1..=76).contains(max_digits) {
                    return Err(Error::config(format!(
                        "{label}: max_digits must be in [1, 76], got {max_digits}"
                    )));
                }
                if decimal_places > max_digits {
                    return Err(Error::config(format!(
                        "{label}: decimal_places {decimal_places} exceeds max_digits {max_digits}"
                    )));
                }
            }
            FieldKind::FixedString { max_bytes } if *max_bytes == 0 => {
                return Err(Error::config(format!("{label}: max_bytes must be positive")));
            }
            FieldKind::DateTime { timezone } => check_timezone(&label, timezone.as_deref())?,
            FieldKind::DateTime64 {
                precision,
                timezone
            } => {
                if *precision > 9 {
                    return Err(Error::config(format!(
                        "{label}: precision must be in [0, 9], got {precision}"
                    )));
                }
                check_timezone(&label, timezone.as_deref())?;
            }
            FieldKind::Enum { width, choices, .. } => check_enum(&label, *width, choices)?,
            FieldKind::Array(inner) => inner.check()?,
            FieldKind::Tuple(elements) => check_tuple(&label, elements)?,
            FieldKind::Map { key, value } => {
                if key.nullable {
                    return Err(Error::config(format!("{label}: map key cannot be nullable")));
                }
                if !key.kind.allowed_as_map_key() {
                    return Err(Error::config(format!(
                        "{label}: {} cannot be a map key",
                        key.kind.class_name()
                    )));
                }
                if key.low_cardinality && !key.kind.is_string_like() {
                    return Err(Error::config(format!(
                        "{label}: only String and FixedString map keys may be low_cardinality"
                    )));
                }
                key.check()?;
                value.check()?;
            }
            FieldKind::GenericIp {
                protocol,
                unpack_ipv4
            } if *unpack_ipv4 && *protocol != IpProtocol::Both => {
                return Err(Error::config(format!(
                    "{label}: unpack_ipv4 requires protocol both"
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

fn check_timezone(label: &str, timezone: Option<&str>) -> Result<()> {
    match timezone {
        Some(tz) if Tz::from_str(tz).is_err() => {
            Err(Error::config(format!("{label}: unknown timezone {tz}")))
        }
        _ => Ok(())
    }
}

fn check_enum(label: &str, width: EnumWidth, choices: &[EnumChoice]) -> Result<()> {
    if choices.is_empty() {
        return Err(Error::config(format!("{label}: enum needs at least one choice")));
    }
    let (min, max) = width.range();
    let mut names = HashSet::new();
    let mut values = HashSet::new();
    for choice in choices {
        if !(min..=max).contains(&choice.value) {
            return Err(Error::config(format!(
                "{label}: {} value {} is outside [{min}, {max}]",
                width.as_str(),
                choice.value
            )));
        }
        if !names.insert(choice.name.as_str()) || !values.insert(choice.value) {
            return Err(Error::config(format!(
                "{label}: duplicate enum choice {}",
                choice.name
            )));
        }
    }
    Ok(())
}

fn check_tuple(label: &str, elements: &[TupleElement]) -> Result<()> {
    if elements.is_empty() {
        return Err(Error::config(format!("{label}: tuple needs at least one element")));
    }
    let named = elements.iter().filter(|e| e.name.is_some()).count();
    if named != 0 && named != elements.len() {
        return Err(Error::config(format!(
            "{label}: tuple elements must be all named or all positional"
        )));
    }
    let mut seen = HashSet::new();
    for element in elements {
        if let Some(name) = &element.name {
            if !is_identifier(name) {
                return Err(Error::config(format!(
                    "{label}: tuple element name {name:?} is not a valid identifier"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::config(format!(
                    "{label}: duplicate tuple element name {name}"
                )));
            }
        }
        element.field.check()?;
    }
    Ok(())
}
