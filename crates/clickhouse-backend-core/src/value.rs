// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! In-memory values exchanged with fields, the compiler and the driver.
//!
//! A [`Value`] is what a host application hands to a field
//! ([`Field::prep_value`](crate::types::Field::prep_value)) and what a driver
//! returns from a query
//! ([`Field::from_db`](crate::types::Field::from_db)).
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_core::Value;
//!
//! let tags = Value::from(vec!["a", "b"]);
//! assert_eq!(tags, Value::Array(vec!["a".into(), "b".into()]));
//! assert!(Value::from(None::<i32>).is_null());
//! ```

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr}
};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A single value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer up to 128 bits.
    Int(i128),
    /// Unsigned integer up to 128 bits.
    UInt(u128),
    /// Integer beyond 128 bits, as decimal text.
    BigInt(String),
    /// Floating point number.
    Float(f64),
    /// Fixed point number.
    Decimal(Decimal),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UUID.
    Uuid(Uuid),
    /// Calendar date.
    Date(NaiveDate),
    /// Datetime without timezone.
    DateTime(NaiveDateTime),
    /// Datetime with a fixed offset.
    DateTimeTz(DateTime<FixedOffset>),
    /// IPv4 address.
    Ipv4(Ipv4Addr),
    /// IPv6 address.
    Ipv6(Ipv6Addr),
    /// Array of values.
    Array(Vec<Value>),
    /// Positional tuple.
    Tuple(Vec<Value>),
    /// Tuple with named elements.
    NamedTuple(Vec<(String, Value)>),
    /// Map as ordered key-value pairs.
    Map(Vec<(Value, Value)>),
    /// Arbitrary JSON document.
    Json(serde_json::Value)
}

impl Value {
    /// Check if the value is `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if the value is an array, tuple or map.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Tuple(_) | Self::NamedTuple(_) | Self::Map(_)
        )
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) | Self::BigInt(_) => "integer",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::DateTime(_) | Self::DateTimeTz(_) => "datetime",
            Self::Ipv4(_) => "ipv4",
            Self::Ipv6(_) => "ipv6",
            Self::Array(_) => "array",
            Self::Tuple(_) | Self::NamedTuple(_) => "tuple",
            Self::Map(_) => "map",
            Self::Json(_) => "json"
        }
    }

    /// Borrow the text of a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None
        }
    }

    /// Unquoted text of a scalar.
    ///
    /// `None` for null, bytes, composites and JSON.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        crate::types::scalar_text(self)
    }

    /// Integer view of the value when it fits `i128`.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i128::try_from(*v).ok(),
            Self::Bool(v) => Some(i128::from(*v)),
            _ => None
        }
    }

    /// Elements of an array or tuple.
    #[must_use]
    pub fn elements(&self) -> Option<Vec<&Value>> {
        match self {
            Self::Array(items) | Self::Tuple(items) => Some(items.iter().collect()),
            Self::NamedTuple(items) => Some(items.iter().map(|(_, v)| v).collect()),
            _ => None
        }
    }

    /// Positional access into a tuple, named tuple or array.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Array(items) | Self::Tuple(items) => items.get(index),
            Self::NamedTuple(items) => items.get(index).map(|(_, v)| v),
            _ => None
        }
    }

    /// Named access into a named tuple.
    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        match self {
            Self::NamedTuple(items) => items.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::BigInt(v) => f.write_str(v),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "{} bytes", v.len()),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::DateTimeTz(v) => write!(f, "{v}"),
            Self::Ipv4(v) => write!(f, "{v}"),
            Self::Ipv6(v) => write!(f, "{v}"),
            Self::Array(items) => write_seq(f, "[", items.iter(), "]"),
            Self::Tuple(items) => write_seq(f, "(", items.iter(), ")"),
            Self::NamedTuple(items) => write_seq(f, "(", items.iter().map(|(_, v)| v), ")"),
            Self::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Json(v) => write!(f, "{v}")
        }
    }
}

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::Int(i128::from(v))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::UInt(u128::from(v))
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, i128);
from_unsigned!(u8, u16, u32, u64, u128);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTimeTz(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTimeTz(v.fixed_offset())
    }
}

impl From<Ipv4Addr> for Value {
    fn from(v: Ipv4Addr) -> Self {
        Self::Ipv4(v)
    }
}

impl From<Ipv6Addr> for Value {
    fn from(v: Ipv6Addr) -> Self {
        Self::Ipv6(v)
    }
}

impl From<IpAddr> for Value {
    fn from(v: IpAddr) -> Self {
        match v {
            IpAddr::V4(v4) => Self::Ipv4(v4),
            IpAddr::V6(v6) => Self::Ipv6(v6)
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect()
        )
    }
}
