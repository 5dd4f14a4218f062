// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Logical column kinds.

use super::Field;
use crate::escape::quote_string;

/// Bit width of an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 8 bits.
    W8,
    /// 16 bits.
    W16,
    /// 32 bits.
    W32,
    /// 64 bits.
    W64,
    /// 128 bits.
    W128,
    /// 256 bits.
    W256
}

impl IntWidth {
    /// Number of bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
            Self::W128 => 128,
            Self::W256 => 256
        }
    }

    /// Width for a bit count.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::W8),
            16 => Some(Self::W16),
            32 => Some(Self::W32),
            64 => Some(Self::W64),
            128 => Some(Self::W128),
            256 => Some(Self::W256),
            _ => None
        }
    }
}

/// Storage width of an enum column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumWidth {
    /// `Enum8`, values in `[-128, 127]`.
    Enum8,
    /// `Enum16`, values in `[-32768, 32767]`.
    Enum16
}

impl EnumWidth {
    /// Inclusive value range.
    #[must_use]
    pub const fn range(&self) -> (i32, i32) {
        match self {
            Self::Enum8 => (i8::MIN as i32, i8::MAX as i32),
            Self::Enum16 => (i16::MIN as i32, i16::MAX as i32)
        }
    }

    /// Type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enum8 => "Enum8",
            Self::Enum16 => "Enum16"
        }
    }
}

/// One `'name' = value` pair of an enum column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumChoice {
    /// Stored name.
    pub name:  String,
    /// Stored number.
    pub value: i32
}

impl EnumChoice {
    /// Create a choice.
    pub fn new(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value
        }
    }

    /// Create a choice from a byte name.
    ///
    /// UTF-8 names are decoded; other bytes are kept as `\xNN` escapes.
    #[must_use]
    pub fn from_bytes(name: &[u8], value: i32) -> Self {
        let name = match std::str::from_utf8(name) {
            Ok(s) => s.to_owned(),
            Err(_) => name
                .iter()
                .map(|b| {
                    if b.is_ascii() && !b.is_ascii_control() {
                        char::from(*b).to_string()
                    } else {
                        format!("\\x{b:02x}")
                    }
                })
                .collect()
        };
        Self {
            name,
            value
        }
    }
}

/// Address family accepted by a generic IP column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IpProtocol {
    /// IPv4 and IPv6.
    #[default]
    Both,
    /// IPv4 only.
    Ipv4,
    /// IPv6 only.
    Ipv6
}

/// Element of a tuple column.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    /// Element name for named tuples.
    pub name:  Option<String>,
    /// Element field.
    pub field: Field
}

impl TupleElement {
    /// Positional element.
    #[must_use]
    pub const fn positional(field: Field) -> Self {
        Self {
            name: None,
            field
        }
    }

    /// Named element.
    pub fn named(name: impl Into<String>, field: Field) -> Self {
        Self {
            name: Some(name.into()),
            field
        }
    }
}

/// Logical kind of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// `Int8` .. `Int256`.
    Int(IntWidth),
    /// `UInt8` .. `UInt256`.
    UInt(IntWidth),
    /// `Float32`.
    Float32,
    /// `Float64`.
    Float64,
    /// `Decimal(P, S)`.
    Decimal {
        /// Total digits, 1..=76.
        max_digits:     u8,
        /// Digits after the point.
        decimal_places: u8
    },
    /// `Bool`.
    Bool,
    /// `String`.
    String,
    /// `FixedString(N)`.
    FixedString {
        /// Width in bytes.
        max_bytes: usize
    },
    /// `UUID`.
    Uuid,
    /// `Date`.
    Date,
    /// `Date32`.
    Date32,
    /// `DateTime[('tz')]`.
    DateTime {
        /// Column timezone.
        timezone: Option<String>
    },
    /// `DateTime64(P[, 'tz'])`.
    DateTime64 {
        /// Sub-second digits, 0..=9.
        precision: u8,
        /// Column timezone.
        timezone:  Option<String>
    },
    /// `Enum8(...)` / `Enum16(...)`.
    Enum {
        /// Storage width.
        width:      EnumWidth,
        /// Declared choices.
        choices:    Vec<EnumChoice>,
        /// Read values back as numbers instead of names.
        return_int: bool
    },
    /// `Array(T)`.
    Array(Box<Field>),
    /// `Tuple(...)`.
    Tuple(Vec<TupleElement>),
    /// `Map(K, V)`.
    Map {
        /// Key field.
        key:   Box<Field>,
        /// Value field.
        value: Box<Field>
    },
    /// `IPv4`.
    Ipv4,
    /// `IPv6`.
    Ipv6,
    /// Either family, stored as `IPv6`.
    GenericIp {
        /// Accepted family.
        protocol:    IpProtocol,
        /// Read IPv4-mapped addresses back as IPv4.
        unpack_ipv4: bool
    },
    /// `JSON`.
    Json
}

impl FieldKind {
    /// Type string without nullability or low-cardinality wrappers.
    #[must_use]
    pub fn base_db_type(&self) -> String {
        match self {
            Self::Int(w) => format!("Int{}", w.bits()),
            Self::UInt(w) => format!("UInt{}", w.bits()),
            Self::Float32 => "Float32".into(),
            Self::Float64 => "Float64".into(),
            Self::Decimal {
                max_digits,
                decimal_places
            } => format!("Decimal({max_digits}, {decimal_places})"),
            Self::Bool => "Bool".into(),
            Self::String => "String".into(),
            Self::FixedString { max_bytes } => format!("FixedString({max_bytes})"),
            Self::Uuid => "UUID".into(),
            Self::Date => "Date".into(),
            Self::Date32 => "Date32".into(),
            Self::DateTime { timezone } => match timezone {
                Some(tz) => format!("DateTime({})", quote_string(tz)),
                None => "DateTime".into()
            },
            Self::DateTime64 {
                precision,
                timezone
            } => match timezone {
                Some(tz) => format!("DateTime64({precision}, {})", quote_string(tz)),
                None => format!("DateTime64({precision})")
            },
            Self::Enum {
                width, choices, ..
            } => {
                let items: Vec<String> = choices
                    .iter()
                    .map(|c| format!("{} = {}", quote_string(&c.name), c.value))
                    .collect();
                format!("{}({})", width.as_str(), items.join(", "))
            }
            Self::Array(inner) => format!("Array({})", inner.db_type()),
            Self::Tuple(elements) => {
                let items: Vec<String> = elements
                    .iter()
                    .map(|e| match &e.name {
                        Some(name) => format!("{name} {}", e.field.db_type()),
                        None => e.field.db_type()
                    })
                    .collect();
                format!("Tuple({})", items.join(", "))
            }
            Self::Map { key, value } => format!("Map({}, {})", key.db_type(), value.db_type()),
            Self::Ipv4 => "IPv4".into(),
            Self::Ipv6 | Self::GenericIp { .. } => "IPv6".into(),
            Self::Json => "JSON".into()
        }
    }

    /// Field class name, as reported by introspection.
    #[must_use]
    pub fn class_name(&self) -> String {
        match self {
            Self::Int(w) => format!("Int{}Field", w.bits()),
            Self::UInt(w) => format!("UInt{}Field", w.bits()),
            Self::Float32 => "Float32Field".into(),
            Self::Float64 => "Float64Field".into(),
            Self::Decimal { .. } => "DecimalField".into(),
            Self::Bool => "BoolField".into(),
            Self::String => "StringField".into(),
            Self::FixedString { .. } => "FixedStringField".into(),
            Self::Uuid => "UUIDField".into(),
            Self::Date => "DateField".into(),
            Self::Date32 => "Date32Field".into(),
            Self::DateTime { .. } => "DateTimeField".into(),
            Self::DateTime64 { .. } => "DateTime64Field".into(),
            Self::Enum { width, .. } => format!("{}Field", width.as_str()),
            Self::Array(_) => "ArrayField".into(),
            Self::Tuple(_) => "TupleField".into(),
            Self::Map { .. } => "MapField".into(),
            Self::Ipv4 => "IPv4Field".into(),
            Self::Ipv6 => "IPv6Field".into(),
            Self::GenericIp { .. } => "GenericIPAddressField".into(),
            Self::Json => "JSONField".into()
        }
    }

    /// Check if the kind holds text natively.
    #[must_use]
    pub const fn is_string_like(&self) -> bool {
        matches!(self, Self::String | Self::FixedString { .. })
    }

    /// Check if the kind is an integer of any width.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_))
    }

    /// Check if the kind carries a date or a datetime.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::Date32 | Self::DateTime { .. } | Self::DateTime64 { .. }
        )
    }

    /// Check if the kind is an array, tuple or map.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Tuple(_) | Self::Map { .. })
    }

    /// Check if the kind may be wrapped in `Nullable`.
    #[must_use]
    pub const fn supports_nullable(&self) -> bool {
        !matches!(
            self,
            Self::Array(_) | Self::Tuple(_) | Self::Map { .. } | Self::Json
        )
    }

    /// Check if the kind may be wrapped in `LowCardinality`.
    #[must_use]
    pub const fn supports_low_cardinality(&self) -> bool {
        matches!(
            self,
            Self::Int(_)
                | Self::UInt(_)
                | Self::Float32
                | Self::Float64
                | Self::Bool
                | Self::String
                | Self::FixedString { .. }
                | Self::Date
                | Self::Date32
                | Self::DateTime { .. }
        )
    }

    /// Check if the kind may be used as a map key.
    #[must_use]
    pub const fn allowed_as_map_key(&self) -> bool {
        matches!(
            self,
            Self::Int(_)
                | Self::UInt(_)
                | Self::String
                | Self::FixedString { .. }
                | Self::Uuid
                | Self::Date
                | Self::Date32
                | Self::DateTime { .. }
                | Self::DateTime64 { .. }
                | Self::Enum { .. }
                | Self::Ipv4
                | Self::Ipv6
                | Self::GenericIp { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_types() {
        assert_eq!(FieldKind::Int(IntWidth::W256).base_db_type(), "Int256");
        assert_eq!(FieldKind::UInt(IntWidth::W8).base_db_type(), "UInt8");
        assert_eq!(
            FieldKind::Decimal {
                max_digits:     18,
                decimal_places: 4
            }
            .base_db_type(),
            "Decimal(18, 4)"
        );
        assert_eq!(
            FieldKind::DateTime64 {
                precision: 6,
                timezone:  Some("UTC".into())
            }
            .base_db_type(),
            "DateTime64(6, 'UTC')"
        );
        assert_eq!(
            FieldKind::DateTime { timezone: None }.base_db_type(),
            "DateTime"
        );
    }

    #[test]
    fn enum_type_escapes_names() {
        let kind = FieldKind::Enum {
            width:      EnumWidth::Enum8,
            choices:    vec![EnumChoice::new("it's", 1), EnumChoice::new("b", -2)],
            return_int: false
        };
        assert_eq!(kind.base_db_type(), r"Enum8('it\'s' = 1, 'b' = -2)");
    }

    #[test]
    fn enum_choice_from_bytes() {
        assert_eq!(EnumChoice::from_bytes(b"on", 1).name, "on");
        assert_eq!(EnumChoice::from_bytes(&[0x61, 0xff], 1).name, "a\\xff");
    }

    #[test]
    fn flag_table() {
        assert!(FieldKind::String.supports_low_cardinality());
        assert!(!FieldKind::Uuid.supports_low_cardinality());
        assert!(FieldKind::Decimal {
            max_digits:     9,
            decimal_places: 2
        }
        .supports_nullable());
        assert!(!FieldKind::Json.supports_nullable());
        assert!(!FieldKind::Bool.allowed_as_map_key());
    }

    #[test]
    fn int_width_bits() {
        assert_eq!(IntWidth::from_bits(128), Some(IntWidth::W128));
        assert_eq!(IntWidth::from_bits(12), None);
        assert_eq!(EnumWidth::Enum16.range(), (-32768, 32767));
    }
}
