// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Generic ORM field kinds and their ClickHouse columns.
//!
//! | Host kind | ClickHouse type |
//! |-----------|-----------------|
//! | `AutoField` | `Int32` |
//! | `BigAutoField` | `Int64` |
//! | `SmallAutoField` | `Int16` |
//! | `BinaryField` | `String` |
//! | `BooleanField` | `Bool` |
//! | `CharField`, `TextField`, `SlugField`, ... | `String` |
//! | `DateField` | `Date32` |
//! | `DateTimeField` | `DateTime64(6, 'UTC')` |
//! | `DecimalField` | `Decimal(P, S)` |
//! | `DurationField` | `Int64` |
//! | `FloatField` | `Float64` |
//! | `PositiveIntegerField` | `UInt32` |
//! | `IPAddressField` | `IPv4` |
//! | `GenericIPAddressField` | `IPv6` |
//! | `JSONField` | `JSON` |
//! | `UUIDField` | `UUID` |
//! | `TimeField` | `String` |

use super::{Field, FieldKind, IntWidth, IpProtocol};

/// Field kinds of the host ORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum HostFieldKind {
    AutoField,
    BigAutoField,
    SmallAutoField,
    BinaryField,
    BooleanField,
    CharField,
    DateField,
    DateTimeField,
    DecimalField { max_digits: u8, decimal_places: u8 },
    DurationField,
    EmailField,
    FileField,
    FilePathField,
    FloatField,
    IntegerField,
    BigIntegerField,
    SmallIntegerField,
    PositiveBigIntegerField,
    PositiveIntegerField,
    PositiveSmallIntegerField,
    IpAddressField,
    GenericIpAddressField,
    JsonField,
    SlugField,
    TextField,
    TimeField,
    UrlField,
    UuidField
}

impl HostFieldKind {
    /// ClickHouse kind backing this host kind.
    #[must_use]
    pub fn to_kind(&self) -> FieldKind {
        match self {
            Self::AutoField | Self::IntegerField => FieldKind::Int(IntWidth::W32),
            Self::BigAutoField | Self::BigIntegerField | Self::DurationField => {
                FieldKind::Int(IntWidth::W64)
            }
            Self::SmallAutoField | Self::SmallIntegerField => FieldKind::Int(IntWidth::W16),
            Self::PositiveBigIntegerField => FieldKind::UInt(IntWidth::W64),
            Self::PositiveIntegerField => FieldKind::UInt(IntWidth::W32),
            Self::PositiveSmallIntegerField => FieldKind::UInt(IntWidth::W16),
            Self::BooleanField => FieldKind::Bool,
            Self::BinaryField
            | Self::CharField
            | Self::EmailField
            | Self::FileField
            | Self::FilePathField
            | Self::SlugField
            | Self::TextField
            | Self::TimeField
            | Self::UrlField => FieldKind::String,
            Self::DateField => FieldKind::Date32,
            Self::DateTimeField => FieldKind::DateTime64 {
                precision: 6,
                timezone:  Some("UTC".into())
            },
            Self::DecimalField {
                max_digits,
                decimal_places
            } => FieldKind::Decimal {
                max_digits:     *max_digits,
                decimal_places: *decimal_places
            },
            Self::FloatField => FieldKind::Float64,
            Self::IpAddressField => FieldKind::Ipv4,
            Self::GenericIpAddressField => FieldKind::GenericIp {
                protocol:    IpProtocol::Both,
                unpack_ipv4: false
            },
            Self::JsonField => FieldKind::Json,
            Self::UuidField => FieldKind::Uuid
        }
    }

    /// Column type string.
    #[must_use]
    pub fn db_type(&self) -> String {
        self.to_kind().base_db_type()
    }

    /// Check if values are synthesized by the backend on insert.
    #[must_use]
    pub const fn is_auto(&self) -> bool {
        matches!(
            self,
            Self::AutoField | Self::BigAutoField | Self::SmallAutoField
        )
    }

    /// Build a field of this kind.
    pub fn field(&self, name: impl Into<String>) -> Field {
        let field = Field::new(name, self.to_kind());
        if self.is_auto() {
            field.primary_key()
        } else {
            field
        }
    }
}
