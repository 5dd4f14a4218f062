// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Value validation.

use std::{cmp::Ordering, net::IpAddr, str::FromStr};

use chrono::NaiveDate;

use super::{Field, FieldKind, IntWidth, IpProtocol};
use crate::{ValidationError, Value};

const POW2_255: &str =
    "57896044618658097711785492504343953926634992332820282019728792003956564819968";
const POW2_255_MINUS_1: &str =
    "57896044618658097711785492504343953926634992332820282019728792003956564819967";
const POW2_256_MINUS_1: &str =
    "115792089237316195423570985008687907853269984665640564039457584007913129639935";

/// Sign and decimal magnitude of an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Integer {
    negative: bool,
    digits:   String
}

impl Integer {
    fn new(negative: bool, digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        Self {
            negative: negative && digits != "0",
            digits:   digits.to_owned()
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(Self::new(*v < 0, &v.unsigned_abs().to_string())),
            Value::UInt(v) => Some(Self::new(false, &v.to_string())),
            Value::Bool(v) => Some(Self::new(false, if *v { "1" } else { "0" })),
            Value::BigInt(text) => {
                let (negative, digits) = match text.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, text.strip_prefix('+').unwrap_or(text))
                };
                (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                    .then(|| Self::new(negative, digits))
            }
            _ => None
        }
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(&other.digits))
    }

    fn render(&self) -> String {
        if self.negative {
            format!("-{}", self.digits)
        } else {
            self.digits.clone()
        }
    }
}

impl PartialOrd for Integer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Integer {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater
        }
    }
}

/// Inclusive bounds of an integer column.
fn integer_bounds(signed: bool, width: IntWidth) -> (Integer, Integer) {
    let bits = width.bits();
    match (signed, bits) {
        (true, 256) => (Integer::new(true, POW2_255), Integer::new(false, POW2_255_MINUS_1)),
        (false, 256) => (Integer::new(false, "0"), Integer::new(false, POW2_256_MINUS_1)),
        (true, _) => {
            let half = 1_u128 << (bits - 1);
            (
                Integer::new(true, &half.to_string()),
                Integer::new(false, &(half - 1).to_string())
            )
        }
        (false, _) => {
            let max = if bits == 128 {
                u128::MAX
            } else {
                (1_u128 << bits) - 1
            };
            (Integer::new(false, "0"), Integer::new(false, &max.to_string()))
        }
    }
}

fn date_bounds(kind: &FieldKind) -> Option<(NaiveDate, NaiveDate)> {
    match kind {
        FieldKind::Date => Some((
            NaiveDate::from_ymd_opt(1970, 1, 1)?,
            NaiveDate::from_ymd_opt(2149, 6, 6)?
        )),
        FieldKind::Date32 => Some((
            NaiveDate::from_ymd_opt(1900, 1, 1)?,
            NaiveDate::from_ymd_opt(2299, 12, 31)?
        )),
        _ => None
    }
}

impl Field {
    /// Validate a value against the column type.
    ///
    /// Checks integer ranges, `FixedString` byte length, decimal digits,
    /// enum membership, tuple arity, map keys, address syntax and date
    /// ranges. Composite values are validated element by element.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err(ValidationError::NullNotAllowed {
                    db_type: self.db_type()
                })
            };
        }
        match &self.kind {
            FieldKind::Int(width) => self.validate_integer(true, *width, value),
            FieldKind::UInt(width) => self.validate_integer(false, *width, value),
            FieldKind::FixedString { max_bytes } => {
                let len = match value {
                    Value::String(s) => s.len(),
                    Value::Bytes(b) => b.len(),
                    _ => return Err(self.invalid(value))
                };
                if len > *max_bytes {
                    return Err(ValidationError::TooLong {
                        db_type: self.db_type(),
                        len,
                        max: *max_bytes
                    });
                }
                Ok(())
            }
            FieldKind::Decimal {
                max_digits,
                decimal_places
            } => {
                let Value::Decimal(d) = value else {
                    return Ok(());
                };
                let normalized = d.normalize();
                let places = normalized.scale();
                let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
                let whole = digits.saturating_sub(places);
                if places > u32::from(*decimal_places)
                    || whole > u32::from(max_digits.saturating_sub(*decimal_places))
                {
                    return Err(ValidationError::Precision {
                        db_type: self.db_type(),
                        value:   d.to_string()
                    });
                }
                Ok(())
            }
            FieldKind::Date | FieldKind::Date32 => {
                if let (Value::Date(date), Some((min, max))) = (value, date_bounds(&self.kind))
                    && !(min..=max).contains(date)
                {
                    return Err(ValidationError::OutOfRange {
                        db_type: self.db_type(),
                        value:   date.to_string(),
                        min:     min.to_string(),
                        max:     max.to_string()
                    });
                }
                Ok(())
            }
            FieldKind::Enum { choices, .. } => {
                let found = match value {
                    Value::String(name) => choices.iter().any(|c| &c.name == name),
                    other => match other.as_i128() {
                        Some(n) => choices.iter().any(|c| i128::from(c.value) == n),
                        None => false
                    }
                };
                if found {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidChoice {
                        value: value.to_string()
                    })
                }
            }
            FieldKind::Array(inner) => match value {
                Value::Array(items) => items.iter().try_for_each(|v| inner.validate(v)),
                _ => Err(self.invalid(value))
            },
            FieldKind::Tuple(elements) => {
                let items = value.elements().ok_or_else(|| self.invalid(value))?;
                if items.len() != elements.len() {
                    return Err(ValidationError::TupleLength {
                        expected: elements.len(),
                        got:      items.len()
                    });
                }
                elements
                    .iter()
                    .zip(items)
                    .try_for_each(|(e, v)| e.field.validate(v))
            }
            FieldKind::Map { key, value: val } => {
                let Value::Map(pairs) = value else {
                    return Err(self.invalid(value));
                };
                for (k, v) in pairs {
                    if k.is_null() {
                        return Err(ValidationError::MapKey("null".into()));
                    }
                    key.validate(k)
                        .map_err(|e| ValidationError::MapKey(e.to_string()))?;
                    val.validate(v)?;
                }
                Ok(())
            }
            FieldKind::Ipv4 => validate_ip(value, |a| a.is_ipv4(), "IPv4"),
            FieldKind::Ipv6 => validate_ip(value, |_| true, "IPv6"),
            FieldKind::GenericIp { protocol, .. } => match protocol {
                IpProtocol::Both => validate_ip(value, |_| true, "IP"),
                IpProtocol::Ipv4 => validate_ip(value, |a| a.is_ipv4(), "IPv4"),
                IpProtocol::Ipv6 => validate_ip(value, |_| true, "IPv6")
            },
            _ => Ok(())
        }
    }

    fn validate_integer(
        &self,
        signed: bool,
        width: IntWidth,
        value: &Value
    ) -> Result<(), ValidationError> {
        let number = Integer::from_value(value).ok_or_else(|| self.invalid(value))?;
        let (min, max) = integer_bounds(signed, width);
        if number < min || number > max {
            return Err(ValidationError::OutOfRange {
                db_type: self.db_type(),
                value:   number.render(),
                min:     min.render(),
                max:     max.render()
            });
        }
        Ok(())
    }

    fn invalid(&self, value: &Value) -> ValidationError {
        ValidationError::InvalidType {
            db_type: self.db_type(),
            value:   value.to_string()
        }
    }
}

fn validate_ip(
    value: &Value,
    accept: impl Fn(&IpAddr) -> bool,
    protocol: &'static str
) -> Result<(), ValidationError> {
    let addr = match value {
        Value::Ipv4(v4) => Some(IpAddr::V4(*v4)),
        Value::Ipv6(v6) => Some(IpAddr::V6(*v6)),
        Value::String(s) => IpAddr::from_str(s).ok().map(|a| match a {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(a, IpAddr::V4),
            v4 => v4
        }),
        _ => None
    };
    match addr {
        Some(a) if accept(&a) => Ok(()),
        _ => Err(ValidationError::InvalidIp {
            value: value.to_string(),
            protocol
        })
    }
}
