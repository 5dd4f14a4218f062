// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Conversion between host values and driver values.
//!
//! | Kind | `prep_value` output | `from_db` output |
//! |------|---------------------|------------------|
//! | integers | `Int`/`UInt`/`BigInt` | unchanged |
//! | `DateTime`, `DateTime64` | UTC `DateTimeTz`, truncated to the column precision | UTC `DateTimeTz` |
//! | `IPv4`, `IPv6`, generic IP | canonical text | canonical text |
//! | `Enum` | number or name as given | number when `return_int`, else name |
//! | `Tuple` | `Tuple` | `NamedTuple` for named tuples |
//! | `Array`, `Map` | element-wise | element-wise |

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr
};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{Field, FieldKind, IpProtocol};
use crate::{Error, Result, ValidationError, Value};

impl Field {
    /// Coerce a host value toward the form the driver sends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the value cannot represent the
    /// column type at all.
    pub fn prep_value(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match &self.kind {
            FieldKind::Int(_) | FieldKind::UInt(_) => prep_integer(self, value),
            FieldKind::Float32 | FieldKind::Float64 => prep_float(self, value),
            FieldKind::Decimal { .. } => prep_decimal(self, value),
            FieldKind::Bool => prep_bool(self, value),
            FieldKind::String | FieldKind::FixedString { .. } => match value {
                Value::String(_) | Value::Bytes(_) => Ok(value.clone()),
                other => scalar_text(other)
                    .map(Value::String)
                    .ok_or_else(|| invalid(self, value))
            },
            FieldKind::Uuid => match value {
                Value::Uuid(_) => Ok(value.clone()),
                Value::String(s) => Uuid::parse_str(s)
                    .map(Value::Uuid)
                    .map_err(|_| invalid(self, value)),
                Value::Bytes(b) => Uuid::from_slice(b)
                    .map(Value::Uuid)
                    .map_err(|_| invalid(self, value)),
                _ => Err(invalid(self, value))
            },
            FieldKind::Date | FieldKind::Date32 => prep_date(self, value),
            FieldKind::DateTime { timezone } => prep_datetime(self, value, timezone.as_deref(), 0),
            FieldKind::DateTime64 {
                precision,
                timezone
            } => prep_datetime(self, value, timezone.as_deref(), *precision),
            FieldKind::Enum { .. } => match value {
                Value::Int(_) | Value::UInt(_) | Value::String(_) => Ok(value.clone()),
                Value::Bytes(b) => String::from_utf8(b.clone())
                    .map(Value::String)
                    .map_err(|_| invalid(self, value)),
                _ => Err(invalid(self, value))
            },
            FieldKind::Array(inner) => match value {
                Value::Array(items) | Value::Tuple(items) => Ok(Value::Array(
                    items
                        .iter()
                        .map(|v| inner.prep_value(v))
                        .collect::<Result<_>>()?
                )),
                _ => Err(invalid(self, value))
            },
            FieldKind::Tuple(elements) => {
                let items = value.elements().ok_or_else(|| invalid(self, value))?;
                if items.len() != elements.len() {
                    return Err(ValidationError::TupleLength {
                        expected: elements.len(),
                        got:      items.len()
                    }
                    .into());
                }
                Ok(Value::Tuple(
                    elements
                        .iter()
                        .zip(items)
                        .map(|(e, v)| e.field.prep_value(v))
                        .collect::<Result<_>>()?
                ))
            }
            FieldKind::Map { key, value: val } => match value {
                Value::Map(pairs) => Ok(Value::Map(
                    pairs
                        .iter()
                        .map(|(k, v)| Ok((key.prep_value(k)?, val.prep_value(v)?)))
                        .collect::<Result<_>>()?
                )),
                _ => Err(invalid(self, value))
            },
            FieldKind::Ipv4 => {
                let addr = parse_ip(value).ok_or_else(|| invalid_ip(value, "IPv4"))?;
                match addr {
                    IpAddr::V4(v4) => Ok(Value::String(v4.to_string())),
                    IpAddr::V6(v6) => v6
                        .to_ipv4_mapped()
                        .map(|v4| Value::String(v4.to_string()))
                        .ok_or_else(|| invalid_ip(value, "IPv4").into())
                }
            }
            FieldKind::Ipv6 => {
                let addr = parse_ip(value).ok_or_else(|| invalid_ip(value, "IPv6"))?;
                Ok(Value::String(to_ipv6(addr).to_string()))
            }
            FieldKind::GenericIp {
                protocol,
                unpack_ipv4
            } => {
                let addr = parse_ip(value).ok_or_else(|| invalid_ip(value, "IP"))?;
                generic_ip_text(addr, *protocol, *unpack_ipv4)
                    .map(Value::String)
                    .ok_or_else(|| invalid_ip(value, protocol_name(*protocol)).into())
            }
            FieldKind::Json => Ok(value.clone())
        }
    }

    /// Convert a value returned by the driver into its host form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the driver value does not match the
    /// column type.
    pub fn from_db(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match &self.kind {
            FieldKind::Bool => match value {
                Value::Int(v) => Ok(Value::Bool(v != 0)),
                Value::UInt(v) => Ok(Value::Bool(v != 0)),
                other => Ok(other)
            },
            FieldKind::Uuid => match value {
                Value::String(s) => Uuid::parse_str(&s)
                    .map(Value::Uuid)
                    .map_err(|_| invalid(self, &Value::String(s))),
                other => Ok(other)
            },
            FieldKind::Decimal { .. } => match value {
                Value::String(s) => Decimal::from_str(&s)
                    .map(Value::Decimal)
                    .map_err(|_| invalid(self, &Value::String(s))),
                other => Ok(other)
            },
            FieldKind::Date | FieldKind::Date32 => match value {
                Value::DateTime(dt) => Ok(Value::Date(dt.date())),
                Value::DateTimeTz(dt) => Ok(Value::Date(dt.date_naive())),
                other => Ok(other)
            },
            FieldKind::DateTime { .. } | FieldKind::DateTime64 { .. } => match value {
                Value::DateTime(dt) => Ok(Value::DateTimeTz(utc(Utc.from_utc_datetime(&dt)))),
                Value::DateTimeTz(dt) => Ok(Value::DateTimeTz(utc(dt.with_timezone(&Utc)))),
                other => Ok(other)
            },
            FieldKind::Enum {
                choices,
                return_int,
                ..
            } => {
                let value = match value {
                    Value::Bytes(b) => Value::String(String::from_utf8_lossy(&b).into_owned()),
                    other => other
                };
                if *return_int {
                    if let Value::String(name) = &value {
                        return choices
                            .iter()
                            .find(|c| &c.name == name)
                            .map(|c| Value::Int(i128::from(c.value)))
                            .ok_or_else(|| choice_error(&value));
                    }
                } else if let Some(number) = value.as_i128() {
                    return choices
                        .iter()
                        .find(|c| i128::from(c.value) == number)
                        .map(|c| Value::String(c.name.clone()))
                        .ok_or_else(|| choice_error(&value));
                }
                Ok(value)
            }
            FieldKind::Array(inner) => match value {
                Value::Array(items) | Value::Tuple(items) => Ok(Value::Array(
                    items
                        .into_iter()
                        .map(|v| inner.from_db(v))
                        .collect::<Result<_>>()?
                )),
                other => Err(invalid(self, &other))
            },
            FieldKind::Tuple(elements) => {
                let items: Vec<Value> = match value {
                    Value::Tuple(items) | Value::Array(items) => items,
                    Value::NamedTuple(items) => items.into_iter().map(|(_, v)| v).collect(),
                    other => return Err(invalid(self, &other))
                };
                if items.len() != elements.len() {
                    return Err(ValidationError::TupleLength {
                        expected: elements.len(),
                        got:      items.len()
                    }
                    .into());
                }
                let named = elements.iter().all(|e| e.name.is_some());
                let mut converted = Vec::with_capacity(items.len());
                for (element, item) in elements.iter().zip(items) {
                    converted.push((
                        element.name.clone().unwrap_or_default(),
                        element.field.from_db(item)?
                    ));
                }
                if named {
                    Ok(Value::NamedTuple(converted))
                } else {
                    Ok(Value::Tuple(converted.into_iter().map(|(_, v)| v).collect()))
                }
            }
            FieldKind::Map { key, value: val } => match value {
                Value::Map(pairs) => Ok(Value::Map(
                    pairs
                        .into_iter()
                        .map(|(k, v)| Ok((key.from_db(k)?, val.from_db(v)?)))
                        .collect::<Result<_>>()?
                )),
                other => Err(invalid(self, &other))
            },
            FieldKind::Ipv4 => match parse_ip(&value) {
                Some(IpAddr::V4(v4)) => Ok(Value::String(v4.to_string())),
                Some(IpAddr::V6(v6)) => v6
                    .to_ipv4_mapped()
                    .map(|v4| Value::String(v4.to_string()))
                    .ok_or_else(|| invalid(self, &value)),
                None => Err(invalid(self, &value))
            },
            FieldKind::Ipv6 => parse_ip(&value)
                .map(|addr| Value::String(to_ipv6(addr).to_string()))
                .ok_or_else(|| invalid(self, &value)),
            FieldKind::GenericIp {
                protocol,
                unpack_ipv4
            } => parse_ip(&value)
                .and_then(|addr| generic_ip_text(addr, *protocol, *unpack_ipv4))
                .map(Value::String)
                .ok_or_else(|| invalid(self, &value)),
            _ => Ok(value)
        }
    }

    /// [`prep_value`](Self::prep_value) followed by
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when either step rejects the value.
    pub fn clean(&self, value: &Value) -> Result<Value> {
        let prepared = self.prep_value(value)?;
        self.validate(&prepared)?;
        Ok(prepared)
    }
}

fn invalid(field: &Field, value: &Value) -> Error {
    ValidationError::InvalidType {
        db_type: field.db_type(),
        value:   value.to_string()
    }
    .into()
}

fn invalid_ip(value: &Value, protocol: &'static str) -> ValidationError {
    ValidationError::InvalidIp {
        value: value.to_string(),
        protocol
    }
}

fn choice_error(value: &Value) -> Error {
    ValidationError::InvalidChoice {
        value: value.to_string()
    }
    .into()
}

const fn protocol_name(protocol: IpProtocol) -> &'static str {
    match protocol {
        IpProtocol::Both => "IP",
        IpProtocol::Ipv4 => "IPv4",
        IpProtocol::Ipv6 => "IPv6"
    }
}

fn utc(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.fixed_offset()
}

/// Plain text of a scalar, without quoting.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(v) => Some(v.to_string()),
        Value::Int(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        Value::BigInt(v) | Value::String(v) => Some(v.clone()),
        Value::Float(v) => Some(v.to_string()),
        Value::Decimal(v) => Some(v.to_string()),
        Value::Uuid(v) => Some(v.to_string()),
        Value::Date(v) => Some(v.to_string()),
        Value::DateTime(v) => Some(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::DateTimeTz(v) => Some(v.to_rfc3339()),
        Value::Ipv4(v) => Some(v.to_string()),
        Value::Ipv6(v) => Some(v.to_string()),
        _ => None
    }
}

fn prep_integer(field: &Field, value: &Value) -> Result<Value> {
    match value {
        Value::Int(_) | Value::UInt(_) => Ok(value.clone()),
        Value::BigInt(s) => Ok(parse_integer(s).unwrap_or_else(|| value.clone())),
        Value::Bool(b) => Ok(Value::Int(i128::from(*b))),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            format!("{f:.0}").parse::<i128>().map(Value::Int).map_err(|_| invalid(field, value))
        }
        Value::Decimal(d) if d.fract().is_zero() => parse_integer(&d.trunc().to_string())
            .ok_or_else(|| invalid(field, value)),
        Value::String(s) => parse_integer(s.trim()).ok_or_else(|| invalid(field, value)),
        _ => Err(invalid(field, value))
    }
}

fn parse_integer(text: &str) -> Option<Value> {
    if let Ok(v) = text.parse::<i128>() {
        return Some(Value::Int(v));
    }
    if let Ok(v) = text.parse::<u128>() {
        return Some(Value::UInt(v));
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Some(Value::BigInt(text.to_owned()));
    }
    None
}

fn prep_float(field: &Field, value: &Value) -> Result<Value> {
    match value {
        Value::Float(_) => Ok(value.clone()),
        Value::Int(v) => Ok(Value::Float(*v as f64)),
        Value::UInt(v) => Ok(Value::Float(*v as f64)),
        Value::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid(field, value)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid(field, value)),
        _ => Err(invalid(field, value))
    }
}

fn prep_decimal(field: &Field, value: &Value) -> Result<Value> {
    match value {
        Value::Decimal(_) => Ok(value.clone()),
        Value::Int(v) => Decimal::try_from_i128_with_scale(*v, 0)
            .map(Value::Decimal)
            .map_err(|_| invalid(field, value)),
        Value::UInt(v) => i128::try_from(*v)
            .ok()
            .and_then(|v| Decimal::try_from_i128_with_scale(v, 0).ok())
            .map(Value::Decimal)
            .ok_or_else(|| invalid(field, value)),
        Value::Float(f) => Decimal::try_from(*f)
            .map(Value::Decimal)
            .map_err(|_| invalid(field, value)),
        Value::String(s) => Decimal::from_str(s.trim())
            .map(Value::Decimal)
            .map_err(|_| invalid(field, value)),
        _ => Err(invalid(field, value))
    }
}

fn prep_bool(field: &Field, value: &Value) -> Result<Value> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Int(0) | Value::UInt(0) => Ok(Value::Bool(false)),
        Value::Int(1) | Value::UInt(1) => Ok(Value::Bool(true)),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "t" => Ok(Value::Bool(true)),
            "false" | "0" | "f" => Ok(Value::Bool(false)),
            _ => Err(invalid(field, value))
        },
        _ => Err(invalid(field, value))
    }
}

fn prep_date(field: &Field, value: &Value) -> Result<Value> {
    match value {
        Value::Date(_) => Ok(value.clone()),
        Value::DateTime(dt) => Ok(Value::Date(dt.date())),
        Value::DateTimeTz(dt) => Ok(Value::Date(dt.date_naive())),
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| invalid(field, value)),
        _ => Err(invalid(field, value))
    }
}

fn prep_datetime(
    field: &Field,
    value: &Value,
    timezone: Option<&str>,
    precision: u8
) -> Result<Value> {
    let instant = match value {
        Value::Int(_) | Value::UInt(_) | Value::Float(_) => return Ok(value.clone()),
        Value::DateTimeTz(dt) => dt.with_timezone(&Utc),
        Value::DateTime(naive) => localize(field, *naive, timezone)?,
        Value::Date(date) => localize(field, date.and_time(chrono::NaiveTime::MIN), timezone)?,
        Value::String(s) => match parse_datetime_text(s.trim()) {
            Some(Parsed::Aware(dt)) => dt.with_timezone(&Utc),
            Some(Parsed::Naive(naive)) => localize(field, naive, timezone)?,
            None => return Err(invalid(field, value))
        },
        _ => return Err(invalid(field, value))
    };
    Ok(Value::DateTimeTz(utc(truncate_subsec(instant, precision))))
}

enum Parsed {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime)
}

fn parse_datetime_text(text: &str) -> Option<Parsed> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Parsed::Aware(dt));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Parsed::Naive(naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| Parsed::Naive(d.and_time(chrono::NaiveTime::MIN)))
}

/// Interpret a naive datetime in the column timezone, UTC when unset.
fn localize(field: &Field, naive: NaiveDateTime, timezone: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(name) = timezone else {
        return Ok(Utc.from_utc_datetime(&naive));
    };
    let tz = Tz::from_str(name)
        .map_err(|_| Error::config(format!("{}: unknown timezone {name}", field.name)))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| invalid(field, &Value::DateTime(naive)))
}

fn truncate_subsec(dt: DateTime<Utc>, precision: u8) -> DateTime<Utc> {
    let step = 10_u32.pow(9 - u32::from(precision.min(9)));
    let nanos = dt.nanosecond() % 1_000_000_000;
    dt.with_nanosecond(nanos - nanos % step).unwrap_or(dt)
}

fn parse_ip(value: &Value) -> Option<IpAddr> {
    match value {
        Value::Ipv4(v4) => Some(IpAddr::V4(*v4)),
        Value::Ipv6(v6) => Some(IpAddr::V6(*v6)),
        Value::String(s) => IpAddr::from_str(s.trim()).ok(),
        Value::UInt(n) => u32::try_from(*n).ok().map(|n| IpAddr::V4(Ipv4Addr::from(n))),
        Value::Int(n) => u32::try_from(*n).ok().map(|n| IpAddr::V4(Ipv4Addr::from(n))),
        _ => None
    }
}

fn to_ipv6(addr: IpAddr) -> Ipv6Addr {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6
    }
}

/// Canonical text of an address stored in a generic IP column.
///
/// IPv4 and IPv4-mapped addresses come back as IPv4 when the protocol is
/// `ipv4` or `unpack_ipv4` is set, as `::ffff:a.b.c.d` otherwise.
pub(crate) fn generic_ip_text(addr: IpAddr, protocol: IpProtocol, unpack_ipv4: bool) -> Option<String> {
    let v4 = match addr {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped()
    };
    match (protocol, v4) {
        (IpProtocol::Ipv4, Some(v4)) => Some(v4.to_string()),
        (IpProtocol::Ipv4, None) => None,
        (IpProtocol::Ipv6, _) if matches!(addr, IpAddr::V4(_)) => None,
        (_, Some(v4)) if unpack_ipv4 => Some(v4.to_string()),
        _ => Some(to_ipv6(addr).to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::types::{EnumWidth, IntWidth};

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn datetime64_converts_naive_from_column_timezone_to_utc() {
        let f = Field::datetime64("ts", 3, Some("Asia/Shanghai"));
        let v = f
            .prep_value(&Value::DateTime(naive("2024-01-02 08:00:00.123456")))
            .unwrap();
        let Value::DateTimeTz(dt) = v else {
            panic!("expected aware datetime");
        };
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.naive_utc(), naive("2024-01-02 00:00:00.123"));
    }

    #[test]
    fn datetime_truncates_to_seconds() {
        let f = Field::datetime("ts", None);
        let v = f.prep_value(&Value::from("2024-01-02 03:04:05.987")).unwrap();
        let Value::DateTimeTz(dt) = v else {
            panic!("expected aware datetime");
        };
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(3, 4, 5).unwrap());
    }

    #[test]
    fn numeric_timestamps_pass_through() {
        let f = Field::datetime64("ts", 6, None);
        assert_eq!(f.prep_value(&Value::Int(1_700_000_000)).unwrap(), Value::Int(1_700_000_000));
        assert_eq!(f.prep_value(&Value::Float(1.5)).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn aware_input_is_normalized_to_utc() {
        let f = Field::datetime64("ts", 6, None);
        let aware = DateTime::parse_from_rfc3339("2024-01-02T03:00:00+03:00").unwrap();
        let v = f.prep_value(&Value::DateTimeTz(aware)).unwrap();
        assert_eq!(v, Value::DateTimeTz(DateTime::parse_from_rfc3339("2024-01-02T00:00:00Z").unwrap()));
    }

    #[test]
    fn generic_ip_normalization() {
        let both = Field::generic_ip("ip");
        assert_eq!(both.prep_value(&Value::from("1.2.3.4")).unwrap(), Value::from("::ffff:1.2.3.4"));

        let unpack = Field::generic_ip("ip").unpack_ipv4();
        assert_eq!(unpack.prep_value(&Value::from("::ffff:1.2.3.4")).unwrap(), Value::from("1.2.3.4"));

        let v4 = Field::generic_ip("ip").protocol(IpProtocol::Ipv4);
        assert_eq!(v4.prep_value(&Value::from("::ffff:10.0.0.1")).unwrap(), Value::from("10.0.0.1"));
        assert!(v4.prep_value(&Value::from("2001:db8::1")).is_err());

        let v6 = Field::generic_ip("ip").protocol(IpProtocol::Ipv6);
        assert!(v6.prep_value(&Value::from("10.0.0.1")).is_err());
    }

    #[test]
    fn ip_from_db_returns_text() {
        let f = Field::ipv4("ip");
        assert_eq!(
            f.from_db(Value::Ipv4(Ipv4Addr::new(1, 2, 3, 4))).unwrap(),
            Value::from("1.2.3.4")
        );
        let g = Field::generic_ip("ip").unpack_ipv4();
        assert_eq!(
            g.from_db(Value::Ipv6(Ipv4Addr::new(1, 2, 3, 4).to_ipv6_mapped())).unwrap(),
            Value::from("1.2.3.4")
        );
        let v6 = Field::ipv6("ip");
        assert_eq!(v6.from_db(Value::Ipv6(Ipv6Addr::LOCALHOST)).unwrap(), Value::from("::1"));
    }

    #[test]
    fn named_tuple_from_db() {
        let f = Field::named_tuple("p", [("x", Field::int32("")), ("y", Field::string(""))]);
        let v = f.from_db(Value::Tuple(vec![Value::Int(1), Value::from("a")])).unwrap();
        assert_eq!(v.get(0), v.get_named("x"));
        assert_eq!(v.get_named("y"), Some(&Value::from("a")));
    }

    #[test]
    fn tuple_prep_checks_arity() {
        let f = Field::tuple("p", [Field::int32(""), Field::int32("")]);
        let err = f.prep_value(&Value::from(vec![1_i32, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::TupleLength {
                expected: 2,
                got:      3
            })
        ));
    }

    #[test]
    fn enum_from_db_honours_return_int() {
        let f = Field::enumeration("e", EnumWidth::Enum8, [("tcp", 1), ("udp", 2)]);
        assert_eq!(f.from_db(Value::from("udp")).unwrap(), Value::Int(2));
        let names = f.clone().return_names();
        assert_eq!(names.from_db(Value::from("udp")).unwrap(), Value::from("udp"));
        assert_eq!(names.from_db(Value::Int(1)).unwrap(), Value::from("tcp"));
        assert!(f.from_db(Value::from("icmp")).is_err());
    }

    #[test]
    fn integer_coercions() {
        let f = Field::int("n", IntWidth::W256);
        assert_eq!(f.prep_value(&Value::from("42")).unwrap(), Value::Int(42));
        assert_eq!(f.prep_value(&Value::Float(3.0)).unwrap(), Value::Int(3));
        assert!(f.prep_value(&Value::Float(3.5)).is_err());
        let huge = "1".repeat(60);
        assert_eq!(f.prep_value(&Value::from(huge.as_str())).unwrap(), Value::BigInt(huge));
    }

    #[test]
    fn prep_then_from_db_is_stable() {
        let fields = [
            (Field::ipv6("a"), Value::from("1.2.3.4")),
            (Field::datetime64("b", 6, Some("UTC")), Value::from("2024-05-06 07:08:09.123456")),
            (Field::array("c", Field::int32("")), Value::from(vec![1_i32, 2])),
            (
                Field::map("d", Field::string(""), Field::uuid("")),
                [("k", Value::Uuid(Uuid::nil()))].into_iter().collect()
            ),
            (Field::decimal("e", 10, 2), Value::from("12.50"))
        ];
        for (field, value) in fields {
            let prepared = field.prep_value(&value).unwrap();
            assert_eq!(field.from_db(prepared.clone()).unwrap(), prepared, "{}", field.name);
        }
    }
}
