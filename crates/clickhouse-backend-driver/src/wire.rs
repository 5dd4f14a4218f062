// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Settings block of the native `QUERY` packet.
//!
//! Settings are serialized as strings: each entry is the name, a flags
//! varint and the value, all length-prefixed with LEB128 varints, and the
//! block ends with an empty name.
//!
//! Query parameters (`{name:Type}` placeholders evaluated by the server)
//! travel in the same block with the [`CUSTOM`] flag. Their value is the
//! parameter text dumped as a quoted string field, which is how the server
//! expects custom settings.
//!
//! | Entry | Flags | Value |
//! |-------|-------|-------|
//! | setting `max_threads = 4` | `0` | `4` |
//! | setting `use_uncompressed_cache = true` | `0` | `1` |
//! | parameter `name = "it's"` | [`CUSTOM`] | `'it\'s'` |
//! | parameter `ids = [1, 2]` | [`CUSTOM`] | `'[1, 2]'` |

use bytes::{Buf, BufMut, Bytes, BytesMut};
use clickhouse_backend_core::{
    Error, Result, Value,
    escape::{escape_value, quote_string},
    ident::is_identifier
};
use indexmap::IndexMap;

/// Setting must be honored by the server.
pub const IMPORTANT: u64 = 0x01;

/// Custom setting; used for query parameters.
pub const CUSTOM: u64 = 0x02;

const MAX_VARINT_BYTES: usize = 10;

/// One decoded settings entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    /// Setting or parameter name.
    pub name:  String,
    /// Flag bits.
    pub flags: u64,
    /// Value as sent.
    pub value: String
}

impl Setting {
    /// Check if the entry carries a query parameter.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        self.flags & CUSTOM != 0
    }
}

/// Encode `settings` followed by `parameters` into a settings block.
///
/// # Errors
///
/// Returns [`Error::Config`] for names that are not identifiers and for
/// setting values that are not scalars.
pub fn encode_settings(
    settings: &IndexMap<String, Value>,
    parameters: &IndexMap<String, Value>
) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    for (name, value) in settings {
        check_name(name)?;
        put_str(&mut buf, name);
        put_varint(&mut buf, 0);
        put_str(&mut buf, &setting_text(name, value)?);
    }
    for (name, value) in parameters {
        check_name(name)?;
        put_str(&mut buf, name);
        put_varint(&mut buf, CUSTOM);
        put_str(&mut buf, &quote_string(&parameter_text(value)));
    }
    put_str(&mut buf, "");
    Ok(buf.freeze())
}

/// Decode a settings block, consuming it from `buf`.
///
/// # Errors
///
/// Returns [`Error::Interface`] for a truncated block, an oversized varint
/// or text that is not UTF-8.
pub fn decode_settings(buf: &mut impl Buf) -> Result<Vec<Setting>> {
    let mut out = Vec::new();
    loop {
        let name = get_str(buf)?;
        if name.is_empty() {
            return Ok(out);
        }
        let flags = get_varint(buf)?;
        let value = get_str(buf)?;
        out.push(Setting { name, flags, value });
    }
}

/// Text of a query parameter as the server parses it for `{name:Type}`.
///
/// Strings go raw, temporal and network values in their canonical text
/// form, composites as literals.
#[must_use]
pub fn parameter_text(value: &Value) -> String {
    match value {
        Value::Null => "\\N".to_owned(),
        Value::String(s) => s.clone(),
        Value::Uuid(v) => v.to_string(),
        Value::Date(v) => v.format("%Y-%m-%d").to_string(),
        Value::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        Value::DateTimeTz(v) => v
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string(),
        Value::Ipv4(v) => v.to_string(),
        Value::Ipv6(v) => v.to_string(),
        Value::Json(v) => v.to_string(),
        other => escape_value(other)
    }
}

fn setting_text(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::Bool(b) => Ok(u8::from(*b).to_string()),
        Value::Int(v) => Ok(v.to_string()),
        Value::UInt(v) => Ok(v.to_string()),
        Value::Float(v) => Ok(v.to_string()),
        Value::Decimal(v) => Ok(v.to_string()),
        Value::String(v) => Ok(v.clone()),
        other => Err(Error::config(format!(
            "setting {name} must be a scalar, got {}",
            other.type_name()
        )))
    }
}

fn check_name(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::config(format!("invalid setting name {name:?}")))
    }
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn put_str(buf: &mut BytesMut, text: &str) {
    put_varint(buf, text.len() as u64);
    buf.put_slice(text.as_bytes());
}

fn get_varint(buf: &mut impl Buf) -> Result<u64> {
    let mut value = 0_u64;
    for i in 0..MAX_VARINT_BYTES {
        if !buf.has_remaining() {
            return Err(Error::interface("truncated settings block"));
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::interface("varint longer than 10 bytes"))
}

fn get_str(buf: &mut impl Buf) -> Result<String> {
    let len = usize::try_from(get_varint(buf)?)
        .map_err(|_| Error::interface("string length overflows usize"))?;
    if buf.remaining() < len {
        return Err(Error::interface("truncated settings block"));
    }
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::interface(format!("setting is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use chrono::NaiveDate;

    use super::*;

    fn block(settings: &[(&str, Value)], parameters: &[(&str, Value)]) -> Bytes {
        let settings = settings
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        let parameters = parameters
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        encode_settings(&settings, &parameters).unwrap()
    }

    #[test]
    fn layout() {
        let bytes = block(&[("max_threads", Value::from(4))], &[]);
        assert_eq!(
            bytes.as_ref(),
            b"\x0bmax_threads\x00\x014\x00".as_slice()
        );
    }

    #[test]
    fn parameters_are_custom_and_quoted() {
        let mut bytes = block(
            &[("final", Value::Bool(true))],
            &[
                ("name", Value::from("it's")),
                ("ids", Value::from(vec![1_i32, 2])),
                ("ip", Value::from(Ipv4Addr::new(10, 0, 0, 1))),
                ("day", Value::from(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()))
            ]
        );
        let decoded = decode_settings(&mut bytes).unwrap();
        assert!(!bytes.has_remaining());
        assert_eq!(decoded[0].value, "1");
        assert!(!decoded[0].is_custom());
        let custom: Vec<(&str, &str)> = decoded[1..]
            .iter()
            .inspect(|s| assert!(s.is_custom()))
            .map(|s| (s.name.as_str(), s.value.as_str()))
            .collect();
        assert_eq!(
            custom,
            vec![
                ("name", r"'it\'s'"),
                ("ids", "'[1, 2]'"),
                ("ip", "'10.0.0.1'"),
                ("day", "'2024-05-06'")
            ]
        );
    }

    #[test]
    fn long_values_use_multibyte_lengths() {
        let text = "x".repeat(300);
        let mut bytes = block(&[("log_comment", Value::from(text.clone()))], &[]);
        let decoded = decode_settings(&mut bytes).unwrap();
        assert_eq!(decoded[0].value, text);
    }

    #[test]
    fn rejects_bad_input() {
        let mut settings = IndexMap::new();
        settings.insert("bad name".to_owned(), Value::from(1));
        assert!(encode_settings(&settings, &IndexMap::new()).unwrap_err().is_config());

        let mut settings = IndexMap::new();
        settings.insert("x".to_owned(), Value::from(vec![1_i32]));
        assert!(encode_settings(&settings, &IndexMap::new()).is_err());

        let mut truncated = Bytes::from_static(b"\x05ab");
        assert!(decode_settings(&mut truncated).is_err());
        let mut endless = Bytes::from_static(&[0xff; 12]);
        assert!(decode_settings(&mut endless).is_err());
    }
}
