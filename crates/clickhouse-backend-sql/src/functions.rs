// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! ClickHouse aggregates, window functions, date helpers, hashes and
//! conversions.
//!
//! Each constructor returns an [`Expr`]. Functions whose result type is fixed
//! declare it, so lookups on an annotation see the right column kind.
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_sql::{expr::Expr, functions};
//!
//! let visitors = functions::uniq(vec![Expr::Star]);
//! let hour = functions::to_start_of("Hour", Expr::field("ts")).unwrap();
//! # let _ = (visitors, hour);
//! ```

use clickhouse_backend_core::{
    Error, Result,
    types::{Field, FieldKind, IntWidth}
};

use crate::expr::{Expr, Func, FuncKind};

/// Aggregate functions.
pub const AGGREGATES: [&str; 20] = [
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "uniq",
    "uniqExact",
    "uniqCombined",
    "uniqCombined64",
    "uniqHLL12",
    "uniqTheta",
    "any",
    "anyLast",
    "argMin",
    "argMax",
    "groupArray",
    "stddevPop",
    "stddevSamp",
    "varPop",
    "varSamp"
];

/// Window-only functions.
pub const WINDOW_FUNCTIONS: [&str; 9] = [
    "row_number",
    "rank",
    "dense_rank",
    "lagInFrame",
    "leadInFrame",
    "first_value",
    "last_value",
    "nth_value",
    "ntile"
];

/// Units accepted by [`to_start_of`].
pub const START_OF_UNITS: [&str; 10] = [
    "Year",
    "Quarter",
    "Month",
    "Week",
    "Day",
    "Hour",
    "Minute",
    "FiveMinutes",
    "TenMinutes",
    "FifteenMinutes"
];

/// Units accepted by [`date_trunc`].
pub const DATE_TRUNC_UNITS: [&str; 8] = [
    "second", "minute", "hour", "day", "week", "month", "quarter", "year"
];

/// Hash functions.
pub const HASH_FUNCTIONS: [&str; 17] = [
    "cityHash64",
    "sipHash64",
    "sipHash128",
    "farmHash64",
    "xxHash32",
    "xxHash64",
    "murmurHash2_32",
    "murmurHash2_64",
    "murmurHash3_32",
    "murmurHash3_64",
    "murmurHash3_128",
    "halfMD5",
    "MD5",
    "SHA1",
    "SHA256",
    "javaHash",
    "hiveHash"
];

const UNIQ_FAMILY: [&str; 6] = [
    "uniq",
    "uniqExact",
    "uniqCombined",
    "uniqCombined64",
    "uniqHLL12",
    "uniqTheta"
];

fn uint(width: IntWidth) -> Field {
    Field::of(FieldKind::UInt(width))
}

fn int(width: IntWidth) -> Field {
    Field::of(FieldKind::Int(width))
}

/// Aggregate call by name.
///
/// # Errors
///
/// Returns [`Error::Field`] for names outside [`AGGREGATES`].
pub fn aggregate(name: &str, args: Vec<Expr>) -> Result<Expr> {
    if !AGGREGATES.contains(&name) {
        return Err(Error::field(format!("unknown aggregate function {name}")));
    }
    Ok(typed_aggregate(name, args))
}

fn typed_aggregate(name: &str, args: Vec<Expr>) -> Expr {
    let expr = Expr::aggregate(name, args);
    match name {
        "count" => expr.output(uint(IntWidth::W64)),
        n if UNIQ_FAMILY.contains(&n) => expr.output(uint(IntWidth::W64)),
        "avg" | "stddevPop" | "stddevSamp" | "varPop" | "varSamp" => {
            expr.output(Field::of(FieldKind::Float64))
        }
        _ => expr
    }
}

/// Window function call by name.
///
/// # Errors
///
/// Returns [`Error::Field`] for names outside [`WINDOW_FUNCTIONS`].
pub fn window_function(name: &str, args: Vec<Expr>) -> Result<Expr> {
    if !WINDOW_FUNCTIONS.contains(&name) {
        return Err(Error::field(format!("unknown window function {name}")));
    }
    let expr = Expr::Func(Func::new(name, FuncKind::Window, args));
    Ok(match name {
        "row_number" | "rank" | "dense_rank" | "ntile" => expr.output(uint(IntWidth::W64)),
        _ => expr
    })
}

macro_rules! aggregates {
    ($($(#[$meta:meta])* $fn_name:ident => $name:literal),* $(,)?) => {
        $(
            $(#[$meta])*
            #[must_use]
            pub fn $fn_name(args: Vec<Expr>) -> Expr {
                typed_aggregate($name, args)
            }
        )*
    };
}

aggregates! {
    /// `count(...)`.
    count => "count",
    /// `sum(x)`.
    sum => "sum",
    /// `avg(x)`.
    avg => "avg",
    /// `min(x)`.
    min => "min",
    /// `max(x)`.
    max => "max",
    /// `uniq(...)`, approximate distinct count.
    uniq => "uniq",
    /// `uniqExact(...)`.
    uniq_exact => "uniqExact",
    /// `uniqCombined(...)`.
    uniq_combined => "uniqCombined",
    /// `uniqCombined64(...)`.
    uniq_combined64 => "uniqCombined64",
    /// `uniqHLL12(...)`.
    uniq_hll12 => "uniqHLL12",
    /// `uniqTheta(...)`.
    uniq_theta => "uniqTheta",
    /// `any(x)`.
    any => "any",
    /// `anyLast(x)`.
    any_last => "anyLast",
    /// `argMin(arg, val)`.
    arg_min => "argMin",
    /// `argMax(arg, val)`.
    arg_max => "argMax",
    /// `groupArray(x)`.
    group_array => "groupArray",
}

/// `row_number()`.
#[must_use]
pub fn row_number() -> Expr {
    Expr::Func(Func::new("row_number", FuncKind::Window, Vec::new())).output(uint(IntWidth::W64))
}

/// `rank()`.
#[must_use]
pub fn rank() -> Expr {
    Expr::Func(Func::new("rank", FuncKind::Window, Vec::new())).output(uint(IntWidth::W64))
}

/// `dense_rank()`.
#[must_use]
pub fn dense_rank() -> Expr {
    Expr::Func(Func::new("dense_rank", FuncKind::Window, Vec::new())).output(uint(IntWidth::W64))
}

fn shift(name: &str, expr: Expr, offset: Option<u64>, default: Option<Expr>) -> Expr {
    let mut args = vec![expr];
    if let Some(offset) = offset {
        args.push(Expr::literal(offset));
    }
    if let Some(default) = default {
        if args.len() == 1 {
            args.push(Expr::literal(1_u64));
        }
        args.push(default);
    }
    Expr::Func(Func::new(name, FuncKind::Window, args))
}

/// `lagInFrame(x[, offset[, default]])`.
#[must_use]
pub fn lag_in_frame(expr: Expr, offset: Option<u64>, default: Option<Expr>) -> Expr {
    shift("lagInFrame", expr, offset, default)
}

/// `leadInFrame(x[, offset[, default]])`.
#[must_use]
pub fn lead_in_frame(expr: Expr, offset: Option<u64>, default: Option<Expr>) -> Expr {
    shift("leadInFrame", expr, offset, default)
}

fn with_timezone(mut args: Vec<Expr>, timezone: Option<&str>) -> Vec<Expr> {
    if let Some(tz) = timezone {
        args.push(Expr::literal(tz));
    }
    args
}

/// `toStartOf<Unit>(x)`.
///
/// # Errors
///
/// Returns [`Error::Field`] for units outside [`START_OF_UNITS`].
pub fn to_start_of(unit: &str, expr: Expr) -> Result<Expr> {
    if !START_OF_UNITS.contains(&unit) {
        return Err(Error::field(format!("unknown toStartOf unit {unit}")));
    }
    Ok(Expr::func(format!("toStartOf{unit}"), vec![expr]))
}

/// `date_trunc('unit', x[, 'tz'])`.
///
/// # Errors
///
/// Returns [`Error::Field`] for units outside [`DATE_TRUNC_UNITS`].
pub fn date_trunc(unit: &str, expr: Expr, timezone: Option<&str>) -> Result<Expr> {
    if !DATE_TRUNC_UNITS.contains(&unit) {
        return Err(Error::field(format!("unknown date_trunc unit {unit}")));
    }
    Ok(Expr::func(
        "date_trunc",
        with_timezone(vec![Expr::literal(unit), expr], timezone)
    ))
}

/// `toYYYYMM(x[, 'tz'])`.
#[must_use]
pub fn to_yyyymm(expr: Expr, timezone: Option<&str>) -> Expr {
    Expr::func("toYYYYMM", with_timezone(vec![expr], timezone)).output(uint(IntWidth::W32))
}

/// `toYYYYMMDD(x[, 'tz'])`.
#[must_use]
pub fn to_yyyymmdd(expr: Expr, timezone: Option<&str>) -> Expr {
    Expr::func("toYYYYMMDD", with_timezone(vec![expr], timezone)).output(uint(IntWidth::W32))
}

/// `toYYYYMMDDhhmmss(x[, 'tz'])`.
#[must_use]
pub fn to_yyyymmddhhmmss(expr: Expr, timezone: Option<&str>) -> Expr {
    Expr::func("toYYYYMMDDhhmmss", with_timezone(vec![expr], timezone))
        .output(uint(IntWidth::W64))
}

/// Hash call by name.
///
/// # Errors
///
/// Returns [`Error::Field`] for names outside [`HASH_FUNCTIONS`].
pub fn hash(name: &str, args: Vec<Expr>) -> Result<Expr> {
    if !HASH_FUNCTIONS.contains(&name) {
        return Err(Error::field(format!("unknown hash function {name}")));
    }
    let output = match name {
        "xxHash32" | "murmurHash2_32" | "murmurHash3_32" => uint(IntWidth::W32),
        "javaHash" | "hiveHash" => int(IntWidth::W32),
        "sipHash128" | "murmurHash3_128" | "MD5" => {
            Field::of(FieldKind::FixedString { max_bytes: 16 })
        }
        "SHA1" => Field::of(FieldKind::FixedString { max_bytes: 20 }),
        "SHA256" => Field::of(FieldKind::FixedString { max_bytes: 32 }),
        _ => uint(IntWidth::W64)
    };
    Ok(Expr::func(name, args).output(output))
}

/// `rand()`.
#[must_use]
pub fn rand() -> Expr {
    Expr::func("rand", Vec::new()).output(uint(IntWidth::W32))
}

/// `rand64()`.
#[must_use]
pub fn rand64() -> Expr {
    Expr::func("rand64", Vec::new()).output(uint(IntWidth::W64))
}

/// `toString(x)`.
#[must_use]
pub fn to_string(expr: Expr) -> Expr {
    Expr::func("toString", vec![expr]).output(Field::of(FieldKind::String))
}

/// `toInt<N>(x)`.
///
/// # Errors
///
/// Returns [`Error::Field`] for widths that are not a ClickHouse integer width.
pub fn to_int(bits: u32, expr: Expr) -> Result<Expr> {
    let width = IntWidth::from_bits(bits)
        .ok_or_else(|| Error::field(format!("unsupported integer width {bits}")))?;
    Ok(Expr::func(format!("toInt{bits}"), vec![expr]).output(int(width)))
}

/// `toUInt<N>(x)`.
///
/// # Errors
///
/// Returns [`Error::Field`] for widths that are not a ClickHouse integer width.
pub fn to_uint(bits: u32, expr: Expr) -> Result<Expr> {
    let width = IntWidth::from_bits(bits)
        .ok_or_else(|| Error::field(format!("unsupported integer width {bits}")))?;
    Ok(Expr::func(format!("toUInt{bits}"), vec![expr]).output(uint(width)))
}

/// `toFloat32(x)` or `toFloat64(x)`.
///
/// # Errors
///
/// Returns [`Error::Field`] for widths other than 32 and 64.
pub fn to_float(bits: u32, expr: Expr) -> Result<Expr> {
    let kind = match bits {
        32 => FieldKind::Float32,
        64 => FieldKind::Float64,
        _ => return Err(Error::field(format!("unsupported float width {bits}")))
    };
    Ok(Expr::func(format!("toFloat{bits}"), vec![expr]).output(Field::of(kind)))
}

/// `toDate(x)`.
#[must_use]
pub fn to_date(expr: Expr) -> Expr {
    Expr::func("toDate", vec![expr]).output(Field::of(FieldKind::Date))
}

/// `toDateTime(x[, 'tz'])`.
#[must_use]
pub fn to_datetime(expr: Expr, timezone: Option<&str>) -> Expr {
    Expr::func("toDateTime", with_timezone(vec![expr], timezone)).output(Field::of(
        FieldKind::DateTime {
            timezone: timezone.map(str::to_owned)
        }
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(expr: &Expr) -> &Func {
        match expr {
            Expr::Func(f) => f,
            other => panic!("expected a function, got {other:?}")
        }
    }

    #[test]
    fn aggregate_names_are_checked() {
        assert!(aggregate("uniqHLL12", vec![Expr::Star]).is_ok());
        assert!(aggregate("median_of_medians", vec![]).unwrap_err().is_dialect());
    }

    #[test]
    fn uniq_counts_are_unsigned() {
        let e = uniq(vec![Expr::Star]);
        let f = func(&e);
        assert!(f.is_aggregate());
        assert_eq!(f.output.as_ref().map(Field::db_type).as_deref(), Some("UInt64"));
    }

    #[test]
    fn lag_fills_offset_before_default() {
        let e = lag_in_frame(Expr::field("v"), None, Some(Expr::literal(0)));
        assert_eq!(func(&e).args.len(), 3);
        assert_eq!(func(&e).kind, FuncKind::Window);
    }

    #[test]
    fn date_helpers() {
        let e = to_start_of("FiveMinutes", Expr::field("t")).unwrap();
        assert_eq!(func(&e).name, "toStartOfFiveMinutes");
        assert!(to_start_of("Fortnight", Expr::field("t")).is_err());
        assert!(date_trunc("decade", Expr::field("t"), None).is_err());
        let e = to_yyyymmdd(Expr::field("t"), Some("UTC"));
        assert_eq!(func(&e).args.len(), 2);
    }

    #[test]
    fn hashes_and_conversions() {
        let e = hash("SHA256", vec![Expr::field("s")]).unwrap();
        assert_eq!(
            func(&e).output.as_ref().map(Field::db_type).as_deref(),
            Some("FixedString(32)")
        );
        assert!(hash("crc64", vec![]).is_err());
        assert!(to_int(24, Expr::field("x")).is_err());
        assert_eq!(func(&to_uint(8, Expr::field("x")).unwrap()).name, "toUInt8");
        assert!(to_float(16, Expr::field("x")).is_err());
    }
}
