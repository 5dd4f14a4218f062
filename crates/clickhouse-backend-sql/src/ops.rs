// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Dialect operations exposed to the ORM.
//!
//! # Lookup tables
//!
//! | Lookup | Parameter RHS | Expression RHS |
//! |--------|---------------|----------------|
//! | `exact` | `= %s` | `= x` |
//! | `iexact` | `ILIKE %s` | `ILIKE x` |
//! | `contains` | `LIKE %s` | `LIKE concat('%', x, '%')` |
//! | `icontains` | `ILIKE %s` | `ILIKE concat('%', x, '%')` |
//! | `startswith` | `LIKE %s` | `LIKE concat(x, '%')` |
//! | `endswith` | `LIKE %s` | `LIKE concat('%', x)` |
//! | `gt`, `gte`, `lt`, `lte` | `> %s` ... | `> x` ... |
//!
//! Percent signs in the templates are doubled: compiled statements always go
//! through parameter substitution.

use clickhouse_backend_core::types::FieldKind;
pub use clickhouse_backend_core::ident::{MAX_NAME_LENGTH, quote_name};

/// Vendor name.
pub const VENDOR: &str = "clickhouse";

/// Human readable vendor name.
pub const DISPLAY_NAME: &str = "ClickHouse";

/// Value used where the ORM needs "no limit".
pub const NO_LIMIT_VALUE: &str = "NULL";

/// Keyword that precedes bulk insert rows.
pub const BULK_INSERT_SQL: &str = "VALUES";

/// Lookups compared as text, subject to [`lookup_cast`].
pub const TEXT_LOOKUPS: [&str; 9] = [
    "iexact",
    "contains",
    "icontains",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "regex",
    "iregex"
];

/// Operator template for a lookup with a parameter on the right.
#[must_use]
pub fn operator(lookup: &str) -> Option<&'static str> {
    Some(match lookup {
        "exact" => "= %s",
        "iexact" | "icontains" | "istartswith" | "iendswith" => "ILIKE %s",
        "contains" | "startswith" | "endswith" => "LIKE %s",
        "gt" => "> %s",
        "gte" => ">= %s",
        "lt" => "< %s",
        "lte" => "<= %s",
        _ => return None
    })
}

/// Operator template for a pattern lookup with an expression on the right.
///
/// `{}` stands for the escaped right-hand side.
#[must_use]
pub fn pattern_op(lookup: &str) -> Option<&'static str> {
    Some(match lookup {
        "contains" => "LIKE concat('%%', {}, '%%')",
        "icontains" => "ILIKE concat('%%', {}, '%%')",
        "startswith" => "LIKE concat({}, '%%')",
        "istartswith" => "ILIKE concat({}, '%%')",
        "endswith" => "LIKE concat('%%', {})",
        "iendswith" => "ILIKE concat('%%', {})",
        _ => return None
    })
}

/// Cast applied to the left-hand side of a text lookup.
///
/// `{}` stands for the column expression.
#[must_use]
pub fn lookup_cast(lookup: &str, kind: &FieldKind) -> &'static str {
    if !TEXT_LOOKUPS.contains(&lookup) {
        return "{}";
    }
    match kind {
        FieldKind::Ipv4 => "IPv4NumToString({})",
        FieldKind::Ipv6 | FieldKind::GenericIp { .. } => {
            "replaceRegexpOne(IPv6NumToString({}),'^::ffff:','')"
        }
        k if k.is_string_like() => "{}",
        _ => "CAST({}, 'Nullable(String)')"
    }
}

/// Substitute `sql` for the first `{}` of `template`.
#[must_use]
pub fn apply_template(template: &str, sql: &str) -> String {
    template.replacen("{}", sql, 1)
}

/// Function extracting a date part, `None` for unknown parts.
///
/// | Part | Function |
/// |------|----------|
/// | `year`, `iso_year`, `quarter`, `month` | `toYear`, `toISOYear`, `toQuarter`, `toMonth` |
/// | `week` | `toISOWeek` |
/// | `day` | `toDayOfMonth` |
/// | `week_day` | `toDayOfWeek(x, 3)`, Sunday is 1 |
/// | `iso_week_day` | `toDayOfWeek(x)`, Monday is 1 |
/// | `hour`, `minute`, `second` | `toHour`, `toMinute`, `toSecond` |
#[must_use]
pub fn date_extract_sql(part: &str, expr: &str) -> Option<String> {
    let function = match part {
        "year" => "toYear",
        "iso_year" => "toISOYear",
        "quarter" => "toQuarter",
        "month" => "toMonth",
        "week" => "toISOWeek",
        "day" => "toDayOfMonth",
        "week_day" => return Some(format!("toDayOfWeek({expr}, 3)")),
        "iso_week_day" => "toDayOfWeek",
        "hour" => "toHour",
        "minute" => "toMinute",
        "second" => "toSecond",
        _ => return None
    };
    Some(format!("{function}({expr})"))
}

/// Statements emptying `tables`.
#[must_use]
pub fn sql_flush(tables: &[&str]) -> Vec<String> {
    tables
        .iter()
        .map(|t| format!("TRUNCATE TABLE IF EXISTS {}", quote_name(t)))
        .collect()
}

/// Capabilities of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseFeatures {
    /// Real transactions.
    pub supports_transactions:        bool,
    /// Savepoints.
    pub uses_savepoints:              bool,
    /// Enforced foreign keys.
    pub supports_foreign_keys:        bool,
    /// `UNIQUE` constraints.
    pub supports_unique_constraints:  bool,
    /// `CHECK` constraints.
    pub supports_table_check_constraints: bool,
    /// `RETURNING` after insert.
    pub can_return_columns_from_insert: bool,
    /// Native UUID column type.
    pub has_native_uuid_field:        bool,
    /// Native JSON column type.
    pub supports_json_field:          bool,
    /// `SELECT DISTINCT ON`.
    pub can_distinct_on_fields:       bool,
    /// Window expressions.
    pub supports_over_clause:         bool,
    /// `EXPLAIN`.
    pub supports_explaining_query_execution: bool
}

/// Capabilities of ClickHouse.
pub const FEATURES: DatabaseFeatures = DatabaseFeatures {
    supports_transactions:        false,
    uses_savepoints:              false,
    supports_foreign_keys:        false,
    supports_unique_constraints:  false,
    supports_table_check_constraints: true,
    can_return_columns_from_insert: false,
    has_native_uuid_field:        true,
    supports_json_field:          true,
    can_distinct_on_fields:       true,
    supports_over_clause:         true,
    supports_explaining_query_execution: true
};

#[cfg(test)]
mod tests {
    use clickhouse_backend_core::types::{IntWidth, IpProtocol};
    use test_case::test_case;

    use super::*;

    #[test_case("contains", FieldKind::Ipv4 => "IPv4NumToString({})")]
    #[test_case("icontains", FieldKind::GenericIp { protocol: IpProtocol::Both, unpack_ipv4: false } => "replaceRegexpOne(IPv6NumToString({}),'^::ffff:','')")]
    #[test_case("startswith", FieldKind::Int(IntWidth::W32) => "CAST({}, 'Nullable(String)')")]
    #[test_case("contains", FieldKind::String => "{}")]
    #[test_case("exact", FieldKind::Ipv4 => "{}")]
    fn casts(lookup: &str, kind: FieldKind) -> &'static str {
        lookup_cast(lookup, &kind)
    }

    #[test]
    fn templates() {
        assert_eq!(operator("gte"), Some(">= %s"));
        assert_eq!(operator("overlap"), None);
        assert_eq!(
            apply_template(pattern_op("istartswith").unwrap_or_default(), "x"),
            "ILIKE concat(x, '%%')"
        );
    }

    #[test]
    fn date_parts() {
        assert_eq!(date_extract_sql("week_day", "t").as_deref(), Some("toDayOfWeek(t, 3)"));
        assert_eq!(date_extract_sql("iso_week_day", "t").as_deref(), Some("toDayOfWeek(t)"));
        assert_eq!(date_extract_sql("fortnight", "t"), None);
    }

    #[test]
    fn flush() {
        assert_eq!(sql_flush(&["a"]), vec!["TRUNCATE TABLE IF EXISTS \"a\"".to_owned()]);
    }

    #[test]
    fn identity() {
        assert_eq!(VENDOR, "clickhouse");
        assert_eq!(MAX_NAME_LENGTH, 251);
        assert!(!FEATURES.supports_transactions);
    }
}
