// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Compiler integration tests.
//!
//! Run with: `cargo test -p clickhouse-backend-sql --test compile`

use std::sync::Arc;

use chrono::NaiveDate;
use clickhouse_backend_sql::{
    compiler::strip_qualifiers,
    introspection::{CreateTable, parse_type},
    prelude::*
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn event() -> Arc<ModelMeta> {
    Arc::new(
        ModelMeta::builder("event")
            .field(Field::generic_ip("ip"))
            .field(Field::uint16("port"))
            .field(Field::string("protocol"))
            .field(Field::datetime("t", None))
            .index(Index::new(["ip"], IndexType::Set(1000)).granularity(4))
            .engine(
                Engine::merge_tree()
                    .order_by(["t", "id"])
                    .partition_by(["toYYYYMMDD(t)"])
                    .primary_key(["t"])
            )
            .build()
            .expect("valid model")
    )
}

#[test]
fn create_table_clause_order() {
    init_tracing();
    let sql = SchemaEditor::new()
        .create_model(&event(), false)
        .expect("create table");
    let ddl = &sql[0];
    let positions: Vec<usize> = [
        "ENGINE = MergeTree",
        "ORDER BY (\"t\", \"id\")",
        "PARTITION BY (toYYYYMMDD(t))",
        "PRIMARY KEY (\"t\")"
    ]
    .iter()
    .map(|part| ddl.find(part).unwrap_or_else(|| panic!("{part} missing in {ddl}")))
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(ddl.contains("INDEX \"idx_event_ip\" (\"ip\") TYPE set(1000) GRANULARITY 4"));
}

#[test]
fn created_table_parses_back() {
    let ddl = SchemaEditor::new()
        .create_model(&event(), false)
        .expect("create table")
        .remove(0);
    let table = CreateTable::parse(&ddl).expect("parse");
    let types: Vec<String> = table.columns.iter().map(|(_, t)| t.clone()).collect();
    let expected: Vec<String> = event().fields.iter().map(Field::db_type).collect();
    assert_eq!(types, expected);
    assert_eq!(table.indexes[0].index_type, IndexType::Set(1000));
    assert_eq!(table.engine, "MergeTree");
    for (name, ty) in &table.columns {
        let field = parse_type(ty).expect("type").field(name).expect("known kind");
        assert_eq!(&field.db_type(), ty);
    }
}

#[test]
fn update_strips_table_qualifier() {
    let query = SelectQuery::new(event())
        .filter(Q::filter("port", 1))
        .update([("protocol", "TCP")]);
    let compiled = Compiler::default().update(&query).expect("update");
    assert_eq!(
        compiled.sql,
        "ALTER TABLE \"event\" UPDATE \"protocol\" = %s WHERE \"port\" = %s SETTINGS mutations_sync=1"
    );
}

#[test]
fn distributed_update_targets_local_table() {
    let model = Arc::new(
        ModelMeta::builder("tbl")
            .field(Field::int32("c"))
            .engine(Engine::distributed("c1", "default", "tbl_local", None))
            .build()
            .expect("valid model")
    );
    let query = SelectQuery::new(model)
        .filter(Q::filter("c", 1))
        .update([("c", 2)]);
    let compiled = Compiler::default().update(&query).expect("update");
    assert!(compiled.sql.starts_with("ALTER TABLE \"tbl_local\" ON CLUSTER \"c1\" UPDATE \"c\" = %s"));
}

#[test]
fn datetime_range_and_transforms() {
    let from = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
    let to = NaiveDate::from_ymd_opt(2024, 2, 1).expect("date");
    let query = SelectQuery::new(event())
        .values(["port"])
        .filter(Q::filter("t__date__range", vec![Value::from(from), Value::from(to)]))
        .filter(Q::filter("t__hour__gte", 9));
    let compiled = Compiler::default().select(&query).expect("select");
    assert_eq!(
        compiled.sql,
        "SELECT \"event\".\"port\" FROM \"event\" WHERE toDate(\"event\".\"t\") BETWEEN %s AND %s \
         AND toHour(\"event\".\"t\") >= %s"
    );
    assert_eq!(compiled.params.len(), 3);
}

#[test]
fn ip_text_lookup_casts_column() {
    let query = SelectQuery::new(event())
        .values(["port"])
        .filter(Q::filter("ip__contains", "1.2"));
    let compiled = Compiler::default().select(&query).expect("select");
    assert!(compiled.sql.ends_with(
        "WHERE replaceRegexpOne(IPv6NumToString(\"event\".\"ip\"),'^::ffff:','') LIKE %s"
    ));
    assert_eq!(compiled.params, Params::Positional(vec![Value::from("%1.2%")]));
}

#[test]
fn prewhere_precedes_where() {
    let query = SelectQuery::new(event())
        .values(["port"])
        .prewhere(Q::filter("protocol", "UDP"))
        .filter(Q::filter("port__lt", 1024) | Q::filter("port__gt", 49151));
    let sql = Compiler::default().select(&query).expect("select").sql;
    let prewhere = sql.find("PREWHERE").expect("prewhere");
    let filter = sql.find(" WHERE ").expect("where");
    assert!(prewhere < filter);
}

proptest! {
    #[test]
    fn in_lookup_binds_every_item(items in prop::collection::vec(0_u16..1024, 1..40)) {
        let values: Vec<Value> = items.iter().map(|p| Value::from(*p)).collect();
        let query = SelectQuery::new(event())
            .values(["port"])
            .filter(Q::filter("port__in", values));
        let compiled = Compiler::default().select(&query).expect("select");
        prop_assert_eq!(compiled.sql.matches("%s").count(), items.len());
        prop_assert_eq!(compiled.params.len(), items.len());
    }

    #[test]
    fn stripping_keeps_string_literals(text in "[a-z\".]{0,12}") {
        let literal = text.replace('\'', "");
        let sql = format!("\"event\".\"c\" = '{literal}'");
        let stripped = strip_qualifiers(&sql, "event");
        prop_assert_eq!(stripped, format!("\"c\" = '{literal}'"));
    }
}
