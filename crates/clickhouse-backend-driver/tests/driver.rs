// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Driver integration tests against the in-memory client.
//!
//! Run with: `cargo test -p clickhouse-backend-driver --test driver`

use std::{io::Write, sync::Arc};

use clickhouse_backend_core::{DatabaseError, DatabaseErrorKind};
use clickhouse_backend_driver::{
    introspection::describe_table,
    prelude::*,
    wire::CUSTOM
};
use indexmap::IndexMap;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn connect(alias: &str, configure: impl FnOnce(&mut DatabaseSettings)) -> (MockServer, DatabaseWrapper) {
    init_tracing();
    let mut settings = DatabaseSettings::default();
    settings.alias = alias.into();
    settings.options.connections_min = 1;
    settings.options.connections_max = 2;
    configure(&mut settings);
    let server = MockServer::new();
    let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).expect("connect");
    (server, db)
}

fn event() -> Arc<ModelMeta> {
    Arc::new(
        ModelMeta::builder("event")
            .field(Field::int32("id").primary_key())
            .field(Field::uint16("port"))
            .field(Field::string("protocol"))
            .build()
            .expect("valid model")
    )
}

#[test]
fn settings_file_and_environment_drive_the_connection() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "alias = \"driver-config\"\n\n[options]\nconnections_min = 1\nmutations_sync = 2\n\n[options.settings]\nmax_threads = 4"
    )
    .expect("write");
    let settings = DatabaseSettings::load_with_env(
        Some(file.path()),
        [("CLICKHOUSE_OPTIONS__CONNECTIONS_MAX".to_owned(), "3".to_owned())]
    )
    .expect("settings");
    assert_eq!(settings.options.connections_max, 3);

    let server = MockServer::new();
    let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).expect("connect");
    db.update(&UpdateQuery::new(event()).set("protocol", Value::from("TCP")).filter(Q::filter("id", 5)))
        .expect("update");
    let executed = &server.executed()[0];
    assert_eq!(
        executed.sql,
        r#"ALTER TABLE "event" UPDATE "protocol" = 'TCP' WHERE "id" = 5 SETTINGS mutations_sync=2"#
    );
    assert_eq!(executed.settings[0].name, "max_threads");
    assert_eq!(executed.settings[0].value, "4");
}

#[test]
fn pool_saturation_is_an_error() {
    let (_server, db) = connect("driver-saturation", |_| {});
    let first = db.cursor().expect("first");
    let second = db.cursor().expect("second");
    let err = db.cursor().unwrap_err();
    assert!(matches!(err, Error::TooManyConnections { max: 2 }));
    drop(first);
    drop(second);
    assert_eq!(db.pool().stats().in_use, 0);
    assert_eq!(db.pool().stats().idle, 1);
    db.cursor().expect("capacity is back");
}

#[test]
fn keyed_cursors_share_a_client() {
    let (server, db) = connect("driver-keyed", |_| {});
    let mut a = db.cursor_for("request-1").expect("a");
    let mut b = db.cursor_for("request-1").expect("b");
    a.execute("SELECT 1", Params::None).expect("a");
    b.execute("SELECT 2", Params::None).expect("b");
    let executed = server.executed();
    assert_eq!(executed[0].client, executed[1].client);
    a.close();
    b.close();
}

#[test]
fn executemany_collapses_inserts_into_one_block() {
    let (server, db) = connect("driver-executemany", |_| {});
    let mut cursor = db.cursor().expect("cursor");
    let rows: Vec<Vec<Value>> = (1..=3)
        .map(|i| vec![Value::from(i), Value::from(80_u16), Value::from("TCP")])
        .collect();
    cursor
        .executemany(r#"INSERT INTO "event"("id","port","protocol") VALUES"#, rows.clone())
        .expect("insert");
    assert_eq!(cursor.rowcount(), 3);
    let executed = server.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].rows.as_deref(), Some(rows.as_slice()));

    cursor
        .executemany(
            r#"ALTER TABLE "event" DELETE WHERE "id" = %s"#,
            vec![vec![Value::from(1)], vec![Value::from(2)]]
        )
        .expect("delete");
    assert_eq!(
        server.statements()[1..],
        [
            r#"ALTER TABLE "event" DELETE WHERE "id" = 1"#,
            r#"ALTER TABLE "event" DELETE WHERE "id" = 2"#
        ]
    );
    cursor.close();
}

#[test]
fn large_inserts_use_the_column_path() {
    let (server, db) = connect("driver-columnar", |s| s.options.batch_threshold = 3);
    let mut query = InsertQuery::new(event());
    for id in 0..3 {
        query = query.row([
            ("id", Value::from(id)),
            ("port", Value::from(443_u16)),
            ("protocol", Value::from("TLS"))
        ]);
    }
    assert_eq!(db.insert(&query).expect("insert"), 3);
    let executed = &server.executed()[0];
    assert_eq!(
        executed.sql,
        r#"INSERT INTO "event"("id","port","protocol") VALUES"#
    );
    let rows = executed.rows.as_ref().expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], vec![Value::Int(2), Value::UInt(443), Value::from("TLS")]);
}

#[test]
fn query_parameters_travel_in_the_settings_block() {
    let (server, db) = connect("driver-parameters", |_| {});
    let mut cursor = db.cursor().expect("cursor");
    let mut parameters = IndexMap::new();
    parameters.insert("name".to_owned(), Value::from("it's"));
    cursor.set_query_parameters(parameters);
    cursor.set_query_id("q-1");
    cursor
        .execute("SELECT {name:String}", Params::None)
        .expect("first");
    cursor.execute("SELECT 2", Params::None).expect("second");

    let executed = server.executed();
    let parameter = executed[0]
        .settings
        .iter()
        .find(|s| s.name == "name")
        .expect("parameter");
    assert_eq!(parameter.flags, CUSTOM);
    assert_eq!(parameter.value, "'it\\'s'");
    assert_eq!(executed[0].query_id.as_deref(), Some("q-1"));
    assert_eq!(executed[1].query_id, None);
    cursor.close();
}

#[test]
fn cursor_fetch_protocol() {
    let (server, db) = connect("driver-fetch", |_| {});
    server.respond(
        "FROM numbers",
        QueryResult::rows(
            (0..5).map(|i| vec![Value::UInt(i)]).collect(),
            vec![Column::new("number", "UInt64")]
        )
    );
    let mut cursor = db.cursor().expect("cursor");
    assert_eq!(cursor.rowcount(), -1);
    assert!(matches!(cursor.fetchone().unwrap_err(), Error::Interface(_)));

    cursor
        .execute("SELECT number FROM numbers(5) WHERE number < %s", vec![Value::from(5)])
        .expect("select");
    assert_eq!(cursor.rowcount(), 5);
    assert_eq!(cursor.description().map(|d| d[0].name.as_str()), Some("number"));
    assert_eq!(cursor.fetchone().expect("one"), Some(vec![Value::UInt(0)]));
    assert_eq!(cursor.fetchmany(2).expect("many").len(), 2);
    assert_eq!(cursor.fetchall().expect("all").len(), 2);
    assert_eq!(cursor.fetchone().expect("exhausted"), None);

    cursor.close();
    assert!(cursor.is_closed());
    assert!(matches!(cursor.fetchall().unwrap_err(), Error::Interface(_)));
}

#[test]
fn broken_clients_are_not_reused() {
    let (server, db) = connect("driver-broken", |_| {});
    server.fail("boom", DatabaseError::operational("connection reset"));
    let err = db.execute("SELECT boom", Params::None).unwrap_err();
    assert_eq!(err.database_kind(), Some(DatabaseErrorKind::Operational));
    assert_eq!(db.pool().stats().idle, 0);
    db.execute("SELECT 1", Params::None).expect("fresh client");
    let executed = server.executed();
    assert_ne!(executed[0].client, executed[1].client);
}

#[test]
fn unreachable_server_fails_to_pull() {
    let (server, db) = connect("driver-unreachable", |_| {});
    server.set_unreachable(true);
    let err = db.cursor().unwrap_err();
    assert_eq!(err.database_kind(), Some(DatabaseErrorKind::Operational));
    assert!(!db.is_usable());
    assert_eq!(db.pool().stats().in_use, 0);
    server.set_unreachable(false);
    assert!(db.is_usable());
}

#[test]
fn fake_transactions_around_compiled_statements() {
    let (server, db) = connect("driver-transaction", |s| s.options.fake_transaction = true);
    let deleted = Transaction::new(&db).run(|ctx| {
        ctx.savepoint("s1")?;
        ctx.cursor()
            .execute(r#"ALTER TABLE "event" DELETE WHERE 1"#, Params::None)?;
        ctx.release("s1")?;
        Ok(true)
    });
    assert!(deleted.expect("transaction"));
    assert_eq!(
        server.statements(),
        vec![
            "SELECT 1",
            "SELECT 1",
            r#"ALTER TABLE "event" DELETE WHERE 1"#,
            "SELECT 1",
            "SELECT 1"
        ]
    );
}

#[test]
fn describe_table_combines_columns_and_create_statement() {
    let (server, db) = connect("driver-describe", |_| {});
    let column = |name: &str, db_type: &str, pk: u64| {
        vec![
            Value::from(name),
            Value::from(db_type),
            Value::from(""),
            Value::from(""),
            Value::UInt(pk.into())
        ]
    };
    server.respond(
        "FROM system.columns",
        QueryResult::rows(
            vec![
                column("id", "Int32", 1),
                column("ip", "IPv6", 0),
                column("tags", "Array(LowCardinality(String))", 0)
            ],
            vec![]
        )
    );
    server.respond(
        "SHOW CREATE TABLE",
        QueryResult::rows(
            vec![vec![Value::from(
                "CREATE TABLE default.event (`id` Int32, `ip` IPv6, `tags` Array(LowCardinality(String)), \
                 INDEX ip_set ip TYPE set(100) GRANULARITY 4) ENGINE = MergeTree ORDER BY id SETTINGS index_granularity = 8192"
            )]],
            vec![]
        )
    );
    let description = describe_table(&db, "event").expect("describe");
    assert_eq!(description.primary_key(), vec!["id"]);
    assert_eq!(description.fields.len(), 3);
    assert!(description.fields[0].primary_key);
    assert_eq!(description.fields[2].db_type(), "Array(LowCardinality(String))");
    assert_eq!(description.create.engine, "MergeTree");
    assert_eq!(description.create.order_by.as_deref(), Some("id"));
    assert_eq!(description.create.indexes.len(), 1);
    assert_eq!(
        server.statements()[1],
        r#"SHOW CREATE TABLE "event""#
    );
}
