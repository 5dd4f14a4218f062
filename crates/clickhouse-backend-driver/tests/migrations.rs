// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Migration ledger tests.
//!
//! Run with: `cargo test -p clickhouse-backend-driver --test migrations`

use std::sync::Arc;

use clickhouse_backend_driver::{migrations::LEDGER_TABLE, prelude::*};

const APPLIED_SET: &str = r#"SELECT "django_migrations"."app", "django_migrations"."name""#;
const EXISTS: &str = r#"SELECT "django_migrations"."id""#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn connect(alias: &str, cluster: Option<&str>) -> (MockServer, DatabaseWrapper) {
    init_tracing();
    let mut settings = DatabaseSettings::default();
    settings.alias = alias.into();
    settings.options.connections_min = 1;
    settings.options.connections_max = 4;
    settings.options.migration_cluster = cluster.map(str::to_owned);
    let server = MockServer::new();
    let db = DatabaseWrapper::new(settings, Arc::new(server.clone())).expect("connect");
    (server, db)
}

fn event(cluster: Option<&str>) -> Arc<ModelMeta> {
    let mut builder = ModelMeta::builder("event")
        .field(Field::string("protocol"))
        .field(Field::uint16("port"));
    if let Some(cluster) = cluster {
        builder = builder.cluster(cluster);
    }
    Arc::new(builder.build().expect("valid model"))
}

fn applied(pairs: &[(&str, &str)]) -> QueryResult {
    QueryResult::rows(
        pairs
            .iter()
            .map(|(app, name)| vec![Value::from(*app), Value::from(*name)])
            .collect(),
        vec![]
    )
}

fn initial(cluster: Option<&str>) -> Migration {
    let model = event(cluster);
    Migration::new("events", "0001_initial")
        .operation(Operation::CreateModel(Arc::clone(&model)))
        .operation(Operation::AddIndex {
            model,
            index: Index::new(["port"], IndexType::MinMax).with_name("port_minmax")
        })
}

#[test]
fn apply_creates_ledger_runs_ddl_and_records() {
    let (server, db) = connect("migrations-apply", None);
    let migrator = Migrator::new(&db).expect("migrator");
    assert!(migrator.apply(&initial(None)).expect("apply"));

    let statements = server.statements();
    assert!(statements[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "django_migrations" ("#));
    assert!(statements[1].starts_with(APPLIED_SET));
    assert!(statements[2].starts_with(r#"CREATE TABLE "event" ("#));
    assert!(statements[3].starts_with(r#"ALTER TABLE "event" ADD INDEX "port_minmax""#));
    assert!(statements[4].starts_with(EXISTS));
    assert!(statements[5].starts_with(
        r#"INSERT INTO "django_migrations"("id","app","name","applied","deleted") VALUES"#
    ));
    assert!(statements[5].contains("'events'"));
    assert!(statements[5].contains("'0001_initial'"));
    assert_eq!(statements.len(), 6);
}

#[test]
fn applied_migration_is_skipped() {
    let (server, db) = connect("migrations-idempotent", None);
    server.respond(APPLIED_SET, applied(&[("events", "0001_initial")]));
    let migrator = Migrator::new(&db).expect("migrator");
    assert!(!migrator.apply(&initial(None)).expect("apply"));
    assert!(!server.statements().iter().any(|s| s.contains(r#"TABLE "event""#)));
    assert_eq!(
        migrator.migrate(&[initial(None)]).expect("migrate"),
        Vec::<(String, String)>::new()
    );
}

#[test]
fn reapply_revives_the_ledger_row() {
    let (server, db) = connect("migrations-revive", None);
    server.respond(EXISTS, QueryResult::rows(vec![vec![Value::Int(7)]], vec![]));
    let migrator = Migrator::new(&db).expect("migrator");
    migrator.apply(&initial(None)).expect("apply");
    let last = server.statements().pop().expect("statement");
    assert!(last.starts_with(r#"ALTER TABLE "django_migrations" UPDATE "deleted" = false"#));
    assert!(last.ends_with("SETTINGS mutations_sync=1"));
}

#[test]
fn unapply_reverses_operations_and_marks_deleted() {
    let (server, db) = connect("migrations-unapply", None);
    server.respond(APPLIED_SET, applied(&[("events", "0001_initial")]));
    let migrator = Migrator::new(&db).expect("migrator");
    assert!(migrator.unapply(&initial(None)).expect("unapply"));

    let statements = server.statements();
    let drop_index = statements
        .iter()
        .position(|s| s.starts_with(r#"ALTER TABLE "event" DROP INDEX "port_minmax""#))
        .expect("index dropped");
    let drop_table = statements
        .iter()
        .position(|s| s.starts_with(r#"DROP TABLE IF EXISTS "event""#))
        .expect("table dropped");
    assert!(drop_index < drop_table);
    let last = statements.last().expect("statement");
    assert!(last.starts_with(r#"ALTER TABLE "django_migrations" UPDATE "deleted" = true"#));
}

#[test]
fn unapply_of_irreversible_migration_runs_nothing() {
    let (server, db) = connect("migrations-irreversible", None);
    server.respond(APPLIED_SET, applied(&[("events", "0002_raw")]));
    let migration = Migration::new("events", "0002_raw").operation(Operation::RunSql {
        forward:  vec!["OPTIMIZE TABLE \"event\" FINAL".into()],
        backward: None
    });
    let err = Migrator::new(&db)
        .expect("migrator")
        .unapply(&migration)
        .unwrap_err();
    assert!(matches!(err, Error::Migration(_)));
    assert!(err.to_string().contains("events.0002_raw"));
    assert!(!server.statements().iter().any(|s| s.contains("OPTIMIZE")));
    assert!(!server.statements().iter().any(|s| s.contains("UPDATE")));
}

#[test]
fn cluster_replica_skips_ddl_already_applied_elsewhere() {
    let (server, db) = connect("migrations-cluster", Some("c1"));
    server.respond("clusterAllReplicas", QueryResult::rows(vec![vec![Value::UInt(1)]], vec![]));
    let migrator = Migrator::new(&db).expect("migrator");
    assert_eq!(migrator.recorder().cluster(), Some("c1"));
    assert!(migrator.apply(&initial(Some("c1"))).expect("apply"));

    let statements = server.statements();
    assert!(statements[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "django_migrations" ON CLUSTER "c1""#));
    assert!(statements.iter().any(|s| s
        == "SELECT count() FROM clusterAllReplicas('c1', currentDatabase(), 'django_migrations') \
            WHERE app = 'events' AND name = '0001_initial' AND NOT deleted"));
    assert!(!statements.iter().any(|s| s.contains(r#"TABLE "event""#)));
    assert!(statements.last().expect("statement").starts_with(r#"INSERT INTO "django_migrations""#));
}

#[test]
fn cluster_replica_runs_ddl_when_first() {
    let (server, db) = connect("migrations-cluster-first", Some("c1"));
    server.respond("clusterAllReplicas", QueryResult::rows(vec![vec![Value::UInt(0)]], vec![]));
    Migrator::new(&db)
        .expect("migrator")
        .apply(&initial(Some("c1")))
        .expect("apply");
    assert!(server
        .statements()
        .iter()
        .any(|s| s.starts_with(r#"CREATE TABLE "event" ON CLUSTER "c1""#)));
}

#[test]
fn recorder_lists_and_flushes() {
    let (server, db) = connect("migrations-recorder", None);
    server.respond(APPLIED_SET, applied(&[("b", "0001"), ("a", "0002"), ("a", "0001")]));
    let recorder = MigrationRecorder::new(&db).expect("recorder");
    let applied = recorder.applied_migrations().expect("applied");
    assert_eq!(
        applied.into_iter().collect::<Vec<_>>(),
        vec![
            ("a".to_owned(), "0001".to_owned()),
            ("a".to_owned(), "0002".to_owned()),
            ("b".to_owned(), "0001".to_owned())
        ]
    );
    assert!(server.statements()[0].ends_with(r#"WHERE "django_migrations"."deleted" = false"#));
    recorder.flush().expect("flush");
    assert_eq!(
        server.statements().last().map(String::as_str),
        Some(format!("TRUNCATE TABLE IF EXISTS \"{LEDGER_TABLE}\"").as_str())
    );
    assert!(!recorder.probe_cluster("a", "0001", false).expect("probe"));
}
