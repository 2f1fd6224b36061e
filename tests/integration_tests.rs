//! Integration tests using a recording executor and local staging
//!
//! Tests the full end-to-end flow: YAML config → Redshift handle → staged
//! files and generated SQL

use flate2::read::GzDecoder;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shiftmanager::database::{RecordingExecutor, Row};
use shiftmanager::output::StagingStore;
use shiftmanager::sql::CreateUser;
use shiftmanager::template::TemplateContext;
use shiftmanager::{Redshift, ShiftConfig};
use std::io::Read;
use std::sync::Arc;

const CONFIG: &str = r#"
aws:
  access_key_id: access_key
  secret_access_key: "{{ env.TEST_SECRET_KEY }}"
load:
  bucket: com.simple.mock
  keypath: tmp/tests/
  slices: 4
"#;

fn config() -> ShiftConfig {
    let mut ctx = TemplateContext::new();
    ctx.set_env("TEST_SECRET_KEY", "secret_key");
    ShiftConfig::from_str_with(CONFIG, &ctx).unwrap()
}

fn records() -> Vec<Value> {
    (1..=16)
        .map(|a| json!({ "a": a, "nested": { "b": a * 10 } }))
        .collect()
}

fn gunzip(bytes: &[u8]) -> String {
    let mut out = String::new();
    GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
    out
}

// ============================================================================
// JSON Load Integration Tests
// ============================================================================

#[tokio::test]
async fn test_load_from_config_to_local_bucket() {
    let bucket_dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(RecordingExecutor::new());
    let config = config();
    let redshift = Redshift::from_config(executor.clone(), &config);

    let store = StagingStore::local("com.simple.mock", bucket_dir.path()).unwrap();
    let data = records();
    let paths = redshift.gen_jsonpaths(&data[0], None).unwrap();
    let load = redshift.json_load("foo_table").with_clean_up_s3(false);

    let report = redshift
        .copy_json_to_table(&store, &data, &paths, &load)
        .await
        .unwrap();

    // 4 chunks + manifest + jsonpaths on "S3"
    assert_eq!(report.keys.len(), 6);
    for key in &report.keys {
        assert!(bucket_dir.path().join(key).exists(), "missing {key}");
    }

    // Reading the chunks in manifest order yields every record in order
    let mut seen = Vec::new();
    for key in &report.keys[..4] {
        let text = gunzip(&store.get(key).await.unwrap());
        for line in text.lines() {
            let record: Value = serde_json::from_str(line).unwrap();
            seen.push(record["a"].as_i64().unwrap());
        }
    }
    assert_eq!(seen, (1..=16).collect::<Vec<_>>());

    let jsonpaths = store.get(&report.keys[5]).await.unwrap();
    let jsonpaths: Value = serde_json::from_slice(&jsonpaths).unwrap();
    assert_eq!(
        jsonpaths,
        json!({ "jsonpaths": ["$['a']", "$['nested']['b']"] })
    );

    let copy = executor.last_executed().unwrap();
    assert_eq!(
        copy,
        format!(
            "COPY foo_table\n\
             FROM 's3://com.simple.mock/tmp/tests/{stamp}.manifest'\n\
             CREDENTIALS 'aws_access_key_id=access_key;aws_secret_access_key=secret_key'\n\
             JSON 's3://com.simple.mock/tmp/tests/{stamp}.jsonpaths'\n\
             MANIFEST GZIP TIMEFORMAT 'auto'",
            stamp = report.stamp
        )
    );
}

#[tokio::test]
async fn test_load_cleans_up_everything() {
    let bucket_dir = tempfile::tempdir().unwrap();
    let local_dir = tempfile::tempdir().unwrap();
    let redshift = Redshift::from_config(Arc::new(RecordingExecutor::new()), &config());

    let store = StagingStore::local("com.simple.mock", bucket_dir.path()).unwrap();
    let data = records();
    let paths = redshift.gen_jsonpaths(&data[0], None).unwrap();
    let load = redshift
        .json_load("foo_table")
        .with_local_path(local_dir.path());

    redshift
        .copy_json_to_table(&store, &data, &paths, &load)
        .await
        .unwrap();

    assert!(store.list("tmp/tests/").await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(local_dir.path()).unwrap().count(), 0);
}

// ============================================================================
// SQL Integration Tests
// ============================================================================

#[tokio::test]
async fn test_dedupe_from_catalog() {
    let executor = Arc::new(
        RecordingExecutor::new()
            .with_response(
                "relacl",
                vec![Row::from_pairs([
                    ("owner", Some("etl")),
                    ("acl", Some("etl=arwdRxt/etl,\"group analysts=r/etl\"")),
                    ("diststyle", Some("1")),
                ])],
            )
            .with_response(
                "pg_attribute",
                vec![
                    Row::from_pairs([
                        ("column_name", Some("id")),
                        ("data_type", Some("bigint")),
                        ("encoding", Some("none")),
                        ("distkey", Some("true")),
                        ("sortkey", Some("1")),
                        ("not_null", Some("true")),
                        ("default_expr", None),
                    ]),
                    Row::from_pairs([
                        ("column_name", Some("payload")),
                        ("data_type", Some("character varying(256)")),
                        ("encoding", Some("lzo")),
                        ("distkey", Some("false")),
                        ("sortkey", Some("0")),
                        ("not_null", Some("false")),
                        ("default_expr", None),
                    ]),
                ],
            ),
    );
    let redshift = Redshift::new(executor.clone());

    let sql = redshift
        .dedupe(Some("analytics"), "events", true, true)
        .await
        .unwrap();

    assert_eq!(
        sql,
        "LOCK TABLE analytics.events;\n\
         ALTER TABLE analytics.events RENAME TO events$outgoing;\n\
         CREATE TABLE analytics.events (\n\
         \tid bigint NOT NULL,\n\
         \tpayload character varying(256) ENCODE lzo\n\
         )\n\
         DISTSTYLE KEY\n\
         DISTKEY (id)\n\
         COMPOUND SORTKEY (id)\n\
         ;\n\
         ALTER TABLE analytics.events OWNER TO etl;\n\
         GRANT SELECT ON analytics.events TO GROUP analysts;\n\
         INSERT INTO analytics.events SELECT DISTINCT * from analytics.events$outgoing;\n\
         DROP TABLE analytics.events$outgoing"
    );
    assert_eq!(executor.executed(), vec![sql]);
}

#[tokio::test]
async fn test_create_user_with_random_password() {
    let executor = Arc::new(RecordingExecutor::new());
    let redshift = Redshift::new(executor.clone());

    let password = redshift.random_password(16).unwrap();
    let user = CreateUser::new("swiper", password.as_str()).group("analyticsusers");
    let sql = redshift.create_user(&user, true).await.unwrap();

    assert!(sql.starts_with("CREATE USER swiper IN GROUP analyticsusers PASSWORD '"));
    assert!(sql.contains(&password));
    assert_eq!(executor.executed().len(), 1);
}
