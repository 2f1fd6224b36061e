//! Tests for database module

use super::*;
use crate::sql::{DistStyle, Grantee, SortKey};
use pretty_assertions::assert_eq;

fn column_row(
    name: &str,
    data_type: &str,
    encoding: &str,
    distkey: bool,
    sortkey: i64,
    not_null: bool,
    default: Option<&str>,
) -> Row {
    let sortkey = sortkey.to_string();
    Row::from_pairs([
        ("column_name", Some(name)),
        ("data_type", Some(data_type)),
        ("encoding", Some(encoding)),
        ("distkey", Some(if distkey { "true" } else { "false" })),
        ("sortkey", Some(sortkey.as_str())),
        ("not_null", Some(if not_null { "true" } else { "false" })),
        ("default_expr", default),
    ])
}

fn events_executor(diststyle: &str, sortkeys: [i64; 3]) -> RecordingExecutor {
    RecordingExecutor::new()
        .with_response(
            "pg_attribute",
            vec![
                column_row("id", "bigint", "none", true, sortkeys[0], true, None),
                column_row(
                    "name",
                    "character varying(64)",
                    "lzo",
                    false,
                    sortkeys[1],
                    true,
                    None,
                ),
                column_row(
                    "seen_at",
                    "timestamp without time zone",
                    "az64",
                    false,
                    sortkeys[2],
                    false,
                    Some("getdate()"),
                ),
            ],
        )
        .with_response(
            "relacl",
            vec![Row::from_pairs([
                ("owner", Some("admin")),
                ("acl", Some("admin=arwdRxtD/admin,bob=r/admin")),
                ("diststyle", Some(diststyle)),
            ])],
        )
}

#[test]
fn test_row_accessors() {
    let row = Row::from_pairs([
        ("flag", Some("t")),
        ("count", Some(" 42 ")),
        ("empty", None),
    ]);
    assert!(row.get_bool("flag"));
    assert_eq!(row.get_i64("count"), Some(42));
    assert_eq!(row.get("empty"), None);
    assert!(row.require("empty").is_err());
    assert!(row.require("missing").is_err());
    assert_eq!(row.columns().len(), 3);
}

#[tokio::test]
async fn test_reflect_table_compound() {
    let executor = events_executor("1", [1, 2, 0]);
    let info = reflect_table(&executor, Some("analytics"), "events")
        .await
        .unwrap();

    let table = &info.table;
    assert_eq!(table.schema.as_deref(), Some("analytics"));
    assert_eq!(table.columns.len(), 3);
    assert!(table.columns[0].not_null);
    // NOT NULL is independent of the distribution key
    assert!(table.columns[1].not_null);
    assert!(!table.columns[2].not_null);
    assert_eq!(table.columns[1].encoding.as_deref(), Some("lzo"));
    assert_eq!(table.columns[2].default.as_deref(), Some("getdate()"));
    assert_eq!(table.dist_style, Some(DistStyle::Key));
    assert_eq!(table.dist_key.as_deref(), Some("id"));
    assert_eq!(
        table.sort_key,
        Some(SortKey::Compound(vec!["id".to_string(), "name".to_string()]))
    );

    assert_eq!(info.owner.as_deref(), Some("admin"));
    assert_eq!(info.acl.len(), 2);
    assert_eq!(info.acl[1].grantee, Grantee::User("bob".to_string()));

    let queries = executor.queries();
    assert!(queries.iter().all(|q| q.contains("'analytics'")));
    assert!(queries.iter().all(|q| q.contains("'events'")));
}

#[tokio::test]
async fn test_reflect_table_interleaved_even() {
    let executor = events_executor("0", [-2, 0, -1]);
    let info = reflect_table(&executor, None, "events").await.unwrap();

    assert_eq!(info.table.schema, None);
    assert_eq!(info.table.dist_style, Some(DistStyle::Even));
    assert_eq!(info.table.dist_key, None);
    assert_eq!(
        info.table.sort_key,
        Some(SortKey::Interleaved(vec![
            "seen_at".to_string(),
            "id".to_string()
        ]))
    );
    assert!(executor.queries()[0].contains("'public'"));

    let ddl = info.table.create_statement().unwrap();
    assert!(ddl.starts_with("CREATE TABLE events ("));
    assert!(ddl.contains("\tid bigint NOT NULL,"));
    assert!(ddl.contains("\tname character varying(64) ENCODE lzo NOT NULL,"));
    assert!(ddl.ends_with("DISTSTYLE EVEN\nINTERLEAVED SORTKEY (seen_at, id)"));
}

#[tokio::test]
async fn test_reflect_missing_table() {
    let executor = RecordingExecutor::new();
    let err = reflect_table(&executor, None, "ghost").await.unwrap_err();
    assert!(matches!(err, crate::Error::TableNotFound { ref table } if table == "public.ghost"));
}
