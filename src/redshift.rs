//! High-level entry point
//!
//! [`Redshift`] bundles a SQL executor with AWS credentials and load
//! defaults. SQL-generating methods always return the statement text and only
//! run it when asked to.

use crate::config::{AwsConfig, LoadDefaults, ShiftConfig};
use crate::database::{self, RedshiftConnection, SqlExecutor, TableInfo};
use crate::engine::{JsonLoad, JsonLoader, LoadReport};
use crate::error::{Error, Result};
use crate::jsonpaths::{self, JsonPaths};
use crate::output::StagingStore;
use crate::password;
use crate::sql::{self, AlterUser, CopyAuthorization, CreateUser, DeepCopyOptions};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// COPY authorization from AWS settings
///
/// An IAM role wins over access keys.
pub fn authorization_from(aws: &AwsConfig) -> Result<CopyAuthorization> {
    if let Some(role) = aws.iam_role.as_deref().filter(|r| !r.is_empty()) {
        return Ok(CopyAuthorization::IamRole(role.to_string()));
    }
    let access_key_id = aws
        .access_key_id
        .clone()
        .ok_or_else(|| Error::missing_field("aws.access_key_id"))?;
    let secret_access_key = aws
        .secret_access_key
        .clone()
        .ok_or_else(|| Error::missing_field("aws.secret_access_key"))?;
    Ok(CopyAuthorization::Keys {
        access_key_id,
        secret_access_key,
        session_token: aws.session_token.clone(),
    })
}

/// Redshift management handle
pub struct Redshift {
    executor: Arc<dyn SqlExecutor>,
    aws: AwsConfig,
    defaults: LoadDefaults,
}

impl Redshift {
    /// Wrap an executor with empty AWS settings and default load settings
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            executor,
            aws: AwsConfig::default(),
            defaults: LoadDefaults::default(),
        }
    }

    /// Wrap an executor with settings from `config`
    pub fn from_config(executor: Arc<dyn SqlExecutor>, config: &ShiftConfig) -> Self {
        Self {
            executor,
            aws: config.aws.clone(),
            defaults: config.load.clone(),
        }
    }

    /// Connect to the database named in `config`
    pub async fn connect(config: &ShiftConfig) -> Result<Self> {
        let connection = RedshiftConnection::connect(&config.database).await?;
        Ok(Self::from_config(Arc::new(connection), config))
    }

    /// Set AWS settings
    #[must_use]
    pub fn with_aws(mut self, aws: AwsConfig) -> Self {
        self.aws = aws;
        self
    }

    /// Set load defaults
    #[must_use]
    pub fn with_load_defaults(mut self, defaults: LoadDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The executor statements run on
    pub fn executor(&self) -> &dyn SqlExecutor {
        self.executor.as_ref()
    }

    /// Load defaults
    pub fn load_defaults(&self) -> &LoadDefaults {
        &self.defaults
    }

    async fn run(&self, sql: String, execute: bool) -> Result<String> {
        if execute {
            self.executor.execute(&sql).await?;
        }
        Ok(sql)
    }

    // ============================================================================
    // Users and groups
    // ============================================================================

    /// Random password Redshift accepts
    pub fn random_password(&self, length: usize) -> Result<String> {
        password::random_password(length)
    }

    /// CREATE USER (and any ALTER USER ... SET) for `user`
    pub async fn create_user(&self, user: &CreateUser, execute: bool) -> Result<String> {
        tracing::info!("Creating user {}", user.username());
        self.run(user.build()?, execute).await
    }

    /// ALTER USER for `user`
    pub async fn alter_user(&self, user: &AlterUser, execute: bool) -> Result<String> {
        self.run(user.build()?, execute).await
    }

    /// CREATE GROUP with initial members
    pub async fn create_group<S: AsRef<str>>(
        &self,
        group: &str,
        users: &[S],
        execute: bool,
    ) -> Result<String> {
        tracing::info!("Creating group {}", group);
        self.run(sql::create_group(group, users)?, execute).await
    }

    // ============================================================================
    // Tables
    // ============================================================================

    /// Reflect a table from the catalog
    pub async fn reflect_table(&self, schema: Option<&str>, table: &str) -> Result<TableInfo> {
        database::reflect_table(self.executor.as_ref(), schema, table).await
    }

    /// Deep copy a table
    ///
    /// The current definition is reflected first. When privileges are copied
    /// and `options` does not name them, the reflected owner and ACL are used.
    pub async fn deep_copy(
        &self,
        schema: Option<&str>,
        table: &str,
        mut options: DeepCopyOptions,
        execute: bool,
    ) -> Result<String> {
        let info = self.reflect_table(schema, table).await?;

        if options.copy_privileges {
            if options.owner.is_none() {
                options.owner = info.owner;
            }
            if options.acl.is_empty() {
                options.acl = info.acl;
            }
        }

        let batch = sql::deep_copy(&info.table, &options)?;
        tracing::info!(
            "Deep copy of {}{}",
            info.table.display_name(),
            if options.distinct { " (distinct)" } else { "" }
        );
        self.run(batch, execute).await
    }

    /// Remove duplicate rows with a DISTINCT deep copy
    pub async fn dedupe(
        &self,
        schema: Option<&str>,
        table: &str,
        copy_privileges: bool,
        execute: bool,
    ) -> Result<String> {
        let mut options = DeepCopyOptions::dedupe();
        options.copy_privileges = copy_privileges;
        self.deep_copy(schema, table, options, execute).await
    }

    // ============================================================================
    // JSON loads
    // ============================================================================

    /// JSONPaths for a sample document
    pub fn gen_jsonpaths(&self, doc: &Value, list_index: Option<usize>) -> Result<JsonPaths> {
        jsonpaths::gen_jsonpaths(doc, list_index)
    }

    /// COPY authorization from the configured AWS settings
    pub fn authorization(&self) -> Result<CopyAuthorization> {
        authorization_from(&self.aws)
    }

    /// S3 staging store for `bucket`, or the configured default bucket
    pub fn staging_store(&self, bucket: Option<&str>) -> Result<StagingStore> {
        let bucket = bucket
            .or(self.defaults.bucket.as_deref())
            .ok_or_else(|| Error::missing_field("load.bucket"))?;
        StagingStore::for_bucket(bucket, &self.aws)
    }

    /// Load settings for `table` from the configured defaults
    pub fn json_load(&self, table: impl Into<String>) -> JsonLoad {
        JsonLoad::from_defaults(table, &self.defaults)
    }

    /// Stage `data` in `store` and COPY it into `load.table`
    pub async fn copy_json_to_table<T: Serialize + Sync>(
        &self,
        store: &StagingStore,
        data: &[T],
        jsonpaths: &JsonPaths,
        load: &JsonLoad,
    ) -> Result<LoadReport> {
        let loader = JsonLoader::new(
            Arc::clone(&self.executor),
            store.clone(),
            self.authorization()?,
        );
        loader.load(data, jsonpaths, load).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{RecordingExecutor, Row};
    use crate::types::ConnectionLimit;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn class_row() -> Row {
        Row::from_pairs([
            ("owner", Some("admin")),
            ("acl", Some("admin=arwdRxt/admin,bob=r/admin")),
            ("diststyle", Some("0")),
        ])
    }

    fn column_row() -> Row {
        Row::from_pairs([
            ("column_name", Some("col1")),
            ("data_type", Some("integer")),
            ("encoding", Some("none")),
            ("distkey", Some("false")),
            ("sortkey", Some("0")),
            ("not_null", Some("false")),
            ("default_expr", None),
        ])
    }

    fn recorded() -> Arc<RecordingExecutor> {
        Arc::new(
            RecordingExecutor::new()
                .with_response("relacl", vec![class_row()])
                .with_response("pg_attribute", vec![column_row()]),
        )
    }

    fn aws_keys() -> AwsConfig {
        AwsConfig {
            access_key_id: Some("access_key".to_string()),
            secret_access_key: Some("secret_key".to_string()),
            ..AwsConfig::default()
        }
    }

    #[test]
    fn test_authorization_from() {
        let auth = authorization_from(&aws_keys()).unwrap();
        assert_eq!(
            auth.credentials_string(),
            "aws_access_key_id=access_key;aws_secret_access_key=secret_key"
        );

        let role = AwsConfig {
            iam_role: Some("arn:aws:iam::0:role/load".to_string()),
            ..aws_keys()
        };
        assert_eq!(
            authorization_from(&role).unwrap(),
            CopyAuthorization::IamRole("arn:aws:iam::0:role/load".to_string())
        );

        assert!(matches!(
            authorization_from(&AwsConfig::default()),
            Err(Error::MissingConfigField { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_user_returns_sql() {
        let executor = recorded();
        let redshift = Redshift::new(executor.clone());

        let user = CreateUser::new("swiper", "swiperpass")
            .group("analyticsusers")
            .wlm_query_slot_count(2);
        let sql = redshift.create_user(&user, false).await.unwrap();
        assert_eq!(
            sql,
            "CREATE USER swiper IN GROUP analyticsusers PASSWORD 'swiperpass';\n\
             ALTER USER swiper SET wlm_query_slot_count = 2"
        );
        assert!(executor.executed().is_empty());

        redshift.create_user(&user, true).await.unwrap();
        assert_eq!(executor.last_executed().unwrap(), sql);
    }

    #[tokio::test]
    async fn test_alter_user_and_group() {
        let executor = recorded();
        let redshift = Redshift::new(executor.clone());

        let sql = redshift
            .alter_user(
                &AlterUser::new("swiper").connection_limit(ConnectionLimit::Unlimited),
                true,
            )
            .await
            .unwrap();
        assert_eq!(sql, "ALTER USER swiper CONNECTION LIMIT UNLIMITED");

        redshift
            .create_group("analyticsusers", &["swiper"], true)
            .await
            .unwrap();
        assert_eq!(executor.executed().len(), 2);
    }

    #[tokio::test]
    async fn test_dedupe() {
        let redshift = Redshift::new(recorded());
        let sql = redshift.dedupe(None, "test", false, false).await.unwrap();
        assert_eq!(
            sql,
            "LOCK TABLE test;\n\
             ALTER TABLE test RENAME TO test$outgoing;\n\
             CREATE TABLE test (\n\
             \tcol1 integer\n\
             )\n\
             DISTSTYLE EVEN\n\
             ;\n\
             INSERT INTO test SELECT DISTINCT * from test$outgoing;\n\
             DROP TABLE test$outgoing"
        );
    }

    #[tokio::test]
    async fn test_deep_copy_with_reflected_privileges() {
        let redshift = Redshift::new(recorded());
        let options = DeepCopyOptions {
            copy_privileges: true,
            ..DeepCopyOptions::default()
        };
        let sql = redshift.deep_copy(None, "test", options, false).await.unwrap();

        assert!(sql.contains("ALTER TABLE test OWNER TO admin"));
        assert!(sql.contains("GRANT SELECT ON test TO bob"));
        assert!(sql.contains("INSERT INTO test SELECT * from test$outgoing"));
    }

    #[tokio::test]
    async fn test_gen_jsonpaths() {
        let redshift = Redshift::new(recorded());
        let paths = redshift
            .gen_jsonpaths(&json!({"one": 1, "two": {"three": 3}}), None)
            .unwrap();
        assert_eq!(paths.jsonpaths, vec!["$['one']", "$['two']['three']"]);
    }

    #[test]
    fn test_staging_store_requires_bucket() {
        let redshift = Redshift::new(recorded());
        assert!(matches!(
            redshift.staging_store(None),
            Err(Error::MissingConfigField { .. })
        ));
    }

    #[tokio::test]
    async fn test_copy_json_to_table() {
        let executor = recorded();
        let redshift = Redshift::new(executor.clone()).with_aws(aws_keys());
        let store = StagingStore::in_memory("com.simple.mock");

        let data: Vec<Value> = (1..=16).map(|a| json!({ "a": a })).collect();
        let paths = redshift.gen_jsonpaths(&data[0], None).unwrap();
        let load = redshift
            .json_load("foo_table")
            .with_keypath("tmp/tests/")
            .with_slices(5);

        let report = redshift
            .copy_json_to_table(&store, &data, &paths, &load)
            .await
            .unwrap();

        assert_eq!(report.keys.len(), 7);
        assert!(executor
            .last_executed()
            .unwrap()
            .starts_with("COPY foo_table\nFROM 's3://com.simple.mock/tmp/tests/"));
        assert!(store.list("tmp/tests/").await.unwrap().is_empty());
    }
}
