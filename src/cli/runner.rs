//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, PasswordArgs, TableArgs, UserOptions};
use crate::config::ShiftConfig;
use crate::database::RecordingExecutor;
use crate::engine::LoadReport;
use crate::error::{Error, Result};
use crate::jsonpaths::JsonPaths;
use crate::output::StagingStore;
use crate::password;
use crate::redshift::Redshift;
use crate::sql::{AlterUser, CreateUser, DeepCopyOptions, UserPassword};
use serde_json::{json, Value};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// CLI runner
pub struct Runner {
    cli: Cli,
    config: ShiftConfig,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli, config: ShiftConfig) -> Self {
        Self { cli, config }
    }

    /// Load the configuration file, or fall back to the environment
    pub fn load_config(path: Option<&Path>) -> Result<ShiftConfig> {
        let config = match path {
            Some(path) => ShiftConfig::from_file(path)?,
            None => ShiftConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Password { length } => self.password(*length),
            Commands::CreateUser {
                username,
                password,
                groups,
                options,
            } => self.create_user(username, password, groups, options).await,
            Commands::AlterUser {
                username,
                password,
                options,
                no_createdb,
                no_createuser,
                reset,
                rename,
            } => {
                let mut user = AlterUser::new(username.as_str());
                if let Some(password) = self.resolve_password(password)? {
                    user = user.password(password);
                }
                if options.createdb || *no_createdb {
                    user = user.createdb(options.createdb);
                }
                if options.createuser || *no_createuser {
                    user = user.createuser(options.createuser);
                }
                if let Some(when) = options.valid_until {
                    user = user.valid_until(when);
                }
                if let Some(limit) = options.connection_limit {
                    user = user.connection_limit(limit);
                }
                if let Some(slots) = options.wlm_query_slot_count {
                    user = user.wlm_query_slot_count(slots);
                }
                for name in reset {
                    user = user.reset_parameter(name.as_str());
                }
                if let Some(new_name) = rename {
                    user = user.rename(new_name.as_str());
                }

                let redshift = self.redshift(false).await?;
                let sql = redshift.alter_user(&user, self.execute()).await?;
                self.output_sql(&sql);
                Ok(())
            }
            Commands::DeepCopy { table, distinct } => {
                let options = DeepCopyOptions::new().distinct(*distinct);
                self.deep_copy(table, options).await
            }
            Commands::Dedupe { table } => self.deep_copy(table, DeepCopyOptions::dedupe()).await,
            Commands::Jsonpaths { input, list_index } => self.jsonpaths(input, *list_index),
            Commands::CopyJson {
                table,
                input,
                jsonpaths,
                list_index,
                bucket,
                keypath,
                s3,
                slices,
                local_path,
                keep_s3,
                keep_local,
            } => {
                let (bucket, keypath) = match s3 {
                    Some(location) => (
                        Some(location.bucket.clone()),
                        Some(location.keypath.clone()),
                    ),
                    None => (bucket.clone(), keypath.clone()),
                };
                let records = read_records(&read_input(input)?)?;
                let first = records
                    .first()
                    .ok_or_else(|| Error::validation("input contains no records"))?;

                let paths = match jsonpaths {
                    Some(path) => serde_json::from_str::<JsonPaths>(&read_input(path)?)?,
                    None => crate::jsonpaths::gen_jsonpaths(first, *list_index)?,
                };

                let redshift = self.redshift(false).await?;

                let mut load = redshift.json_load(table.as_str());
                if let Some(keypath) = keypath {
                    load.keypath = keypath;
                }
                if let Some(slices) = slices {
                    load.slices = *slices;
                }
                if let Some(local_path) = local_path {
                    load.local_path = Some(local_path.clone());
                }
                load.clean_up_s3 &= !*keep_s3;
                load.clean_up_local &= !*keep_local;

                let store = if self.cli.dry_run {
                    let bucket = bucket
                        .as_deref()
                        .or(self.config.load.bucket.as_deref())
                        .unwrap_or("dry-run");
                    StagingStore::in_memory(bucket)
                } else {
                    redshift.staging_store(bucket.as_deref())?
                };

                let report = redshift
                    .copy_json_to_table(&store, &records, &paths, &load)
                    .await?;
                self.output_report(&report);
                Ok(())
            }
        }
    }

    /// SQL runs unless this is a dry run
    fn execute(&self) -> bool {
        !self.cli.dry_run
    }

    /// Build the management handle
    ///
    /// Dry runs record statements instead of connecting, unless the command
    /// has to read the catalog.
    async fn redshift(&self, needs_catalog: bool) -> Result<Redshift> {
        if self.cli.dry_run && !needs_catalog {
            tracing::debug!("Dry run: recording SQL instead of connecting");
            return Ok(Redshift::from_config(
                Arc::new(RecordingExecutor::new()),
                &self.config,
            ));
        }
        if !self.config.database.is_configured() {
            return Err(Error::missing_field("database.host"));
        }
        Redshift::connect(&self.config).await
    }

    /// Pick the password for a user command; generated ones are printed
    fn resolve_password(&self, args: &PasswordArgs) -> Result<Option<UserPassword>> {
        if args.disable_password {
            return Ok(Some(UserPassword::Disable));
        }
        if args.random_password {
            let generated = password::random_password(password::DEFAULT_PASSWORD_LENGTH)?;
            eprintln!("Generated password: {generated}");
            return Ok(Some(UserPassword::Plain(generated)));
        }
        match &args.password {
            Some(plain) => {
                if !is_password_hash(plain) {
                    password::validate_password(plain)?;
                }
                Ok(Some(UserPassword::Plain(plain.clone())))
            }
            None => Ok(None),
        }
    }

    fn password(&self, length: usize) -> Result<()> {
        let generated = password::random_password(length)?;
        match self.cli.format {
            OutputFormat::Text => println!("{generated}"),
            OutputFormat::Json => println!("{}", json!({ "password": generated })),
        }
        Ok(())
    }

    async fn create_user(
        &self,
        username: &str,
        password: &PasswordArgs,
        groups: &[String],
        options: &UserOptions,
    ) -> Result<()> {
        let password = self
            .resolve_password(password)?
            .ok_or_else(|| {
                Error::validation(
                    "create-user needs --password, --random-password or --disable-password",
                )
            })?;

        let mut user = CreateUser::new(username, password)
            .groups(groups)
            .createdb(options.createdb)
            .createuser(options.createuser);
        if let Some(when) = options.valid_until {
            user = user.valid_until(when);
        }
        if let Some(limit) = options.connection_limit {
            user = user.connection_limit(limit);
        }
        if let Some(slots) = options.wlm_query_slot_count {
            user = user.wlm_query_slot_count(slots);
        }

        let redshift = self.redshift(false).await?;
        let sql = redshift.create_user(&user, self.execute()).await?;
        self.output_sql(&sql);
        Ok(())
    }

    async fn deep_copy(&self, table: &TableArgs, mut options: DeepCopyOptions) -> Result<()> {
        options.copy_privileges = table.copy_privileges;

        let redshift = self.redshift(true).await?;
        let sql = redshift
            .deep_copy(
                table.schema.as_deref(),
                &table.table,
                options,
                self.execute(),
            )
            .await?;
        self.output_sql(&sql);
        Ok(())
    }

    fn jsonpaths(&self, input: &Path, list_index: Option<usize>) -> Result<()> {
        let records = read_records(&read_input(input)?)?;
        let sample = records
            .first()
            .ok_or_else(|| Error::validation("input contains no records"))?;
        let paths = crate::jsonpaths::gen_jsonpaths(sample, list_index)?;

        match self.cli.format {
            OutputFormat::Text => println!("{}", serde_json::to_string_pretty(&paths)?),
            OutputFormat::Json => println!("{}", paths.to_json()?),
        }
        Ok(())
    }

    fn output_sql(&self, sql: &str) {
        match self.cli.format {
            OutputFormat::Text => println!("{sql}"),
            OutputFormat::Json => println!(
                "{}",
                json!({ "sql": sql, "executed": self.execute() })
            ),
        }
    }

    fn output_report(&self, report: &LoadReport) {
        match self.cli.format {
            OutputFormat::Text => {
                println!("{}", report.copy_statement);
                println!(
                    "-- {} records, {} chunks, stamp {}, {:?}",
                    report.records,
                    report.chunk_count(),
                    report.stamp,
                    report.elapsed
                );
                for path in &report.local_files {
                    println!("-- kept {}", path.display());
                }
            }
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "stamp": report.stamp,
                    "records": report.records,
                    "keys": report.keys,
                    "manifest": report.manifest_url,
                    "jsonpaths": report.jsonpaths_url,
                    "copy": report.copy_statement,
                    "cleaned_up_s3": report.cleaned_up_s3,
                    "local_directory": report.local_directory,
                    "local_files": report.local_files,
                    "elapsed_ms": report.elapsed.as_millis() as u64,
                    "executed": self.execute(),
                })
            ),
        }
    }
}

/// Logging filter: `RUST_LOG` when set, otherwise `default_level`
pub fn log_filter(rust_log: Option<&str>, default_level: tracing::Level) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(default_level.into()))
}

/// Redshift accepts `md5<hex>` and `sha256|...` hashes in place of a password
fn is_password_hash(password: &str) -> bool {
    (password.len() == 35 && password.starts_with("md5")) || password.starts_with("sha256|")
}

/// Read a file, or stdin for `-`
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Parse a JSON array, a single JSON object or newline-delimited JSON
pub(crate) fn read_records(text: &str) -> Result<Vec<Value>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return match serde_json::from_str(trimmed)? {
            Value::Array(records) => Ok(records),
            other => Ok(vec![other]),
        };
    }
    if let Ok(single) = serde_json::from_str::<Value>(trimmed) {
        return Ok(vec![single]);
    }
    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn runner(args: &[&str]) -> Runner {
        let cli = Cli::try_parse_from(args).unwrap();
        Runner::new(cli, ShiftConfig::default())
    }

    #[test]
    fn test_read_records_formats() {
        let array = read_records(r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        assert_eq!(array.len(), 2);

        let ndjson = read_records("{\"a\": 1}\n\n{\"a\": 2}\n{\"a\": 3}\n").unwrap();
        assert_eq!(ndjson.len(), 3);
        assert_eq!(ndjson[2]["a"], 3);

        let single = read_records("{\"a\": {\"b\": 1}}").unwrap();
        assert_eq!(single.len(), 1);

        assert!(read_records("{\"a\": 1}\nnot json").is_err());
    }

    #[test]
    fn test_log_filter() {
        use tracing::level_filters::LevelFilter;
        use tracing::Level;

        let hint = |rust_log, level| log_filter(rust_log, level).max_level_hint();
        assert_eq!(hint(None, Level::INFO), Some(LevelFilter::INFO));
        assert_eq!(hint(Some("warn"), Level::INFO), Some(LevelFilter::WARN));
        assert_eq!(hint(Some("error"), Level::DEBUG), Some(LevelFilter::ERROR));
        assert_eq!(hint(Some(""), Level::DEBUG), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_password_hash_detection() {
        assert!(is_password_hash("md5153b0e2f4e3c8a5e4f4a0e6a1b2c3d4e"));
        assert!(is_password_hash("sha256|Mypassword1"));
        assert!(!is_password_hash("swiperpass"));
    }

    #[test]
    fn test_resolve_password() {
        let runner = runner(&["shiftmanager", "password"]);

        let disabled = PasswordArgs {
            disable_password: true,
            ..PasswordArgs::default()
        };
        assert_eq!(
            runner.resolve_password(&disabled).unwrap(),
            Some(UserPassword::Disable)
        );

        let random = PasswordArgs {
            random_password: true,
            ..PasswordArgs::default()
        };
        match runner.resolve_password(&random).unwrap() {
            Some(UserPassword::Plain(p)) => assert_eq!(p.len(), 64),
            other => panic!("unexpected {other:?}"),
        }

        let weak = PasswordArgs {
            password: Some("short".to_string()),
            ..PasswordArgs::default()
        };
        assert!(runner.resolve_password(&weak).is_err());

        assert_eq!(runner.resolve_password(&PasswordArgs::default()).unwrap(), None);
    }

    #[tokio::test]
    async fn test_dry_run_create_user() {
        let runner = runner(&[
            "shiftmanager",
            "--dry-run",
            "create-user",
            "swiper",
            "--password",
            "Swiperpass1",
            "--group",
            "analyticsusers",
        ]);
        assert!(!runner.execute());
        runner.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_user_requires_password() {
        let runner = runner(&["shiftmanager", "--dry-run", "create-user", "swiper"]);
        assert!(matches!(runner.run().await, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_missing_database_config() {
        let runner = runner(&["shiftmanager", "dedupe", "events"]);
        assert!(matches!(
            runner.run().await,
            Err(Error::MissingConfigField { .. })
        ));
    }

    #[tokio::test]
    async fn test_dry_run_copy_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.json");
        std::fs::write(&input, "{\"a\": 1}\n{\"a\": 2}\n").unwrap();

        let cli = Cli::try_parse_from([
            "shiftmanager",
            "--dry-run",
            "copy-json",
            "foo_table",
            "--input",
            input.to_str().unwrap(),
            "--slices",
            "2",
        ])
        .unwrap();
        let mut config = ShiftConfig::default();
        config.aws.access_key_id = Some("access_key".to_string());
        config.aws.secret_access_key = Some("secret_key".to_string());

        Runner::new(cli, config).run().await.unwrap();
    }

    #[test]
    fn test_parse_s3_location() {
        let cli = Cli::try_parse_from([
            "shiftmanager",
            "copy-json",
            "foo_table",
            "--input",
            "records.json",
            "--s3",
            "s3://com.simple.mock/tmp/tests",
        ])
        .unwrap();
        match cli.command {
            Commands::CopyJson { s3, .. } => {
                let location = s3.unwrap();
                assert_eq!(location.bucket, "com.simple.mock");
                assert_eq!(location.keypath, "tmp/tests/");
            }
            other => panic!("unexpected {other:?}"),
        }

        let base = ["shiftmanager", "copy-json", "t", "--input", "x.json"];
        let with = |extra: &[&'static str]| {
            let mut args = base.to_vec();
            args.extend_from_slice(extra);
            Cli::try_parse_from(args)
        };
        assert!(with(&["--s3", "s3://b/p", "--bucket", "other"]).is_err());
        assert!(with(&["--s3", "s3://b/p", "--keypath", "other/"]).is_err());
        assert!(with(&["--s3", "gs://b/p"]).is_err());
        assert!(with(&["--s3", "s3://b/run#1/"]).is_err());
    }

    #[tokio::test]
    async fn test_dry_run_copy_json_to_s3_url() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.json");
        std::fs::write(&input, "[{\"a\": 1}, {\"a\": 2}]").unwrap();

        let cli = Cli::try_parse_from([
            "shiftmanager",
            "--dry-run",
            "--format",
            "json",
            "copy-json",
            "foo_table",
            "--input",
            input.to_str().unwrap(),
            "--s3",
            "s3://com.simple.mock/tmp/tests/",
        ])
        .unwrap();
        let mut config = ShiftConfig::default();
        config.aws.iam_role = Some("arn:aws:iam::123456789012:role/loader".to_string());

        Runner::new(cli, config).run().await.unwrap();
    }

    #[test]
    fn test_parse_cli() {
        let cli = Cli::try_parse_from([
            "shiftmanager",
            "alter-user",
            "swiper",
            "--no-createdb",
            "--connection-limit",
            "unlimited",
            "--valid-until",
            "2030-06-01",
        ])
        .unwrap();
        match cli.command {
            Commands::AlterUser {
                no_createdb,
                options,
                ..
            } => {
                assert!(no_createdb);
                assert_eq!(
                    options.connection_limit,
                    Some(crate::types::ConnectionLimit::Unlimited)
                );
                assert_eq!(
                    options.valid_until.map(|t| t.to_string()).as_deref(),
                    Some("2030-06-01 00:00:00")
                );
            }
            other => panic!("unexpected {other:?}"),
        }

        let conflicting = ["shiftmanager", "alter-user", "x", "--createdb", "--no-createdb"];
        assert!(Cli::try_parse_from(conflicting).is_err());
    }
}
