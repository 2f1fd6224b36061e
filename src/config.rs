//! Configuration file and environment handling
//!
//! The configuration is a YAML document with four optional sections:
//!
//! ```yaml
//! database:
//!   host: example.redshift.amazonaws.com
//!   port: 5439
//!   database: analytics
//!   user: admin
//!   password: "{{ env.REDSHIFT_PASSWORD }}"
//!   ssl_mode: require
//! aws:
//!   access_key_id: "{{ env.AWS_ACCESS_KEY_ID }}"
//!   secret_access_key: "{{ env.AWS_SECRET_ACCESS_KEY }}"
//!   region: us-east-1
//! load:
//!   bucket: com.example.staging
//!   keypath: tmp/shiftmanager/
//!   slices: 32
//! logging:
//!   level: INFO
//! ```
//!
//! The text is rendered through [`crate::template`] before parsing. Sections
//! or fields left out fall back to the usual `PG*` and `AWS_*` variables.

use crate::error::{Error, Result};
use crate::template::{self, TemplateContext};
use crate::types::{LogLevel, SslMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default Redshift port
pub const DEFAULT_PORT: u16 = 5439;

/// Default number of chunk files per load
pub const DEFAULT_SLICES: usize = 32;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete shiftmanager configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftConfig {
    /// Redshift connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// AWS credentials used for staging uploads and COPY
    #[serde(default)]
    pub aws: AwsConfig,

    /// Defaults for JSON loads
    #[serde(default)]
    pub load: LoadDefaults,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ShiftConfig {
    /// Load configuration from a YAML file, interpolating the process environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        let ctx = TemplateContext::from_env();
        let mut config = Self::from_str_with(&content, &ctx)?;
        config.apply_env(&ctx.env);
        Ok(config)
    }

    /// Build configuration purely from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(&std::env::vars().collect());
        config
    }

    /// Parse a YAML string after rendering templates against `ctx`
    pub fn from_str_with(yaml: &str, ctx: &TemplateContext) -> Result<Self> {
        let rendered = template::render(yaml, ctx)?;
        if rendered.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&rendered)
            .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Fill unset fields from the given environment map
    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        self.database.apply_env(env);
        self.aws.apply_env(env);
    }

    /// Validate values that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.load.slices == 0 {
            return Err(Error::config("load.slices must be at least 1"));
        }
        if let Some(keypath) = &self.load.keypath {
            if keypath.starts_with('/') {
                return Err(Error::config(
                    "load.keypath must be relative to the bucket (no leading '/')",
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Database
// ============================================================================

/// Redshift connection settings
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields
    #[serde(default)]
    pub url: Option<String>,

    /// Cluster endpoint
    #[serde(default)]
    pub host: Option<String>,

    /// Port (5439 when unset)
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name
    #[serde(default)]
    pub database: Option<String>,

    /// User name
    #[serde(default)]
    pub user: Option<String>,

    /// Password
    #[serde(default)]
    pub password: Option<String>,

    /// TLS mode
    #[serde(default)]
    pub ssl_mode: Option<SslMode>,
}

impl DatabaseConfig {
    fn apply_env(&mut self, env: &HashMap<String, String>) {
        fill(&mut self.url, env, "REDSHIFT_URL");
        fill(&mut self.host, env, "PGHOST");
        fill(&mut self.database, env, "PGDATABASE");
        fill(&mut self.user, env, "PGUSER");
        fill(&mut self.password, env, "PGPASSWORD");
        if self.port.is_none() {
            self.port = env.get("PGPORT").and_then(|p| p.parse().ok());
        }
        if self.ssl_mode.is_none() {
            self.ssl_mode = env.get("PGSSLMODE").and_then(|m| SslMode::parse(m));
        }
    }

    /// Port, defaulting to the Redshift port
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// TLS mode, defaulting to `prefer`
    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode.unwrap_or_default()
    }

    /// Whether enough settings are present to attempt a connection
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.host.is_some()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

// ============================================================================
// AWS
// ============================================================================

/// AWS settings for S3 staging and the COPY authorization clause
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Access key id
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[serde(default)]
    pub session_token: Option<String>,

    /// IAM role attached to the cluster; used for COPY instead of keys when set
    #[serde(default)]
    pub iam_role: Option<String>,

    /// Bucket region
    #[serde(default)]
    pub region: Option<String>,

    /// Custom S3 endpoint (MinIO, localstack)
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AwsConfig {
    fn apply_env(&mut self, env: &HashMap<String, String>) {
        fill(&mut self.access_key_id, env, "AWS_ACCESS_KEY_ID");
        fill(&mut self.secret_access_key, env, "AWS_SECRET_ACCESS_KEY");
        fill(&mut self.session_token, env, "AWS_SESSION_TOKEN");
        fill(&mut self.region, env, "AWS_REGION");
        fill(&mut self.region, env, "AWS_DEFAULT_REGION");
        fill(&mut self.endpoint, env, "AWS_ENDPOINT");
    }
}

impl fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsConfig")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("iam_role", &self.iam_role)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// ============================================================================
// Load Defaults
// ============================================================================

/// Defaults applied to JSON loads when the caller does not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadDefaults {
    /// Staging bucket
    #[serde(default)]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket
    #[serde(default)]
    pub keypath: Option<String>,

    /// Number of chunk files
    #[serde(default = "default_slices")]
    pub slices: usize,

    /// Directory for local chunk files (a temporary directory when unset)
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// Delete staged objects after the COPY
    #[serde(default = "default_true")]
    pub clean_up_s3: bool,

    /// Delete local chunk files after the COPY
    #[serde(default = "default_true")]
    pub clean_up_local: bool,
}

impl Default for LoadDefaults {
    fn default() -> Self {
        Self {
            bucket: None,
            keypath: None,
            slices: DEFAULT_SLICES,
            local_path: None,
            clean_up_s3: true,
            clean_up_local: true,
        }
    }
}

fn default_slices() -> usize {
    DEFAULT_SLICES
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Logging
// ============================================================================

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    #[serde(default)]
    pub level: LogLevel,
}

fn fill(slot: &mut Option<String>, env: &HashMap<String, String>, key: &str) {
    if slot.is_none() {
        if let Some(value) = env.get(key).filter(|v| !v.is_empty()) {
            *slot = Some(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_config() {
        let mut ctx = TemplateContext::new();
        ctx.set_env("REDSHIFT_PASSWORD", "s3cret");

        let yaml = r#"
database:
  host: cluster.example.com
  database: analytics
  user: admin
  password: "{{ env.REDSHIFT_PASSWORD }}"
  ssl_mode: require
aws:
  access_key_id: AKIA123
  secret_access_key: abc
load:
  bucket: com.simple.mock
  keypath: tmp/tests/
  slices: 8
  clean_up_local: false
logging:
  level: DEBUG
"#;
        let config = ShiftConfig::from_str_with(yaml, &ctx).unwrap();

        assert_eq!(config.database.password.as_deref(), Some("s3cret"));
        assert_eq!(config.database.port(), DEFAULT_PORT);
        assert_eq!(config.database.ssl_mode(), SslMode::Require);
        assert_eq!(config.aws.access_key_id.as_deref(), Some("AKIA123"));
        assert_eq!(config.load.slices, 8);
        assert!(config.load.clean_up_s3);
        assert!(!config.load.clean_up_local);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ShiftConfig::from_str_with("", &TemplateContext::new()).unwrap();
        assert_eq!(config.load.slices, DEFAULT_SLICES);
        assert!(config.load.clean_up_s3);
        assert!(!config.database.is_configured());
    }

    #[test]
    fn test_missing_env_var_is_error() {
        let yaml = "database:\n  password: \"{{ env.NOT_SET_ANYWHERE }}\"\n";
        let err = ShiftConfig::from_str_with(yaml, &TemplateContext::new()).unwrap_err();
        assert!(err.to_string().contains("env.NOT_SET_ANYWHERE"));
    }

    #[test]
    fn test_zero_slices_rejected() {
        let err = ShiftConfig::from_str_with("load:\n  slices: 0\n", &TemplateContext::new())
            .unwrap_err();
        assert!(err.to_string().contains("slices"));
    }

    #[test]
    fn test_apply_env_fills_gaps_only() {
        let mut config = ShiftConfig::default();
        config.database.host = Some("from-file".to_string());
        config.apply_env(&env(&[
            ("PGHOST", "from-env"),
            ("PGPORT", "5440"),
            ("PGUSER", "loader"),
            ("AWS_ACCESS_KEY_ID", "AKIAENV"),
            ("AWS_DEFAULT_REGION", "eu-west-1"),
        ]));

        assert_eq!(config.database.host.as_deref(), Some("from-file"));
        assert_eq!(config.database.port(), 5440);
        assert_eq!(config.database.user.as_deref(), Some("loader"));
        assert_eq!(config.aws.access_key_id.as_deref(), Some("AKIAENV"));
        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ShiftConfig::default();
        config.database.password = Some("topsecret".to_string());
        config.aws.secret_access_key = Some("alsosecret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("alsosecret"));
        assert!(debug.contains("<redacted>"));
    }
}
