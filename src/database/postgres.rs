//! Redshift connection over the Postgres wire protocol (sqlx)

use super::executor::{Row, SqlExecutor};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Column as _, ConnectOptions, Connection, Row as _};
use std::str::FromStr;
use std::time::Instant;
use tokio::sync::Mutex;

/// A single Redshift connection
///
/// Statements are serialized through one connection; there is no pool.
pub struct RedshiftConnection {
    conn: Mutex<PgConnection>,
    /// Connection target without credentials (for logging)
    target: String,
}

impl RedshiftConnection {
    /// Connect using the configured settings
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = Self::build_options(config)?;
        let target = format!(
            "{}:{}/{}",
            options.get_host(),
            options.get_port(),
            options.get_database().unwrap_or_default()
        );

        tracing::info!("Connecting to Redshift at {}", target);
        let conn = options.connect().await?;

        Ok(Self {
            conn: Mutex::new(conn),
            target,
        })
    }

    /// Build connection options from config
    fn build_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
        // A URL takes precedence over the individual fields
        if let Some(url) = &config.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| Error::config(format!("Invalid database URL: {e}")));
        }

        let host = config
            .host
            .as_deref()
            .ok_or_else(|| Error::missing_field("database.host"))?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(config.port())
            .ssl_mode(config.ssl_mode().into())
            .application_name("shiftmanager");

        if let Some(database) = &config.database {
            options = options.database(database);
        }
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        Ok(options)
    }

    /// Run a trivial query to verify the connection
    pub async fn check(&self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        conn.ping().await?;
        tracing::debug!("Connection to {} is healthy", self.target);
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for RedshiftConnection {
    async fn execute(&self, sql: &str) -> Result<u64> {
        tracing::debug!("Executing batch:\n{}", sql);
        let start = Instant::now();

        let mut conn = self.conn.lock().await;
        let mut tx = conn.begin().await?;
        // No bind arguments, so the batch goes over the simple query protocol
        let result = sqlx::Executor::execute(&mut *tx, sql).await?;
        tx.commit().await?;

        tracing::debug!(
            "Batch finished in {}ms ({} rows affected)",
            start.elapsed().as_millis(),
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!("Executing query: {}", sql);

        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;

        rows.iter()
            .map(|row| -> Result<Row> {
                let columns = row
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>();
                let values = (0..columns.len())
                    .map(|i| row.try_get::<Option<String>, _>(i))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Row::new(columns, values))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_require_host() {
        let err = RedshiftConnection::build_options(&DatabaseConfig::default()).unwrap_err();
        assert!(err.to_string().contains("database.host"));
    }

    #[test]
    fn test_options_from_fields() {
        let config = DatabaseConfig {
            host: Some("cluster.example.com".to_string()),
            database: Some("analytics".to_string()),
            user: Some("admin".to_string()),
            ..Default::default()
        };
        let options = RedshiftConnection::build_options(&config).unwrap();
        assert_eq!(options.get_host(), "cluster.example.com");
        assert_eq!(options.get_port(), 5439);
        assert_eq!(options.get_database(), Some("analytics"));
        assert_eq!(options.get_username(), "admin");
    }

    #[test]
    fn test_options_from_url() {
        let config = DatabaseConfig {
            url: Some("postgres://loader:pw@warehouse:5440/dev".to_string()),
            host: Some("ignored".to_string()),
            ..Default::default()
        };
        let options = RedshiftConnection::build_options(&config).unwrap();
        assert_eq!(options.get_host(), "warehouse");
        assert_eq!(options.get_port(), 5440);
    }
}
