//! In-memory executor that records SQL instead of running it
//!
//! Backs `--dry-run` and the test suites. Queries are answered from canned
//! rows registered by substring match.

use super::executor::{Row, SqlExecutor};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Records every executed batch and serves canned query results
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, Vec<Row>)>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingExecutor {
    /// Create an executor with no canned responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any query containing `needle` with `rows`
    #[must_use]
    pub fn with_response(self, needle: impl Into<String>, rows: Vec<Row>) -> Self {
        lock(&self.responses).push((needle.into(), rows));
        self
    }

    /// Make `execute` fail for batches containing `needle`
    #[must_use]
    pub fn failing_on(self, needle: impl Into<String>) -> Self {
        *lock(&self.fail_on) = Some(needle.into());
        self
    }

    /// Batches passed to `execute`, in order
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }

    /// The most recent batch passed to `execute`
    pub fn last_executed(&self) -> Option<String> {
        lock(&self.executed).last().cloned()
    }

    /// Queries passed to `query`, in order
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panic while holding the lock leaves plain data behind; keep going
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str) -> Result<u64> {
        tracing::debug!("Recording batch:\n{}", sql);
        lock(&self.executed).push(sql.to_string());

        if let Some(needle) = lock(&self.fail_on).as_deref() {
            if sql.contains(needle) {
                return Err(Error::query_result(format!(
                    "simulated failure on statement containing '{needle}'"
                )));
            }
        }
        Ok(0)
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        lock(&self.queries).push(sql.to_string());
        Ok(lock(&self.responses)
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_batches() {
        let executor = RecordingExecutor::new();
        executor.execute("SELECT 1").await.unwrap();
        executor.execute("SELECT 2").await.unwrap();
        assert_eq!(executor.executed(), vec!["SELECT 1", "SELECT 2"]);
        assert_eq!(executor.last_executed().as_deref(), Some("SELECT 2"));
    }

    #[tokio::test]
    async fn test_canned_responses() {
        let executor = RecordingExecutor::new().with_response(
            "pg_table_def",
            vec![Row::from_pairs([("column", Some("id"))])],
        );

        let rows = executor
            .query("SELECT * FROM pg_table_def WHERE tablename = 'x'")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("column"), Some("id"));

        assert!(executor.query("SELECT 1").await.unwrap().is_empty());
        assert_eq!(executor.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_on() {
        let executor = RecordingExecutor::new().failing_on("COPY");
        assert!(executor.execute("COPY t FROM 's3://b/k'").await.is_err());
        assert!(executor.execute("SELECT 1").await.is_ok());
        assert_eq!(executor.executed().len(), 2);
    }
}
