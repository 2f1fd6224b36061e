//! The seam between SQL generation and the database client

use crate::error::{Error, Result};
use async_trait::async_trait;

/// A result row with every value rendered as text
///
/// Catalog queries cast their columns to `text`, so one representation
/// covers everything shiftmanager reads back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl Row {
    /// Build a row from column names and values
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(c, v)| (c.to_string(), v.map(str::to_string)))
            .unzip();
        Self { columns, values }
    }

    /// Value of a column, `None` for SQL NULL or a missing column
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)?.as_deref()
    }

    /// Value of a column that must be present and non-NULL
    pub fn require(&self, column: &str) -> Result<&str> {
        self.get(column)
            .ok_or_else(|| Error::query_result(format!("column '{column}' is missing or NULL")))
    }

    /// Boolean column (`true`/`t`)
    pub fn get_bool(&self, column: &str) -> bool {
        matches!(self.get(column), Some("true" | "t"))
    }

    /// Integer column
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(|v| v.trim().parse().ok())
    }

    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Something that can run SQL against Redshift
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a batch of statements in a single transaction, returning rows affected
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Run a query and return its rows
    ///
    /// Values are read as text; cast non-text columns with `::text`.
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
}
