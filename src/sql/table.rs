//! Table definitions and CREATE TABLE rendering

use super::quote::{ident, quote_ident};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A column of a Redshift table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Type as Redshift prints it (e.g. `integer`, `character varying(256)`)
    #[serde(rename = "type")]
    pub data_type: String,
    /// Compression encoding (`lzo`, `zstd`, ...); `none` is omitted
    #[serde(default)]
    pub encoding: Option<String>,
    /// NOT NULL constraint
    #[serde(default)]
    pub not_null: bool,
    /// Default expression, emitted verbatim
    #[serde(default)]
    pub default: Option<String>,
}

impl Column {
    /// Create a nullable column without encoding or default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            encoding: None,
            not_null: false,
            default: None,
        }
    }

    /// Set the compression encoding
    #[must_use]
    pub fn encode(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Mark as NOT NULL
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Set a default expression
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    fn render(&self) -> Result<String> {
        let mut line = format!("{} {}", ident(&self.name)?, self.data_type);
        if let Some(encoding) = self
            .encoding
            .as_deref()
            .filter(|e| !e.eq_ignore_ascii_case("none"))
        {
            line.push_str(&format!(" ENCODE {encoding}"));
        }
        if let Some(default) = &self.default {
            line.push_str(&format!(" DEFAULT {default}"));
        }
        if self.not_null {
            line.push_str(" NOT NULL");
        }
        Ok(line)
    }
}

/// Distribution style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistStyle {
    Auto,
    Even,
    Key,
    All,
}

impl DistStyle {
    /// Decode `pg_class.reldiststyle`
    pub fn from_reldiststyle(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Even),
            1 => Some(Self::Key),
            8 => Some(Self::All),
            10..=12 => Some(Self::Auto),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Even => "EVEN",
            Self::Key => "KEY",
            Self::All => "ALL",
        }
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Compound(Vec<String>),
    Interleaved(Vec<String>),
}

impl SortKey {
    fn render(&self) -> Result<String> {
        let (kind, columns) = match self {
            Self::Compound(columns) => ("COMPOUND", columns),
            Self::Interleaved(columns) => ("INTERLEAVED", columns),
        };
        if columns.is_empty() {
            return Err(Error::validation("sort key needs at least one column"));
        }
        let columns = columns
            .iter()
            .map(|c| ident(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{kind} SORTKEY ({})", columns.join(", ")))
    }
}

/// A Redshift table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Schema; unqualified when absent
    #[serde(default)]
    pub schema: Option<String>,
    /// Table name
    pub name: String,
    /// Columns in ordinal order
    pub columns: Vec<Column>,
    /// Distribution style
    #[serde(default)]
    pub dist_style: Option<DistStyle>,
    /// Distribution key column
    #[serde(default)]
    pub dist_key: Option<String>,
    /// Sort key
    #[serde(default)]
    pub sort_key: Option<SortKey>,
}

impl TableDef {
    /// Create an unqualified table with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            dist_style: None,
            dist_key: None,
            sort_key: None,
        }
    }

    /// Set the schema
    #[must_use]
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Append a column
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the distribution style
    #[must_use]
    pub fn dist_style(mut self, style: DistStyle) -> Self {
        self.dist_style = Some(style);
        self
    }

    /// Distribute on a key column (implies DISTSTYLE KEY)
    #[must_use]
    pub fn dist_key(mut self, column: impl Into<String>) -> Self {
        self.dist_key = Some(column.into());
        self
    }

    /// Set the sort key
    #[must_use]
    pub fn sort_key(mut self, key: SortKey) -> Self {
        self.sort_key = Some(key);
        self
    }

    /// Schema-qualified, quoted table name
    pub fn qualified_name(&self) -> Result<String> {
        self.qualified_name_with("")
    }

    /// Qualified name of a sibling table named `{name}{suffix}`
    pub fn qualified_name_with(&self, suffix: &str) -> Result<String> {
        let table = ident(&format!("{}{suffix}", self.name))?;
        match &self.schema {
            Some(schema) => Ok(format!("{}.{table}", ident(schema)?)),
            None => Ok(table),
        }
    }

    /// Quoted name without schema
    pub fn bare_name_with(&self, suffix: &str) -> Result<String> {
        ident(&format!("{}{suffix}", self.name))
    }

    /// Human-readable `schema.name` for messages and logs
    pub fn display_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }

    /// Render CREATE TABLE
    ///
    /// Columns go one per line, table attributes follow the closing
    /// parenthesis one per line. No terminating semicolon.
    pub fn create_statement(&self) -> Result<String> {
        if self.columns.is_empty() {
            return Err(Error::validation(format!(
                "table {} has no columns",
                self.display_name()
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| Ok(format!("\t{}", c.render()?)))
            .collect::<Result<Vec<_>>>()?;

        let mut out = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.qualified_name()?,
            columns.join(",\n")
        );

        let mut attributes = Vec::new();
        let style = match (&self.dist_style, &self.dist_key) {
            (None, Some(_)) => Some(DistStyle::Key),
            (style, _) => *style,
        };
        if let Some(style) = style {
            attributes.push(format!("DISTSTYLE {}", style.keyword()));
        }
        if let Some(key) = &self.dist_key {
            if style != Some(DistStyle::Key) {
                return Err(Error::validation(
                    "a distribution key requires DISTSTYLE KEY",
                ));
            }
            attributes.push(format!("DISTKEY ({})", ident(key)?));
        }
        if let Some(sort_key) = &self.sort_key {
            attributes.push(sort_key.render()?);
        }
        for attribute in attributes {
            out.push('\n');
            out.push_str(&attribute);
        }
        Ok(out)
    }
}
