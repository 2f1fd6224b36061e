//! Catalog reflection: rebuild a `TableDef` and its privileges from Redshift

use super::executor::SqlExecutor;
use crate::error::{Error, Result};
use crate::sql::{parse_acl, quote_literal, AclEntry, Column, DistStyle, SortKey, TableDef};

/// Schema used when the caller does not name one
pub const DEFAULT_SCHEMA: &str = "public";

/// A reflected table with its ownership and grants
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub table: TableDef,
    pub owner: Option<String>,
    pub acl: Vec<AclEntry>,
}

fn columns_query(schema: &str, table: &str) -> String {
    format!(
        "SELECT a.attname::text AS column_name, \
         format_type(a.atttypid, a.atttypmod)::text AS data_type, \
         format_encoding(a.attencodingtype::integer)::text AS encoding, \
         a.attisdistkey::text AS distkey, \
         a.attsortkeyord::text AS sortkey, \
         a.attnotnull::text AS not_null, \
         pg_get_expr(d.adbin, d.adrelid)::text AS default_expr \
         FROM pg_attribute a \
         JOIN pg_class c ON c.oid = a.attrelid \
         JOIN pg_namespace n ON n.oid = c.relnamespace \
         LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum \
         WHERE n.nspname = {} AND c.relname = {} AND a.attnum > 0 AND NOT a.attisdropped \
         ORDER BY a.attnum",
        quote_literal(schema),
        quote_literal(table)
    )
}

fn class_query(schema: &str, table: &str) -> String {
    format!(
        "SELECT pg_get_userbyid(c.relowner)::text AS owner, \
         array_to_string(c.relacl, ',') AS acl, \
         c.reldiststyle::text AS diststyle \
         FROM pg_class c \
         JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE n.nspname = {} AND c.relname = {}",
        quote_literal(schema),
        quote_literal(table)
    )
}

/// Reflect a table's columns, distribution and sort keys, owner and ACL
pub async fn reflect_table(
    executor: &dyn SqlExecutor,
    schema: Option<&str>,
    table: &str,
) -> Result<TableInfo> {
    let schema_name = schema.unwrap_or(DEFAULT_SCHEMA);
    let qualified_name = format!("{schema_name}.{table}");

    let class_rows = executor.query(&class_query(schema_name, table)).await?;
    let class = class_rows.first().ok_or_else(|| Error::TableNotFound {
        table: qualified_name.clone(),
    })?;

    let column_rows = executor.query(&columns_query(schema_name, table)).await?;
    if column_rows.is_empty() {
        return Err(Error::TableNotFound { table: qualified_name });
    }

    let mut def = TableDef::new(table);
    if let Some(schema) = schema {
        def = def.in_schema(schema);
    }

    let mut compound = Vec::new();
    let mut interleaved = Vec::new();

    for row in &column_rows {
        let name = row.require("column_name")?;
        let mut column = Column::new(name, row.require("data_type")?);
        if let Some(encoding) = row.get("encoding") {
            column = column.encode(encoding);
        }
        if row.get_bool("not_null") {
            column = column.not_null();
        }
        if let Some(default) = row.get("default_expr") {
            column = column.default_expr(default);
        }
        if row.get_bool("distkey") {
            def.dist_key = Some(name.to_string());
        }
        match row.get_i64("sortkey").unwrap_or(0) {
            0 => {}
            pos if pos > 0 => compound.push((pos, name.to_string())),
            pos => interleaved.push((-pos, name.to_string())),
        }
        def.columns.push(column);
    }

    def.dist_style = class
        .get_i64("diststyle")
        .and_then(DistStyle::from_reldiststyle);
    // AUTO tables may carry a chosen key; CREATE TABLE accepts a key only with KEY
    if def.dist_style != Some(DistStyle::Key) {
        def.dist_key = None;
    }

    def.sort_key = if !interleaved.is_empty() {
        interleaved.sort();
        Some(SortKey::Interleaved(
            interleaved.into_iter().map(|(_, c)| c).collect(),
        ))
    } else if !compound.is_empty() {
        compound.sort();
        Some(SortKey::Compound(
            compound.into_iter().map(|(_, c)| c).collect(),
        ))
    } else {
        None
    };

    let acl = match class.get("acl").filter(|a| !a.is_empty()) {
        Some(acl) => parse_acl(acl)?,
        None => Vec::new(),
    };

    tracing::debug!(
        "Reflected {} with {} columns and {} ACL entries",
        qualified_name,
        def.columns.len(),
        acl.len()
    );

    Ok(TableInfo {
        table: def,
        owner: class.get("owner").map(str::to_string),
        acl,
    })
}
