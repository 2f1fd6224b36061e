//! Deep copy: rebuild a table by renaming it away, recreating it and
//! reinserting its rows
//!
//! A deep copy re-sorts the data and reclaims space faster than VACUUM, and
//! with DISTINCT it removes duplicate rows.

use super::join_statements;
use super::privileges::{grant_statements, AclEntry};
use super::table::TableDef;
use crate::error::{Error, Result};

/// Suffix of the table holding the old rows during the copy
pub const OUTGOING_SUFFIX: &str = "$outgoing";

/// Options for [`deep_copy`]
#[derive(Debug, Clone, Default)]
pub struct DeepCopyOptions {
    /// INSERT ... SELECT DISTINCT, dropping duplicate rows
    pub distinct: bool,
    /// Replay the old table's owner and grants onto the new table
    pub copy_privileges: bool,
    /// Owner of the table, when known
    pub owner: Option<String>,
    /// ACL entries of the table, when known
    pub acl: Vec<AclEntry>,
    /// Definition to create instead of the current one (new keys, encodings)
    pub new_definition: Option<TableDef>,
}

impl DeepCopyOptions {
    /// Options for a plain deep copy
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a deduplicating deep copy
    pub fn dedupe() -> Self {
        Self {
            distinct: true,
            ..Self::default()
        }
    }

    /// Remove duplicate rows
    #[must_use]
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Carry the owner and grants over to the new table
    #[must_use]
    pub fn with_privileges(mut self, owner: Option<String>, acl: Vec<AclEntry>) -> Self {
        self.copy_privileges = true;
        self.owner = owner;
        self.acl = acl;
        self
    }

    /// Recreate the table from a different definition
    #[must_use]
    pub fn with_definition(mut self, table: TableDef) -> Self {
        self.new_definition = Some(table);
        self
    }
}

/// Render the deep copy batch for `table`
///
/// ```text
/// LOCK TABLE t;
/// ALTER TABLE t RENAME TO t$outgoing;
/// CREATE TABLE t (...)
/// ;
/// INSERT INTO t SELECT [DISTINCT] * from t$outgoing;
/// DROP TABLE t$outgoing
/// ```
pub fn deep_copy(table: &TableDef, options: &DeepCopyOptions) -> Result<String> {
    let definition = match &options.new_definition {
        Some(new) => {
            if new.name != table.name || new.schema != table.schema {
                return Err(Error::validation(format!(
                    "replacement definition for {} names a different table ({})",
                    table.display_name(),
                    new.display_name()
                )));
            }
            new
        }
        None => table,
    };

    let name = table.qualified_name()?;
    let outgoing = table.qualified_name_with(OUTGOING_SUFFIX)?;
    let outgoing_bare = table.bare_name_with(OUTGOING_SUFFIX)?;

    let mut statements = vec![
        format!("LOCK TABLE {name}"),
        format!("ALTER TABLE {name} RENAME TO {outgoing_bare}"),
        format!("{}\n", definition.create_statement()?),
    ];

    if options.copy_privileges {
        if let Some(owner) = &options.owner {
            statements.push(format!(
                "ALTER TABLE {name} OWNER TO {}",
                super::quote::ident(owner)?
            ));
        }
        statements.extend(grant_statements(
            &options.acl,
            &name,
            options.owner.as_deref(),
        )?);
    }

    let distinct = if options.distinct { "DISTINCT " } else { "" };
    statements.push(format!(
        "INSERT INTO {name} SELECT {distinct}* from {outgoing}"
    ));
    statements.push(format!("DROP TABLE {outgoing}"));

    Ok(join_statements(&statements))
}
