//! SQL generation module
//!
//! Builds the administrative statements shiftmanager runs against Redshift.
//!
//! # Overview
//!
//! The sql module provides:
//! - `CreateUser` / `AlterUser` and group helpers
//! - `TableDef` with CREATE TABLE rendering
//! - ACL parsing and GRANT rendering for privilege carry-over
//! - `deep_copy` for table rewrites and deduplication
//! - `CopyCommand` for staged JSON loads
//!
//! Multi-statement batches are joined with `";\n"` and carry no trailing
//! semicolon.

mod copy;
mod deep_copy;
mod privileges;
mod quote;
mod table;
mod user;

pub use copy::{CopyAuthorization, CopyCommand, CopyOptions};
pub use deep_copy::{deep_copy, DeepCopyOptions, OUTGOING_SUFFIX};
pub use privileges::{grant_statements, parse_acl, AclEntry, Grantee, Privilege};
pub use quote::{ident, qualified, quote_ident, quote_literal, validate_ident, MAX_IDENT_BYTES};
pub use table::{Column, DistStyle, SortKey, TableDef};
pub use user::{
    alter_group, create_group, drop_user, AlterUser, CreateUser, GroupChange, ParamValue,
    UserPassword,
};

/// Join statements into one batch
pub fn join_statements<S: AsRef<str>>(statements: &[S]) -> String {
    statements
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(";\n")
}

/// Normalize a batch for comparison: trim each line and drop blank lines
pub fn cleaned(statement: &str) -> String {
    statement
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
