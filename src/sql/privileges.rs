//! Table privileges: parsing `pg_class.relacl` and rendering GRANTs
//!
//! ACL text looks like `{alice=arwd/owner,"group etl=r/owner",=r/owner}`.
//! Each item is `grantee=privileges/grantor`; an empty grantee is PUBLIC and a
//! `*` after a privilege letter marks the grant option.

use super::quote::ident;
use crate::error::{Error, Result};
use std::fmt;

/// A grantable table privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Privilege {
    Select,
    Insert,
    Update,
    Delete,
    References,
    Drop,
    Alter,
    Truncate,
}

impl Privilege {
    fn from_code(code: char) -> Option<Self> {
        match code {
            'r' => Some(Self::Select),
            'a' => Some(Self::Insert),
            'w' => Some(Self::Update),
            'd' => Some(Self::Delete),
            'x' => Some(Self::References),
            'D' => Some(Self::Drop),
            'A' => Some(Self::Alter),
            'T' => Some(Self::Truncate),
            _ => None,
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::References => "REFERENCES",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::Truncate => "TRUNCATE",
        })
    }
}

/// Who a privilege is granted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grantee {
    Public,
    User(String),
    Group(String),
}

impl Grantee {
    fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Public
        } else if let Some(group) = raw.strip_prefix("group ") {
            Self::Group(group.to_string())
        } else {
            Self::User(raw.to_string())
        }
    }

    fn render(&self) -> Result<String> {
        match self {
            Self::Public => Ok("PUBLIC".to_string()),
            Self::User(user) => ident(user),
            Self::Group(group) => Ok(format!("GROUP {}", ident(group)?)),
        }
    }
}

/// One parsed ACL item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub grantee: Grantee,
    /// Privileges with their grant-option flag, in ACL order
    pub privileges: Vec<(Privilege, bool)>,
    pub grantor: String,
}

impl AclEntry {
    /// Parse a single `grantee=privs/grantor` item (already unquoted)
    pub fn parse(item: &str) -> Result<Self> {
        let invalid = || Error::InvalidAcl {
            entry: item.to_string(),
        };
        let (grantee, rest) = item.rsplit_once('=').ok_or_else(invalid)?;
        let (codes, grantor) = rest.split_once('/').ok_or_else(invalid)?;

        let mut privileges = Vec::new();
        let mut chars = codes.chars().peekable();
        while let Some(code) = chars.next() {
            let grant_option = chars.next_if_eq(&'*').is_some();
            match Privilege::from_code(code) {
                Some(privilege) => privileges.push((privilege, grant_option)),
                // RULE and TRIGGER have no GRANT form in Redshift
                None if code.is_ascii_alphabetic() => {}
                None => return Err(invalid()),
            }
        }

        Ok(Self {
            grantee: Grantee::parse(grantee),
            privileges,
            grantor: grantor.to_string(),
        })
    }

    /// Whether this entry belongs to `user`
    pub fn is_for_user(&self, user: &str) -> bool {
        matches!(&self.grantee, Grantee::User(u) if u == user)
    }

    /// GRANT statements recreating this entry on `table` (already quoted)
    pub fn grant_statements(&self, table: &str) -> Result<Vec<String>> {
        let grantee = self.grantee.render()?;
        let group_like = !matches!(self.grantee, Grantee::User(_));

        let mut plain = Vec::new();
        let mut with_option = Vec::new();
        for (privilege, grant_option) in &self.privileges {
            if *grant_option && !group_like {
                with_option.push(privilege.to_string());
            } else {
                plain.push(privilege.to_string());
            }
        }

        let mut statements = Vec::new();
        if !plain.is_empty() {
            statements.push(format!(
                "GRANT {} ON {table} TO {grantee}",
                plain.join(", ")
            ));
        }
        if !with_option.is_empty() {
            statements.push(format!(
                "GRANT {} ON {table} TO {grantee} WITH GRANT OPTION",
                with_option.join(", ")
            ));
        }
        Ok(statements)
    }
}

/// Split ACL text into unquoted items
fn split_acl(acl: &str) -> Result<Vec<String>> {
    // array_to_string() output has no braces
    let trimmed = acl.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' if !in_quotes => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(Error::InvalidAcl {
            entry: acl.to_string(),
        });
    }
    if !current.is_empty() {
        items.push(current);
    }
    Ok(items)
}

/// Parse the text form of an aclitem[] column
pub fn parse_acl(acl: &str) -> Result<Vec<AclEntry>> {
    split_acl(acl)?
        .iter()
        .map(|item| AclEntry::parse(item))
        .collect()
}

/// GRANT statements recreating `entries` on `table`, skipping the owner's own entry
pub fn grant_statements(entries: &[AclEntry], table: &str, owner: Option<&str>) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for entry in entries {
        if owner.is_some_and(|o| entry.is_for_user(o)) {
            continue;
        }
        statements.extend(entry.grant_statements(table)?);
    }
    Ok(statements)
}
