//! User and group administration statements

use super::join_statements;
use super::quote::{ident, quote_literal};
use crate::error::{Error, Result};
use crate::types::ConnectionLimit;
use chrono::NaiveDateTime;

/// Format used for VALID UNTIL timestamps
const VALID_UNTIL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Password clause of CREATE/ALTER USER
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPassword {
    /// A clear-text password or an `md5...`/`sha256|...` hash
    Plain(String),
    /// PASSWORD DISABLE, for IAM-only users
    Disable,
}

impl UserPassword {
    fn render(&self) -> String {
        match self {
            Self::Plain(password) => format!("PASSWORD {}", quote_literal(password)),
            Self::Disable => "PASSWORD DISABLE".to_string(),
        }
    }
}

impl From<&str> for UserPassword {
    fn from(password: &str) -> Self {
        Self::Plain(password.to_string())
    }
}

impl From<String> for UserPassword {
    fn from(password: String) -> Self {
        Self::Plain(password)
    }
}

/// Value assigned to a session parameter with ALTER USER ... SET
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Int(i64),
    Text(String),
    Default,
}

impl ParamValue {
    fn render(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => quote_literal(s),
            Self::Default => "DEFAULT".to_string(),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

fn set_parameter_statement(user: &str, name: &str, value: &ParamValue) -> Result<String> {
    Ok(format!("ALTER USER {user} SET {} = {}", ident(name)?, value.render()))
}

// ============================================================================
// CREATE USER
// ============================================================================

/// Builder for CREATE USER, plus any session parameters set right after
#[derive(Debug, Clone)]
pub struct CreateUser {
    username: String,
    password: UserPassword,
    groups: Vec<String>,
    createdb: bool,
    createuser: bool,
    valid_until: Option<NaiveDateTime>,
    connection_limit: Option<ConnectionLimit>,
    parameters: Vec<(String, ParamValue)>,
}

impl CreateUser {
    /// Start a CREATE USER for `username`
    pub fn new(username: impl Into<String>, password: impl Into<UserPassword>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            groups: Vec::new(),
            createdb: false,
            createuser: false,
            valid_until: None,
            connection_limit: None,
            parameters: Vec::new(),
        }
    }

    /// Add the user to a group
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Add the user to several groups
    #[must_use]
    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Allow the user to create databases
    #[must_use]
    pub fn createdb(mut self, allow: bool) -> Self {
        self.createdb = allow;
        self
    }

    /// Make the user a superuser
    #[must_use]
    pub fn createuser(mut self, allow: bool) -> Self {
        self.createuser = allow;
        self
    }

    /// Expire the password at the given time
    #[must_use]
    pub fn valid_until(mut self, when: NaiveDateTime) -> Self {
        self.valid_until = Some(when);
        self
    }

    /// Limit concurrent connections
    #[must_use]
    pub fn connection_limit(mut self, limit: ConnectionLimit) -> Self {
        self.connection_limit = Some(limit);
        self
    }

    /// Set the default WLM query slot count for the user's sessions
    #[must_use]
    pub fn wlm_query_slot_count(self, slots: u32) -> Self {
        self.set_parameter("wlm_query_slot_count", slots)
    }

    /// Set a session parameter default for the user
    #[must_use]
    pub fn set_parameter(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Name of the user being created
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Render the statement batch
    pub fn build(&self) -> Result<String> {
        let user = ident(&self.username)?;
        let mut create = format!("CREATE USER {user}");

        if !self.groups.is_empty() {
            let groups = self
                .groups
                .iter()
                .map(|g| ident(g))
                .collect::<Result<Vec<_>>>()?;
            create.push_str(&format!(" IN GROUP {}", groups.join(", ")));
        }
        create.push(' ');
        create.push_str(&self.password.render());
        if self.createdb {
            create.push_str(" CREATEDB");
        }
        if self.createuser {
            create.push_str(" CREATEUSER");
        }
        if let Some(when) = self.valid_until {
            create.push_str(&format!(
                " VALID UNTIL '{}'",
                when.format(VALID_UNTIL_FORMAT)
            ));
        }
        if let Some(limit) = self.connection_limit {
            create.push_str(&format!(" CONNECTION LIMIT {limit}"));
        }

        let mut statements = vec![create];
        for (name, value) in &self.parameters {
            statements.push(set_parameter_statement(&user, name, value)?);
        }
        Ok(join_statements(&statements))
    }
}

// ============================================================================
// ALTER USER
// ============================================================================

/// Builder for ALTER USER
///
/// Options that share one ALTER USER statement come first; each SET, RESET and
/// the RENAME (always last) get their own statement.
#[derive(Debug, Clone, Default)]
pub struct AlterUser {
    username: String,
    password: Option<UserPassword>,
    createdb: Option<bool>,
    createuser: Option<bool>,
    valid_until: Option<NaiveDateTime>,
    connection_limit: Option<ConnectionLimit>,
    set: Vec<(String, ParamValue)>,
    reset: Vec<String>,
    rename: Option<String>,
}

impl AlterUser {
    /// Start an ALTER USER for `username`
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    /// Change the password
    #[must_use]
    pub fn password(mut self, password: impl Into<UserPassword>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Grant or revoke CREATEDB
    #[must_use]
    pub fn createdb(mut self, allow: bool) -> Self {
        self.createdb = Some(allow);
        self
    }

    /// Grant or revoke CREATEUSER
    #[must_use]
    pub fn createuser(mut self, allow: bool) -> Self {
        self.createuser = Some(allow);
        self
    }

    /// Change password expiry
    #[must_use]
    pub fn valid_until(mut self, when: NaiveDateTime) -> Self {
        self.valid_until = Some(when);
        self
    }

    /// Change the connection limit
    #[must_use]
    pub fn connection_limit(mut self, limit: ConnectionLimit) -> Self {
        self.connection_limit = Some(limit);
        self
    }

    /// Change the default WLM query slot count
    #[must_use]
    pub fn wlm_query_slot_count(self, slots: u32) -> Self {
        self.set_parameter("wlm_query_slot_count", slots)
    }

    /// Set a session parameter default
    #[must_use]
    pub fn set_parameter(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set.push((name.into(), value.into()));
        self
    }

    /// Reset a session parameter to the cluster default
    #[must_use]
    pub fn reset_parameter(mut self, name: impl Into<String>) -> Self {
        self.reset.push(name.into());
        self
    }

    /// Rename the user. Redshift clears an MD5 password on rename.
    #[must_use]
    pub fn rename(mut self, new_name: impl Into<String>) -> Self {
        self.rename = Some(new_name.into());
        self
    }

    /// Render the statement batch
    pub fn build(&self) -> Result<String> {
        let user = ident(&self.username)?;

        let mut options = Vec::new();
        if let Some(password) = &self.password {
            options.push(password.render());
        }
        if let Some(allow) = self.createdb {
            options.push(if allow { "CREATEDB" } else { "NOCREATEDB" }.to_string());
        }
        if let Some(allow) = self.createuser {
            options.push(if allow { "CREATEUSER" } else { "NOCREATEUSER" }.to_string());
        }
        if let Some(when) = self.valid_until {
            options.push(format!("VALID UNTIL '{}'", when.format(VALID_UNTIL_FORMAT)));
        }
        if let Some(limit) = self.connection_limit {
            options.push(format!("CONNECTION LIMIT {limit}"));
        }

        let mut statements = Vec::new();
        if !options.is_empty() {
            statements.push(format!("ALTER USER {user} {}", options.join(" ")));
        }
        for (name, value) in &self.set {
            statements.push(set_parameter_statement(&user, name, value)?);
        }
        for name in &self.reset {
            statements.push(format!("ALTER USER {user} RESET {}", ident(name)?));
        }
        if let Some(new_name) = &self.rename {
            statements.push(format!("ALTER USER {user} RENAME TO {}", ident(new_name)?));
        }

        if statements.is_empty() {
            return Err(Error::validation(format!(
                "ALTER USER {} has nothing to change",
                self.username
            )));
        }
        Ok(join_statements(&statements))
    }
}

/// DROP USER
pub fn drop_user(username: &str, if_exists: bool) -> Result<String> {
    let exists = if if_exists { "IF EXISTS " } else { "" };
    Ok(format!("DROP USER {exists}{}", ident(username)?))
}

// ============================================================================
// Groups
// ============================================================================

/// CREATE GROUP, optionally with initial members
pub fn create_group<S: AsRef<str>>(group: &str, users: &[S]) -> Result<String> {
    let mut statement = format!("CREATE GROUP {}", ident(group)?);
    if !users.is_empty() {
        statement.push_str(&format!(" WITH USER {}", ident_list(users)?));
    }
    Ok(statement)
}

/// Membership change for ALTER GROUP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChange {
    Add,
    Drop,
}

/// ALTER GROUP ... ADD USER / DROP USER
pub fn alter_group<S: AsRef<str>>(group: &str, change: GroupChange, users: &[S]) -> Result<String> {
    if users.is_empty() {
        return Err(Error::validation(format!(
            "ALTER GROUP {group} needs at least one user"
        )));
    }
    let verb = match change {
        GroupChange::Add => "ADD",
        GroupChange::Drop => "DROP",
    };
    Ok(format!(
        "ALTER GROUP {} {verb} USER {}",
        ident(group)?,
        ident_list(users)?
    ))
}

fn ident_list<S: AsRef<str>>(names: &[S]) -> Result<String> {
    Ok(names
        .iter()
        .map(|n| ident(n.as_ref()))
        .collect::<Result<Vec<_>>>()?
        .join(", "))
}
