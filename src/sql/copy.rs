//! COPY statements for staged JSON loads

use super::quote::quote_literal;
use crate::error::{Error, Result};
use std::fmt;

/// How Redshift authenticates to S3 while running the COPY
#[derive(Clone, PartialEq, Eq)]
pub enum CopyAuthorization {
    /// Access keys, optionally with a session token
    Keys {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// An IAM role attached to the cluster
    IamRole(String),
}

impl CopyAuthorization {
    /// Access-key authorization without a session token
    pub fn keys(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self::Keys {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// The credentials string placed in the CREDENTIALS clause
    pub fn credentials_string(&self) -> String {
        match self {
            Self::Keys {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                let mut creds = format!(
                    "aws_access_key_id={access_key_id};aws_secret_access_key={secret_access_key}"
                );
                if let Some(token) = session_token {
                    creds.push_str(&format!(";token={token}"));
                }
                creds
            }
            Self::IamRole(arn) => format!("aws_iam_role={arn}"),
        }
    }
}

impl fmt::Debug for CopyAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keys { access_key_id, .. } => f
                .debug_struct("Keys")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .finish_non_exhaustive(),
            Self::IamRole(arn) => f.debug_tuple("IamRole").field(arn).finish(),
        }
    }
}

/// Optional COPY parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    /// TIMEFORMAT value; `auto` unless overridden
    pub time_format: String,
    /// Bucket region when it differs from the cluster's
    pub region: Option<String>,
    /// Rows allowed to fail before the load aborts
    pub max_error: Option<u32>,
    /// Truncate strings longer than their column
    pub truncate_columns: bool,
    /// Load blank strings as NULL
    pub blanks_as_null: bool,
    /// Load empty strings as NULL
    pub empty_as_null: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            time_format: "auto".to_string(),
            region: None,
            max_error: None,
            truncate_columns: false,
            blanks_as_null: false,
            empty_as_null: false,
        }
    }
}

/// A `COPY ... JSON ... MANIFEST GZIP` statement
#[derive(Debug, Clone)]
pub struct CopyCommand {
    /// Target table, already quoted/qualified
    pub table: String,
    /// `s3://` URL of the manifest
    pub manifest_url: String,
    /// `s3://` URL of the jsonpaths file
    pub jsonpaths_url: String,
    pub authorization: CopyAuthorization,
    pub options: CopyOptions,
}

impl CopyCommand {
    /// Render the statement
    pub fn build(&self) -> Result<String> {
        for url in [&self.manifest_url, &self.jsonpaths_url] {
            if !url.starts_with("s3://") {
                return Err(Error::validation(format!(
                    "COPY sources must be s3:// URLs, got {url}"
                )));
            }
        }

        let mut lines = vec![
            format!("COPY {}", self.table),
            format!("FROM {}", quote_literal(&self.manifest_url)),
            format!(
                "CREDENTIALS {}",
                quote_literal(&self.authorization.credentials_string())
            ),
            format!("JSON {}", quote_literal(&self.jsonpaths_url)),
        ];

        let mut tail = format!(
            "MANIFEST GZIP TIMEFORMAT {}",
            quote_literal(&self.options.time_format)
        );
        if let Some(region) = &self.options.region {
            tail.push_str(&format!(" REGION {}", quote_literal(region)));
        }
        if let Some(max_error) = self.options.max_error {
            tail.push_str(&format!(" MAXERROR {max_error}"));
        }
        if self.options.truncate_columns {
            tail.push_str(" TRUNCATECOLUMNS");
        }
        if self.options.blanks_as_null {
            tail.push_str(" BLANKSASNULL");
        }
        if self.options.empty_as_null {
            tail.push_str(" EMPTYASNULL");
        }
        lines.push(tail);

        Ok(lines.join("\n"))
    }

    /// The statement with the CREDENTIALS clause masked, for logging
    pub fn redacted(&self) -> String {
        let masked = Self {
            authorization: CopyAuthorization::IamRole("<redacted>".to_string()),
            ..self.clone()
        };
        masked
            .build()
            .unwrap_or_else(|_| format!("COPY {} <invalid>", self.table))
    }
}
