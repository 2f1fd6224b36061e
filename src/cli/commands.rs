//! CLI commands and argument parsing

use crate::output::S3Location;
use crate::password::DEFAULT_PASSWORD_LENGTH;
use crate::types::ConnectionLimit;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Redshift management utility
#[derive(Parser, Debug)]
#[command(name = "shiftmanager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print SQL instead of running it
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a random password Redshift accepts
    Password {
        /// Password length (8 to 64)
        #[arg(short, long, default_value_t = DEFAULT_PASSWORD_LENGTH)]
        length: usize,
    },

    /// Create a user
    CreateUser {
        /// User name
        username: String,

        #[command(flatten)]
        password: PasswordArgs,

        /// Group to add the user to (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,

        #[command(flatten)]
        options: UserOptions,
    },

    /// Alter a user
    AlterUser {
        /// User name
        username: String,

        #[command(flatten)]
        password: PasswordArgs,

        #[command(flatten)]
        options: UserOptions,

        /// Revoke CREATEDB
        #[arg(long, conflicts_with = "createdb")]
        no_createdb: bool,

        /// Revoke CREATEUSER
        #[arg(long, conflicts_with = "createuser")]
        no_createuser: bool,

        /// Reset a session parameter to its default (repeatable)
        #[arg(long = "reset")]
        reset: Vec<String>,

        /// Rename the user
        #[arg(long)]
        rename: Option<String>,
    },

    /// Rebuild a table, re-sorting it and reclaiming space
    DeepCopy {
        #[command(flatten)]
        table: TableArgs,

        /// Drop duplicate rows
        #[arg(long)]
        distinct: bool,
    },

    /// Remove duplicate rows from a table
    Dedupe {
        #[command(flatten)]
        table: TableArgs,
    },

    /// Generate a jsonpaths file from a sample document
    Jsonpaths {
        /// JSON document, array or NDJSON file (`-` for stdin); the first record is used
        input: PathBuf,

        /// Index to select inside array values
        #[arg(long)]
        list_index: Option<usize>,
    },

    /// Stage JSON records in S3 and COPY them into a table
    CopyJson {
        /// Target table (`schema.table` or `table`)
        table: String,

        /// JSON array or NDJSON file (`-` for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// jsonpaths file; generated from the first record when omitted
        #[arg(long)]
        jsonpaths: Option<PathBuf>,

        /// Index to select inside array values when generating jsonpaths
        #[arg(long)]
        list_index: Option<usize>,

        /// Staging bucket (overrides config)
        #[arg(long)]
        bucket: Option<String>,

        /// Key prefix inside the bucket (overrides config)
        #[arg(long)]
        keypath: Option<String>,

        /// Staging location as `s3://bucket/prefix`
        #[arg(long, value_parser = S3Location::parse, conflicts_with_all = ["bucket", "keypath"])]
        s3: Option<S3Location>,

        /// Number of chunk files (overrides config)
        #[arg(long)]
        slices: Option<usize>,

        /// Directory for local chunk files
        #[arg(long)]
        local_path: Option<PathBuf>,

        /// Leave staged objects in S3
        #[arg(long)]
        keep_s3: bool,

        /// Leave local chunk files on disk
        #[arg(long)]
        keep_local: bool,
    },
}

/// Password source for user commands
#[derive(Args, Debug, Clone, Default)]
pub struct PasswordArgs {
    /// Password to set
    #[arg(short, long, conflicts_with_all = ["random_password", "disable_password"])]
    pub password: Option<String>,

    /// Generate a random password and print it
    #[arg(long, conflicts_with = "disable_password")]
    pub random_password: bool,

    /// PASSWORD DISABLE (no password login)
    #[arg(long)]
    pub disable_password: bool,
}

/// Options shared by create-user and alter-user
#[derive(Args, Debug, Clone, Default)]
pub struct UserOptions {
    /// Allow creating databases
    #[arg(long)]
    pub createdb: bool,

    /// Make a superuser
    #[arg(long)]
    pub createuser: bool,

    /// Password expiry (`YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`)
    #[arg(long, value_parser = parse_timestamp)]
    pub valid_until: Option<NaiveDateTime>,

    /// Maximum open connections (a number or `unlimited`)
    #[arg(long)]
    pub connection_limit: Option<ConnectionLimit>,

    /// Default WLM query slots
    #[arg(long)]
    pub wlm_query_slot_count: Option<u32>,
}

/// Table selection for table commands
#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    /// Table name
    pub table: String,

    /// Schema (defaults to `public` for reflection)
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Replay the owner and grants onto the new table
    #[arg(long)]
    pub copy_privileges: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .map_err(|e| format!("invalid timestamp '{value}': {e}"))
}
