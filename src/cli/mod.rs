//! CLI module
//!
//! Command-line interface for managing Redshift.
//!
//! # Commands
//!
//! - `password` - Generate a random password
//! - `create-user` / `alter-user` - User administration
//! - `deep-copy` / `dedupe` - Table rewrites
//! - `jsonpaths` - Generate a jsonpaths file from a sample record
//! - `copy-json` - Stage JSON in S3 and COPY it into a table

mod commands;
mod runner;

pub use commands::{
    parse_timestamp, Cli, Commands, OutputFormat, PasswordArgs, TableArgs, UserOptions,
};
pub use runner::{log_filter, Runner};
