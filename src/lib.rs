// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

//! # shiftmanager
//!
//! Administrative helpers for Amazon Redshift.
//!
//! ## Features
//!
//! - **User administration**: CREATE/ALTER USER and group SQL, random passwords
//! - **Deep copies**: rebuild or deduplicate a table from its reflected definition
//! - **JSON loads**: chunk, gzip and stage records in S3, then COPY them in one statement
//! - **jsonpaths**: derive a jsonpaths file from a sample document
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shiftmanager::{Redshift, ShiftConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ShiftConfig::from_file("shiftmanager.yaml")?;
//!     let redshift = Redshift::connect(&config).await?;
//!
//!     // Remove duplicate rows
//!     redshift.dedupe(None, "events", true, true).await?;
//!
//!     // Load records
//!     let records = vec![serde_json::json!({"id": 1, "name": "swiper"})];
//!     let paths = redshift.gen_jsonpaths(&records[0], None)?;
//!     let store = redshift.staging_store(None)?;
//!     let load = redshift.json_load("users");
//!     redshift.copy_json_to_table(&store, &records, &paths, &load).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Redshift facade                          │
//! │  create_user  alter_user  deep_copy  dedupe  copy_json_to_table │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   SQL    │ Database  │    Engine     │  Output   │  JSONPaths  │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Users    │ sqlx conn │ Chunk         │ gzip JSON │ Path derive │
//! │ Tables   │ Recording │ Upload        │ Manifest  │             │
//! │ Grants   │ Reflection│ COPY          │ S3 store  │             │
//! │ COPY     │           │ Cleanup       │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration file and environment handling
pub mod config;

/// Template interpolation for configuration values
pub mod template;

/// Random password generation
pub mod password;

/// JSONPaths generation
pub mod jsonpaths;

/// SQL generation
pub mod sql;

/// SQL execution and catalog reflection
pub mod database;

/// Chunk files, manifests and S3 staging
pub mod output;

/// Staged JSON load pipeline
pub mod engine;

/// High-level management handle
pub mod redshift;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ShiftConfig;
pub use engine::{JsonLoad, JsonLoader, LoadReport};
pub use jsonpaths::{gen_jsonpaths, JsonPaths};
pub use password::random_password;
pub use redshift::Redshift;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
