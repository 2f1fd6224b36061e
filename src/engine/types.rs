//! Engine types
//!
//! Load settings and the report returned after a staged COPY.

use crate::config::{LoadDefaults, DEFAULT_SLICES};
use crate::sql::CopyOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one JSON load
#[derive(Debug, Clone)]
pub struct JsonLoad {
    /// Target table, optionally schema-qualified (`schema.table`)
    pub table: String,
    /// Key prefix the staged files are written under
    pub keypath: String,
    /// Number of chunk files; one per cluster slice works best
    pub slices: usize,
    /// Directory for the local chunk files; a temporary one when unset
    pub local_path: Option<PathBuf>,
    /// Delete the staged objects after the COPY
    pub clean_up_s3: bool,
    /// Delete the local chunk files after upload
    pub clean_up_local: bool,
    /// Extra COPY parameters
    pub copy_options: CopyOptions,
}

impl JsonLoad {
    /// Load into `table` with default settings
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            keypath: String::new(),
            slices: DEFAULT_SLICES,
            local_path: None,
            clean_up_s3: true,
            clean_up_local: true,
            copy_options: CopyOptions::default(),
        }
    }

    /// Load into `table` using configured defaults
    pub fn from_defaults(table: impl Into<String>, defaults: &LoadDefaults) -> Self {
        Self {
            keypath: defaults.keypath.clone().unwrap_or_default(),
            slices: defaults.slices,
            local_path: defaults.local_path.clone(),
            clean_up_s3: defaults.clean_up_s3,
            clean_up_local: defaults.clean_up_local,
            ..Self::new(table)
        }
    }

    /// Set key prefix
    #[must_use]
    pub fn with_keypath(mut self, keypath: impl Into<String>) -> Self {
        self.keypath = keypath.into();
        self
    }

    /// Set number of chunk files
    #[must_use]
    pub fn with_slices(mut self, slices: usize) -> Self {
        self.slices = slices;
        self
    }

    /// Write chunk files under `path`
    #[must_use]
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Keep or delete staged objects
    #[must_use]
    pub fn with_clean_up_s3(mut self, clean_up: bool) -> Self {
        self.clean_up_s3 = clean_up;
        self
    }

    /// Keep or delete local chunk files
    #[must_use]
    pub fn with_clean_up_local(mut self, clean_up: bool) -> Self {
        self.clean_up_local = clean_up;
        self
    }

    /// Set COPY parameters
    #[must_use]
    pub fn with_copy_options(mut self, options: CopyOptions) -> Self {
        self.copy_options = options;
        self
    }
}

/// Outcome of a load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Stamp naming every file of this load
    pub stamp: String,
    /// Records written
    pub records: usize,
    /// Every staged key: chunks, then manifest, then jsonpaths
    pub keys: Vec<String>,
    /// `s3://` URL of the manifest
    pub manifest_url: String,
    /// `s3://` URL of the jsonpaths file
    pub jsonpaths_url: String,
    /// The COPY that ran, credentials masked
    pub copy_statement: String,
    /// Directory the chunks were written to
    pub local_directory: PathBuf,
    /// Local chunk files left on disk
    pub local_files: Vec<PathBuf>,
    /// Whether staged objects were removed
    pub cleaned_up_s3: bool,
    /// Wall time of the whole load
    pub elapsed: Duration,
}

impl LoadReport {
    /// Number of chunk files
    pub fn chunk_count(&self) -> usize {
        self.keys.len().saturating_sub(2)
    }
}
