//! Execution engine module
//!
//! Staged JSON loads into Redshift.
//!
//! # Overview
//!
//! A load runs in order:
//! 1. Split the records into `slices` gzip NDJSON files on local disk
//! 2. Upload every chunk concurrently under `{keypath}{stamp}-{i}.json.gz`
//! 3. Upload `{keypath}{stamp}.manifest` listing the chunks
//! 4. Upload `{keypath}{stamp}.jsonpaths`
//! 5. Run a single `COPY ... MANIFEST GZIP`
//! 6. Delete the staged objects (also when the COPY failed)
//! 7. Delete the local files
//!
//! `JsonLoader` holds the connections; `JsonLoad` the per-load settings.

mod types;

pub use types::{JsonLoad, LoadReport};

use crate::database::SqlExecutor;
use crate::error::{Error, Result};
use crate::jsonpaths::JsonPaths;
use crate::output::{
    chunked_json_slices, new_stamp, normalize_keypath, ChunkSet, Manifest, StagingStore,
};
use crate::sql::{qualified, CopyAuthorization, CopyCommand};
use bytes::Bytes;
use futures::future::try_join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Runs staged COPY loads
pub struct JsonLoader {
    executor: Arc<dyn SqlExecutor>,
    store: StagingStore,
    authorization: CopyAuthorization,
}

/// URLs and statement produced by the staging phase
struct Staged {
    manifest_url: String,
    jsonpaths_url: String,
    copy_statement: String,
}

impl JsonLoader {
    /// Create a loader
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        store: StagingStore,
        authorization: CopyAuthorization,
    ) -> Self {
        Self {
            executor,
            store,
            authorization,
        }
    }

    /// Staging store
    pub fn store(&self) -> &StagingStore {
        &self.store
    }

    /// Load `data` into `load.table`
    ///
    /// Each record becomes one JSON line; `jsonpaths` maps its fields to the
    /// table's columns in order.
    pub async fn load<T: Serialize + Sync>(
        &self,
        data: &[T],
        jsonpaths: &JsonPaths,
        load: &JsonLoad,
    ) -> Result<LoadReport> {
        let start = Instant::now();

        if jsonpaths.is_empty() {
            return Err(Error::validation("jsonpaths cannot be empty"));
        }
        let table = qualified(&load.table)?;
        let keypath = normalize_keypath(&load.keypath)?;

        let (directory, temporary) = match &load.local_path {
            Some(path) => (path.clone(), false),
            None => (
                std::env::temp_dir().join(format!("shiftmanager-{}", new_stamp())),
                true,
            ),
        };

        let chunked = chunked_json_slices(data, load.slices, &directory, load.clean_up_local);
        let mut chunks = match chunked {
            Ok(chunks) => chunks,
            Err(e) => {
                if temporary {
                    remove_directory(&directory);
                }
                return Err(e);
            }
        };
        let stamp = chunks.stamp().to_string();

        tracing::info!(
            "Wrote {} records to {} chunks in {}",
            data.len(),
            chunks.len(),
            directory.display()
        );

        let mut keys: Vec<String> = chunks
            .paths()
            .iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{keypath}{name}")
            })
            .collect();
        keys.push(format!("{keypath}{stamp}.manifest"));
        keys.push(format!("{keypath}{stamp}.jsonpaths"));

        let staged = self
            .stage_and_copy(&chunks, &keys, jsonpaths, &table, load)
            .await;

        let mut cleaned_up_s3 = false;
        if load.clean_up_s3 {
            match self.store.delete(&keys).await {
                Ok(()) => {
                    tracing::info!("Deleted {} staged objects", keys.len());
                    cleaned_up_s3 = true;
                }
                // A COPY failure takes precedence over a cleanup failure
                Err(e) if staged.is_err() => {
                    tracing::warn!("Failed to delete staged objects: {}", e);
                }
                Err(e) => {
                    clean_local(&mut chunks, &directory, temporary, load.clean_up_local);
                    return Err(e);
                }
            }
        }

        let local_files = clean_local(&mut chunks, &directory, temporary, load.clean_up_local);
        let staged = staged?;

        let report = LoadReport {
            stamp,
            records: data.len(),
            keys,
            manifest_url: staged.manifest_url,
            jsonpaths_url: staged.jsonpaths_url,
            copy_statement: staged.copy_statement,
            local_directory: directory,
            local_files,
            cleaned_up_s3,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            "Loaded {} records into {} in {:?}",
            report.records,
            load.table,
            report.elapsed
        );

        Ok(report)
    }

    /// Upload chunks, manifest and jsonpaths, then run the COPY
    ///
    /// `keys` holds one key per chunk followed by the manifest and jsonpaths
    /// keys.
    async fn stage_and_copy(
        &self,
        chunks: &ChunkSet,
        keys: &[String],
        jsonpaths: &JsonPaths,
        table: &str,
        load: &JsonLoad,
    ) -> Result<Staged> {
        let count = chunks.len();

        let uploads = chunks
            .paths()
            .iter()
            .zip(keys)
            .map(|(path, key)| self.store.put_file(key, path));
        let chunk_urls = try_join_all(uploads).await?;
        tracing::info!("Uploaded {} chunks to s3://{}", count, self.store.bucket());

        let manifest = Manifest::from_urls(chunk_urls);
        let manifest_url = self
            .store
            .put(&keys[count], Bytes::from(manifest.to_json()?))
            .await?;
        let jsonpaths_url = self
            .store
            .put(&keys[count + 1], Bytes::from(jsonpaths.to_json()?))
            .await?;

        let command = CopyCommand {
            table: table.to_string(),
            manifest_url: manifest_url.clone(),
            jsonpaths_url: jsonpaths_url.clone(),
            authorization: self.authorization.clone(),
            options: load.copy_options.clone(),
        };
        let sql = command.build()?;
        let copy_statement = command.redacted();

        tracing::info!("Running COPY into {}", table);
        tracing::debug!("{}", copy_statement);

        self.executor
            .execute(&sql)
            .await
            .map_err(|e| Error::load(&load.table, e.to_string()))?;

        Ok(Staged {
            manifest_url,
            jsonpaths_url,
            copy_statement,
        })
    }
}

/// Remove or keep local chunk files; returns the files left on disk
fn clean_local(
    chunks: &mut ChunkSet,
    directory: &Path,
    temporary: bool,
    clean_up: bool,
) -> Vec<PathBuf> {
    if !clean_up {
        return chunks.paths().to_vec();
    }
    chunks.remove();
    if temporary {
        remove_directory(directory);
    }
    Vec::new()
}

fn remove_directory(directory: &Path) {
    if let Err(e) = std::fs::remove_dir_all(directory) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", directory.display(), e);
        }
    }
}
