//! Chunked, gzip-compressed newline-delimited JSON files
//!
//! Redshift loads a manifest's files in parallel across slices, so a dataset
//! is split into one file per slice before upload.

use crate::error::{Error, Result};
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Extension of chunk files
pub const CHUNK_EXTENSION: &str = "json.gz";

/// A unique stamp naming the files of one load
///
/// UTC time to the millisecond plus a random suffix, so two loads started in
/// the same millisecond still get distinct names.
pub fn new_stamp() -> String {
    format!(
        "{}-{:08x}",
        Utc::now().format("%Y%m%dT%H%M%S%3f"),
        rand::random::<u32>()
    )
}

/// Split `len` items into `slices` contiguous ranges
///
/// The first `len % slices` ranges get one extra item; trailing ranges are
/// empty when there are more slices than items.
pub fn partition_bounds(len: usize, slices: usize) -> Vec<Range<usize>> {
    if slices == 0 {
        return Vec::new();
    }
    let base = len / slices;
    let extra = len % slices;

    let mut start = 0;
    (0..slices)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Chunk files written to local disk
///
/// Removes its files when dropped unless cleanup was disabled.
#[derive(Debug)]
pub struct ChunkSet {
    stamp: String,
    paths: Vec<PathBuf>,
    clean_on_drop: bool,
}

impl ChunkSet {
    /// Stamp shared by the files of this set
    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Paths of the chunk files, in slice order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set has no files
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Keep the files on disk after the set is dropped
    pub fn keep(&mut self) {
        self.clean_on_drop = false;
    }

    /// Remove the files now
    pub fn remove(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove chunk {}: {}", path.display(), e);
                }
            }
        }
    }
}

impl Drop for ChunkSet {
    fn drop(&mut self) {
        if self.clean_on_drop {
            self.remove();
        }
    }
}

/// Write one gzip NDJSON file
fn write_chunk<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        Error::storage(format!("Failed to create chunk {}: {e}", path.display()))
    })?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    for record in records {
        serde_json::to_writer(&mut encoder, record)?;
        encoder.write_all(b"\n")?;
    }
    encoder.finish()?.flush()?;
    Ok(())
}

/// Write `data` as `slices` gzip-compressed NDJSON files in `directory`
///
/// Files are named `{stamp}-{index}.json.gz`. Reading them in order yields
/// the records in their original order. If writing fails part way, files
/// already written are removed.
pub fn chunked_json_slices<T: Serialize>(
    data: &[T],
    slices: usize,
    directory: impl AsRef<Path>,
    clean_on_drop: bool,
) -> Result<ChunkSet> {
    if slices == 0 {
        return Err(Error::validation("slices must be at least 1"));
    }
    let directory = directory.as_ref();
    std::fs::create_dir_all(directory)?;

    // Clean up partial output if a write fails
    let mut set = ChunkSet {
        stamp: new_stamp(),
        paths: Vec::with_capacity(slices),
        clean_on_drop: true,
    };

    for (idx, range) in partition_bounds(data.len(), slices).into_iter().enumerate() {
        let path = directory.join(format!("{}-{idx}.{CHUNK_EXTENSION}", set.stamp));
        set.paths.push(path.clone());
        write_chunk(&path, &data[range])?;
    }

    tracing::debug!(
        "Wrote {} records into {} chunks under {}",
        data.len(),
        slices,
        directory.display()
    );

    set.clean_on_drop = clean_on_drop;
    Ok(set)
}
