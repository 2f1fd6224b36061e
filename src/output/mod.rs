//! Output module
//!
//! Produces the artifacts a staged COPY reads.
//!
//! # Overview
//!
//! This module provides:
//! - Chunking records into gzip-compressed NDJSON files
//! - COPY manifest generation
//! - S3 staging storage (with in-memory and local stand-ins)

mod chunk;
mod cloud;
mod manifest;

pub use chunk::{chunked_json_slices, new_stamp, partition_bounds, ChunkSet, CHUNK_EXTENSION};
pub use cloud::{normalize_keypath, S3Location, StagingStore};
pub use manifest::{Manifest, ManifestEntry};
