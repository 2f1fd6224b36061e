//! S3 staging storage for COPY sources

use crate::config::AwsConfig;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// A bucket and key prefix parsed from an `s3://bucket/prefix/` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    /// Key prefix; empty or ending in `/`
    pub keypath: String,
}

impl S3Location {
    /// Parse an `s3://` URL
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "s3" {
            return Err(Error::config(format!("Expected an s3:// URL, got {url}")));
        }
        let bucket = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::config(format!("Missing bucket in {url}")))?
            .to_string();
        Ok(Self {
            bucket,
            keypath: normalize_keypath(parsed.path())?,
        })
    }
}

/// Strip leading slashes and make a non-empty prefix end with `/`
///
/// Prefixes that object storage would rewrite (percent-encoded characters,
/// empty segments) are rejected: manifest URLs must name the stored keys.
pub fn normalize_keypath(keypath: &str) -> Result<String> {
    let prefix = keypath.trim_start_matches('/').trim_end_matches('/');
    if ObjectPath::from(prefix).as_ref() != prefix {
        return Err(Error::validation(format!(
            "keypath '{keypath}' cannot be stored verbatim as an S3 key prefix"
        )));
    }
    if prefix.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("{prefix}/"))
    }
}

/// Object storage holding staged chunk, manifest and jsonpaths files
///
/// Keys are relative to the bucket root; [`StagingStore::url`] gives the
/// `s3://` URL COPY needs.
#[derive(Debug, Clone)]
pub struct StagingStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl StagingStore {
    /// Wrap an existing object store
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Build an S3 client for `bucket`
    ///
    /// Explicit settings win; anything left unset is read from the
    /// environment (`AWS_*`) by the builder.
    pub fn for_bucket(bucket: &str, aws: &AwsConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(key) = &aws.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &aws.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(token) = &aws.session_token {
            builder = builder.with_token(token);
        }
        if let Some(region) = &aws.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &aws.endpoint {
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;

        Ok(Self::new(Arc::new(store), bucket))
    }

    /// In-memory store standing in for `bucket`
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), bucket)
    }

    /// Local directory standing in for `bucket`
    pub fn local(bucket: impl Into<String>, directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory).map_err(|e| {
            Error::config(format!(
                "Failed to create directory {}: {e}",
                directory.display()
            ))
        })?;
        let store = LocalFileSystem::new_with_prefix(directory)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;
        Ok(Self::new(Arc::new(store), bucket))
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `s3://bucket/key`
    pub fn url(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }

    /// Write bytes under `key`; returns the URL of the stored object
    pub async fn put(&self, key: &str, data: Bytes) -> Result<String> {
        let path = ObjectPath::from(key);
        let size = data.len();
        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::storage(format!("Failed to write {}: {e}", self.url(key))))?;

        let url = self.url(path.as_ref());
        tracing::debug!("Uploaded {} ({} bytes)", url, size);
        Ok(url)
    }

    /// Upload a local file under `key`
    pub async fn put_file(&self, key: &str, file: &Path) -> Result<String> {
        let data = tokio::fs::read(file).await.map_err(|e| {
            Error::storage(format!("Failed to read {}: {e}", file.display()))
        })?;
        self.put(key, Bytes::from(data)).await
    }

    /// Read an object back
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let result = self.store.get(&ObjectPath::from(key)).await?;
        Ok(result.bytes().await?)
    }

    /// Whether an object exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys under a prefix, sorted
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = ObjectPath::from(prefix);
        let mut keys: Vec<String> = self
            .store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        keys.sort();
        Ok(keys)
    }

    /// Delete every key; missing keys are not an error
    ///
    /// All deletes are attempted; the first failure is returned afterwards.
    pub async fn delete(&self, keys: &[String]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            match self.store.delete(&ObjectPath::from(key.as_str())).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {}", self.url(key), e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
