//! COPY manifest files

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One file listed in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
    /// COPY fails if a mandatory file is missing
    pub mandatory: bool,
}

/// A Redshift COPY manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// A manifest listing every URL as mandatory
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: urls
                .into_iter()
                .map(|url| ManifestEntry {
                    url: url.into(),
                    mandatory: true,
                })
                .collect(),
        }
    }

    /// Serialize as the JSON document Redshift expects
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
