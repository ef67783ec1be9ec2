//! Repository index types
//!
//! Helm-compatible `index.yaml`, reduced to the fields an import needs.
//! Chart order and per-chart version order are kept exactly as served: the
//! first version listed for a chart is the one that creates the application.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, Result};

/// Repository index (Helm-compatible)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryIndex {
    /// API version
    #[serde(default)]
    pub api_version: Option<String>,

    /// Charts indexed by name, in document order
    #[serde(default)]
    pub entries: IndexMap<String, Vec<ChartVersionEntry>>,
}

impl RepositoryIndex {
    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RepoError::IndexParseError {
            message: e.to_string(),
        })
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes).map_err(|e| RepoError::IndexParseError {
            message: format!("Invalid UTF-8: {}", e),
        })?;
        Self::from_yaml(yaml)
    }

    /// Get all versions of a chart, in index order
    pub fn get(&self, name: &str) -> Option<&[ChartVersionEntry]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Iterate charts in index order
    pub fn charts(&self) -> impl Iterator<Item = (&str, &[ChartVersionEntry])> {
        self.entries
            .iter()
            .map(|(name, versions)| (name.as_str(), versions.as_slice()))
    }

    /// Number of charts
    pub fn chart_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of versions across all charts
    pub fn version_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// One chart version listed in the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartVersionEntry {
    /// Chart name
    pub name: String,

    /// Dot-separated version string
    pub version: String,

    /// URLs to download the chart archive
    #[serde(default)]
    pub urls: Vec<String>,
}

impl ChartVersionEntry {
    /// Create an entry with a single download URL
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            urls: vec![url.into()],
        }
    }

    /// Get the primary download URL
    pub fn download_url(&self) -> Option<&str> {
        self.urls.first().map(|s| s.as_str())
    }
}
