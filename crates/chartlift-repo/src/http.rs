//! HTTP repository implementation
//!
//! Traditional Helm-style HTTP repositories serving `index.yaml`. Index and
//! chart downloads are anonymous; credentials only go to the app store.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::backend::ChartSource;
use crate::error::{RepoError, Result};
use crate::index::{ChartVersionEntry, RepositoryIndex};
use crate::mirror::MirrorRewriter;

/// Request timeout shared by every client this crate builds
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used for repository and app store calls
pub(crate) fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("chartlift/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })
}

/// Validate an http(s) URL and strip its trailing slash
pub(crate) fn normalize_base_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| RepoError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RepoError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(url.trim_end_matches('/').to_string())
}

/// HTTP repository client
pub struct HttpRepository {
    /// Repository base URL, without trailing slash
    url: String,
    client: reqwest::Client,
    mirrors: MirrorRewriter,
}

impl HttpRepository {
    /// Create a new HTTP repository client
    pub fn new(url: &str, mirrors: MirrorRewriter) -> Result<Self> {
        Ok(Self {
            url: normalize_base_url(url)?,
            client: build_client()?,
            mirrors,
        })
    }

    /// Create without mirror rules
    pub fn public(url: &str) -> Result<Self> {
        Self::new(url, MirrorRewriter::default())
    }

    /// URL of the repository index
    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.url)
    }

    /// Absolute download URL for an entry, mirror rules applied
    pub fn chart_url(&self, entry: &ChartVersionEntry) -> Result<String> {
        let url = entry
            .download_url()
            .ok_or_else(|| RepoError::NoDownloadUrl {
                name: entry.name.clone(),
                version: entry.version.clone(),
            })?;

        // Resolve relative URLs
        let full_url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.url, url.trim_start_matches('/'))
        };

        Ok(self.mirrors.rewrite(&full_url).into_owned())
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::HttpError {
                status: status.as_u16(),
                message: format!("Request to {} failed", url),
            });
        }
        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ChartSource for HttpRepository {
    fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_index(&self) -> Result<RepositoryIndex> {
        let index_url = self.index_url();
        tracing::debug!(url = %index_url, "fetching repository index");

        let data = match self.get_bytes(&index_url).await {
            Err(RepoError::HttpError { status: 404, .. }) => {
                return Err(RepoError::IndexNotFound { url: index_url });
            }
            other => other?,
        };

        let index = RepositoryIndex::from_bytes(&data)?;
        tracing::info!(
            charts = index.chart_count(),
            versions = index.version_count(),
            "fetched repository index"
        );
        Ok(index)
    }

    async fn fetch_chart(&self, entry: &ChartVersionEntry) -> Result<Vec<u8>> {
        let url = self.chart_url(entry)?;
        tracing::debug!(chart = %entry.name, version = %entry.version, url = %url, "downloading chart");
        self.get_bytes(&url).await
    }
}
