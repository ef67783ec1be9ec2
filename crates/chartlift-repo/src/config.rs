//! Import configuration
//!
//! Read from `~/.config/chartlift/config.yaml` (or an explicit path) and
//! overridden field by field from the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{RepoError, Result};
use crate::http::normalize_base_url;
use crate::mirror::{MirrorRewriter, MirrorRule};
use crate::pacing::DEFAULT_PACE;
use crate::selection::{GroupBoundary, RetentionPolicy};

/// Category label value marking freshly imported applications
pub const DEFAULT_MARKER: &str = "openpitrix-import";

/// Import configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// KubeSphere API gateway URL
    pub server: Option<String>,

    /// Helm repository URL (without `/index.yaml`)
    pub repo: Option<String>,

    /// Basic auth username
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// Bearer token
    pub token: Option<String>,

    /// File holding the bearer token (defaults to the service-account token)
    pub token_file: Option<PathBuf>,

    /// Kubeconfig used for the publish phases
    pub kubeconfig: Option<PathBuf>,

    /// Category label value of imported applications
    pub marker: String,

    /// Which versions of each chart are uploaded
    pub retention: RetentionConfig,

    /// Delay between two upload calls, in milliseconds
    pub pace_millis: u64,

    /// Download URL rewrite rules
    pub mirrors: Vec<MirrorRule>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            server: None,
            repo: None,
            username: None,
            password: None,
            token: None,
            token_file: None,
            kubeconfig: None,
            marker: DEFAULT_MARKER.to_string(),
            retention: RetentionConfig::default(),
            pace_millis: DEFAULT_PACE.as_millis() as u64,
            mirrors: Vec::new(),
        }
    }
}

/// Retention section of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetentionConfig {
    /// Keep only the latest patch of each minor version
    pub latest_patch_only: bool,

    /// Upload at most this many versions per chart
    pub max_versions: Option<usize>,

    /// Compare minor versions for equality instead of substring containment
    pub strict_minor_groups: bool,
}

impl ImportConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| RepoError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("chartlift").join("config.yaml"))
    }

    /// Check the settings an import cannot run without
    pub fn validate(&self) -> Result<()> {
        self.server_url()?;
        self.validate_source()
    }

    /// Check the settings needed to read and filter the repository
    pub fn validate_source(&self) -> Result<()> {
        self.repo_url()?;
        if self.marker.trim().is_empty() {
            return Err(RepoError::InvalidConfig {
                message: "marker must not be empty".to_string(),
            });
        }
        if self.retention.max_versions == Some(0) {
            return Err(RepoError::InvalidConfig {
                message: "maxVersions must be at least 1".to_string(),
            });
        }
        self.mirror_rewriter()?;
        Ok(())
    }

    /// App store gateway URL
    pub fn server_url(&self) -> Result<String> {
        required_url(self.server.as_deref(), "server")
    }

    /// Chart repository URL
    pub fn repo_url(&self) -> Result<String> {
        required_url(self.repo.as_deref(), "repo")
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            latest_patch_only: self.retention.latest_patch_only,
            max_versions: self.retention.max_versions,
            boundary: if self.retention.strict_minor_groups {
                GroupBoundary::Exact
            } else {
                GroupBoundary::Substring
            },
        }
    }

    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_millis)
    }

    /// App store credentials, in selection order
    pub fn credentials(&self) -> Credentials {
        Credentials::select(
            self.username.as_deref(),
            self.password.as_deref(),
            self.token.as_deref(),
            self.token_file.as_deref(),
        )
    }

    pub fn mirror_rewriter(&self) -> Result<MirrorRewriter> {
        MirrorRewriter::new(&self.mirrors)
    }
}

fn required_url(value: Option<&str>, field: &str) -> Result<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(url) => normalize_base_url(url),
        None => Err(RepoError::InvalidConfig {
            message: format!("{} URL is required", field),
        }),
    }
}
