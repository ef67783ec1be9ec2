//! Error types for repository import operations

use thiserror::Error;

/// Repository import errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Configuration Errors ============
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("No credentials available: {message}")]
    MissingCredentials { message: String },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    // ============ Index Errors ============
    #[error("Index not found at {url}")]
    IndexNotFound { url: String },

    #[error("Index parse error: {message}")]
    IndexParseError { message: String },

    // ============ Chart Errors ============
    #[error("Chart {name}:{version} has no download URL")]
    NoDownloadUrl { name: String, version: String },

    // ============ App Store Errors ============
    #[error("App store endpoint not found at {url}, check that the app store manager is installed")]
    AppStoreNotFound { url: String },

    #[error("Upload rejected with status {status}: {body}")]
    UploadRejected { status: u16, body: String },

    #[error("Invalid upload response: {message}")]
    InvalidResponse { message: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for repository import operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Whether this error must abort the whole import run
    ///
    /// A missing app store endpoint means every later upload would fail the
    /// same way, so the run stops instead of logging one failure per chart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RepoError::AppStoreNotFound { .. })
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: crate::http::REQUEST_TIMEOUT.as_secs(),
            }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}
