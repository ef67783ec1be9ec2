//! CLI error types with exit code handling
//!
//! Library errors are sorted into the failure classes of `exit_codes`.

use chartlift_kube::KubeError;
use chartlift_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Missing or invalid settings, including credentials
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartlift::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Repository index could not be fetched or parsed
    #[error("Repository error: {message}")]
    #[diagnostic(code(chartlift::cli::repository))]
    Repository {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Upload endpoint missing
    #[error("App store error: {message}")]
    #[diagnostic(
        code(chartlift::cli::appstore),
        help("Make sure the KubeSphere app store extension is installed and --server points at the API gateway")
    )]
    AppStore { message: String },

    /// Cluster client could not be built
    #[error("Cluster error: {message}")]
    #[diagnostic(code(chartlift::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A publish phase failed
    #[error("Publish failed: {message}")]
    #[diagnostic(
        code(chartlift::cli::publish),
        help("Fix the cause and run `chartlift publish` to finish without uploading again")
    )]
    Publish { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(chartlift::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Repository { .. } => exit_codes::REPOSITORY_ERROR,
            CliError::AppStore { .. } => exit_codes::APP_STORE_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Publish { .. } => exit_codes::PUBLISH_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err {
            RepoError::InvalidUrl { .. } | RepoError::InvalidConfig { .. } => {
                CliError::config(message)
            }
            RepoError::MissingCredentials { .. } => CliError::config_with_help(
                message,
                "Pass --username/--password, --token or --token-file",
            ),
            RepoError::AppStoreNotFound { .. } => CliError::AppStore { message },
            RepoError::IndexNotFound { .. } => CliError::Repository {
                message,
                help: Some("--repo must point at the directory holding index.yaml".to_string()),
            },
            RepoError::IndexParseError { .. }
            | RepoError::HttpError { .. }
            | RepoError::NetworkError { .. }
            | RepoError::Timeout { .. } => CliError::Repository {
                message,
                help: None,
            },
            _ => CliError::Other { message },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        let not_found = err.is_not_found();
        match err {
            KubeError::ClientInit(_) => CliError::Cluster {
                message,
                help: Some("Pass --kubeconfig or run inside the cluster".to_string()),
            },
            KubeError::Api(_) => CliError::Cluster {
                message,
                help: not_found.then(|| {
                    "The application.kubesphere.io/v2 resources are not served, check that the app store is installed"
                        .to_string()
                }),
            },
            _ => CliError::Publish { message },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
