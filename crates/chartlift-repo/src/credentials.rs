//! App store credentials
//!
//! Selection order:
//! - Basic authentication when both a username and a password are set
//! - Bearer token when a token is set
//! - Bearer token read from the pod service-account token file otherwise

use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};

/// Token mounted into every pod that runs with a service account
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Credential types supported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Basic authentication (username/password)
    Basic { username: String, password: String },

    /// Bearer token authentication
    Bearer { token: String },

    /// Bearer token stored in a file
    TokenFile { path: PathBuf },
}

impl Credentials {
    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create bearer token credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer {
            token: token.into(),
        }
    }

    /// Pick credentials from the configured options
    ///
    /// Blank strings count as unset. `token_file` defaults to
    /// [`SERVICE_ACCOUNT_TOKEN_PATH`].
    pub fn select(
        username: Option<&str>,
        password: Option<&str>,
        token: Option<&str>,
        token_file: Option<&Path>,
    ) -> Self {
        fn present(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.trim().is_empty())
        }

        if let (Some(username), Some(password)) = (present(username), present(password)) {
            return Credentials::basic(username, password);
        }
        if let Some(token) = present(token) {
            return Credentials::bearer(token.trim());
        }
        Credentials::TokenFile {
            path: token_file
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH)),
        }
    }

    /// Resolve credentials to actual values
    pub fn resolve(&self) -> Result<ResolvedCredentials> {
        match self {
            Credentials::Basic { username, password } => Ok(ResolvedCredentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            Credentials::Bearer { token } => Ok(ResolvedCredentials::Bearer {
                token: token.clone(),
            }),
            Credentials::TokenFile { path } => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| RepoError::MissingCredentials {
                        message: format!(
                            "no username/password or token given and {} is unreadable: {}",
                            path.display(),
                            e
                        ),
                    })?;
                let token = content.trim();
                if token.is_empty() {
                    return Err(RepoError::MissingCredentials {
                        message: format!("token file {} is empty", path.display()),
                    });
                }
                tracing::debug!(path = %path.display(), "using token from file");
                Ok(ResolvedCredentials::Bearer {
                    token: token.to_string(),
                })
            }
        }
    }
}

/// Resolved credentials ready for use
#[derive(Clone)]
pub enum ResolvedCredentials {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl ResolvedCredentials {
    /// Authorization header value
    pub fn auth_header(&self) -> String {
        match self {
            ResolvedCredentials::Basic { username, password } => {
                let encoded = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{}:{}", username, password),
                );
                format!("Basic {}", encoded)
            }
            ResolvedCredentials::Bearer { token } => format!("Bearer {}", token),
        }
    }

    /// Scheme name, for logging without leaking the secret
    pub fn scheme(&self) -> &'static str {
        match self {
            ResolvedCredentials::Basic { .. } => "basic",
            ResolvedCredentials::Bearer { .. } => "bearer",
        }
    }
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedCredentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            ResolvedCredentials::Bearer { .. } => {
                f.debug_struct("Bearer").field("token", &"***").finish()
            }
        }
    }
}
