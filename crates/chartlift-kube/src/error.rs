//! Error types for chartlift-kube

use thiserror::Error;

use crate::reconcile::Phase;

/// Result type for chartlift-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during cluster operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Cluster client could not be built
    #[error("cannot connect to cluster: {0}\nHint: Pass --kubeconfig or run inside a pod with a service account")]
    ClientInit(String),

    /// Object is missing a field the reconciler needs
    #[error("invalid {kind} object: {message}")]
    InvalidObject { kind: String, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A reconciliation phase stopped on its first failure
    #[error("{phase} failed on {resource}: {source}")]
    PhaseFailed {
        phase: Phase,
        resource: String,
        #[source]
        source: Box<KubeError>,
    },
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<kube::config::KubeconfigError> for KubeError {
    fn from(e: kube::config::KubeconfigError) -> Self {
        KubeError::ClientInit(e.to_string())
    }
}

impl KubeError {
    /// Attach the phase and the resource being processed
    pub fn in_phase(self, phase: Phase, resource: impl Into<String>) -> Self {
        KubeError::PhaseFailed {
            phase,
            resource: resource.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            KubeError::PhaseFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
