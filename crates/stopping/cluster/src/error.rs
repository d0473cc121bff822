//! Cluster gateway errors

use thiserror::Error;

/// Errors returned by a cluster gateway
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Transport failure talking to the cluster API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The cluster API answered with a non-success status
    #[error("cluster API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// A request URL could not be built from the configured base
    #[error("invalid cluster URL: {0}")]
    InvalidUrl(String),

    /// Gateway misconfiguration
    #[error("configuration error: {0}")]
    Config(String),

    /// Injected or simulated failure
    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

impl ClusterError {
    /// Whether the error means the target object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Result type for cluster operations
pub type ClusterResult<T> = Result<T, ClusterError>;
