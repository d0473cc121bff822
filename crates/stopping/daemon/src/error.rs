//! Error types for stopping-daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stopping_cluster::ClusterError;
use stopping_types::{ClientId, DecodeError, InstanceId};
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cluster gateway error
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Notifier setup error
    #[error("Notifier error: {0}")]
    Notify(#[from] NotifyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

/// Downstream notification errors
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Downstream service rejected the call
    #[error("Downstream error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Record needed to authenticate the call is missing
    #[error("No instance record for {0}")]
    MissingRecord(String),

    /// Storage lookup failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Why a stop attempt did not complete
#[derive(Debug, Error)]
pub enum StopError {
    /// No record exists for the candidate
    #[error("instance {instance_id} of client {client_id} not found")]
    RecordNotFound {
        client_id: ClientId,
        instance_id: InstanceId,
    },

    /// The record is missing its instance id, algo id or auth token
    #[error("instance {instance_id} of client {client_id} is incomplete and cannot be stopped")]
    IncompleteRecord {
        client_id: ClientId,
        instance_id: InstanceId,
    },

    /// Pod metadata could not be decoded
    #[error("undecodable pod: {0}")]
    Decode(#[from] DecodeError),

    /// Storage failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cluster failure
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or unknown credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cluster error
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Cluster(_) => (StatusCode::BAD_GATEWAY, "CLUSTER_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );

        assert_eq!(
            ApiError::BadRequest("test".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );

        assert_eq!(
            ApiError::Unauthorized("test".to_string())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );

        assert_eq!(
            ApiError::Storage(StorageError::Query("boom".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        assert_eq!(
            ApiError::Cluster(ClusterError::Unavailable("down".into()))
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_body_carries_message_and_code() {
        let body = ErrorResponse {
            error: ApiError::BadRequest("pod not found".into()).to_string(),
            code: "BAD_REQUEST".into(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"error": "Bad request: pod not found", "code": "BAD_REQUEST"})
        );
    }

    #[test]
    fn test_stop_error_names_the_candidate() {
        let err = StopError::IncompleteRecord {
            client_id: ClientId::new("C1"),
            instance_id: InstanceId::new("I1"),
        };
        assert_eq!(
            err.to_string(),
            "instance I1 of client C1 is incomplete and cannot be stopped"
        );
    }
}
