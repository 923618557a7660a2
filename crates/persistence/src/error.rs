//! Store error types.

use thiserror::Error;

use domain::error::{DecodeError, PersistenceError};

/// Errors raised while talking to the fleet backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid backend configuration: {0}")]
    Configuration(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Geofence not found: {0}")]
    NotFound(String),

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<StoreError> for PersistenceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => PersistenceError::NotFound(id),
            StoreError::Status { status, message } => PersistenceError::Rejected { status, message },
            StoreError::Timeout(_) | StoreError::Http(_) | StoreError::Configuration(_) => {
                PersistenceError::Unavailable(err.to_string())
            }
            StoreError::InvalidResponse(_) | StoreError::Serialization(_) | StoreError::Decode(_) => {
                PersistenceError::InvalidResponse(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_rejected() {
        let err: PersistenceError = StoreError::Status {
            status: 400,
            message: "name is required".to_string(),
        }
        .into();
        assert_eq!(
            err,
            PersistenceError::Rejected {
                status: 400,
                message: "name is required".to_string()
            }
        );
    }

    #[test]
    fn test_timeout_maps_to_unavailable() {
        let err: PersistenceError = StoreError::Timeout(5000).into();
        assert_eq!(
            err,
            PersistenceError::Unavailable("Request timeout after 5000ms".to_string())
        );
    }

    #[test]
    fn test_decode_maps_to_invalid_response() {
        let err: PersistenceError = StoreError::Decode(DecodeError::MissingRadius).into();
        assert!(matches!(err, PersistenceError::InvalidResponse(_)));
    }
}
