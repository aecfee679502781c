//! Error types for the registry service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pns_core::RegistryError;
use serde::Serialize;
use thiserror::Error;

/// Service error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Missing or invalid caller identity")]
    MissingCaller,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Registry(e) => {
                let status = match e {
                    RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                    RegistryError::AlreadyActive
                    | RegistryError::NotInGracePeriod
                    | RegistryError::NotExpired
                    | RegistryError::RecordExpired
                    | RegistryError::DuplicateLabel(_) => StatusCode::CONFLICT,
                    RegistryError::NotVerified | RegistryError::NotOwner => StatusCode::FORBIDDEN,
                    RegistryError::Unauthorized | RegistryError::InvalidSignature => {
                        StatusCode::UNAUTHORIZED
                    }
                };
                (status, e.code())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::MissingCaller => (StatusCode::UNAUTHORIZED, "MISSING_CALLER"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENCRYPTION_ERROR"),
            ApiError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<pns_core::ParseIdError> for ApiError {
    fn from(e: pns_core::ParseIdError) -> Self {
        ApiError::BadRequest(format!("invalid identifier: {}", e))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Storage(format!("JSON serialization error: {}", e))
    }
}

impl From<aes_gcm::Error> for ApiError {
    fn from(_: aes_gcm::Error) -> Self {
        ApiError::Encryption("AES-GCM encryption/decryption failed".to_string())
    }
}
