use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use drivegate_services::cloud_storage::StoreErrorKind;
use drivegate_services::{CredentialError, ExportError, StoreError};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Unprocessable(String),
    BadGateway(String),
    InsufficientStorage(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::InsufficientStorage(msg) => {
                (StatusCode::INSUFFICIENT_STORAGE, "insufficient_storage", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Picks the HTTP error for a store failure, carrying `message` to the caller.
fn from_store_kind(kind: StoreErrorKind, message: String) -> ApiError {
    match kind {
        StoreErrorKind::NotFound => ApiError::NotFound(message),
        StoreErrorKind::Denied => ApiError::Forbidden(message),
        StoreErrorKind::QuotaExceeded => ApiError::InsufficientStorage(message),
        StoreErrorKind::Transport | StoreErrorKind::Remote => ApiError::BadGateway(message),
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        from_store_kind(err.kind(), err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::RefreshFailed(msg) => {
                ApiError::Unauthorized(format!("Refresh failed: {}", msg))
            }
            CredentialError::CodeExchangeFailed(msg) => {
                ApiError::BadRequest(format!("Authorization code exchange failed: {}", msg))
            }
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        let message = err.to_string();
        match err {
            ExportError::InvalidCredential(_) => ApiError::Unauthorized(message),
            ExportError::UnsupportedExportType { .. }
            | ExportError::CycleDetected { .. }
            | ExportError::DepthExceeded { .. } => ApiError::Unprocessable(message),
            ExportError::Remote { source, .. } => from_store_kind(source.kind(), message),
            ExportError::Archive(_) | ExportError::Io(_) => ApiError::Internal(message),
        }
    }
}
