use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use factha_auth::{AuthzError, PasswordError};
use factha_classifier::ClassifierError;
use factha_core::DomainError;
use factha_infra::repository::RepositoryError;
use factha_infra::storage::StorageError;

/// Every way a handler can fail, mapped onto a status and an `error` code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidId(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    ModelUnavailable(String),

    /// Logged, never shown to the client.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            ApiError::ModelUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                json_error(status, code, "internal server error")
            }
            ApiError::ModelUnavailable(detail) => {
                tracing::warn!(error = %detail, "classifier unavailable");
                json_error(status, code, "prediction model is not available")
            }
            other => json_error(status, code, other.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "status": "fail",
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::InvalidId(msg) => ApiError::InvalidId(msg),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::NotFound("not found".to_string()),
            RepositoryError::Conflict(msg) => ApiError::Conflict(msg),
            RepositoryError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedContentType(_) => ApiError::UnsupportedMediaType(err.to_string()),
            StorageError::InvalidKey(_) | StorageError::Auth(_) | StorageError::Backend(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::EmptyInput => ApiError::Validation(err.to_string()),
            ClassifierError::NotConfigured
            | ClassifierError::Io(_)
            | ClassifierError::Parse(_)
            | ClassifierError::InvalidArtifact(_) => ApiError::ModelUnavailable(err.to_string()),
            ClassifierError::InvalidInput(_)
            | ClassifierError::ShapeMismatch { .. }
            | ClassifierError::InvalidOutput(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(err.body_text());
        }
        ApiError::Validation(err.body_text())
    }
}
