//! Mapping of domain errors to HTTP responses.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::analysis::{AnalysisError, UploadError};
use crate::library::LibraryError;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Security(String),
    NotFound(String),
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Security(_) => (StatusCode::BAD_REQUEST, "SecurityError"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge"),
            ApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UnsupportedMediaType")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match self {
            ApiError::Security(detail) => {
                warn!(target: "security", "Rejected file reference: {:?}", detail);
                "Invalid file reference".to_string()
            }
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                "Internal server error".to_string()
            }
            ApiError::Validation(message)
            | ApiError::NotFound(message)
            | ApiError::PayloadTooLarge(message)
            | ApiError::UnsupportedMediaType(message) => message,
        };

        let body = ErrorBody {
            success: false,
            error: kind,
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(message) => ApiError::Validation(message),
            AnalysisError::Unidentified => ApiError::Validation(err.to_string()),
            AnalysisError::Security(reference) => ApiError::Security(reference),
            AnalysisError::NotFound(_) => ApiError::NotFound("Uploaded file not found".to_string()),
            AnalysisError::Internal(inner) => ApiError::Internal(inner),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge(..) => ApiError::PayloadTooLarge(err.to_string()),
            UploadError::UnsupportedMediaType(_) => {
                ApiError::UnsupportedMediaType("Only audio files are allowed".to_string())
            }
            UploadError::Empty => ApiError::Validation("No audio file uploaded".to_string()),
            UploadError::InvalidReference(reference) => ApiError::Security(reference),
            UploadError::NotFound(_) => ApiError::NotFound("Uploaded file not found".to_string()),
            UploadError::Io(e) => ApiError::Internal(e.into()),
        }
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Store errors carry validation failures as [`LibraryError`]; anything
/// else is internal.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<LibraryError>() {
            Ok(library_error) => library_error.into(),
            Err(other) => ApiError::Internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("File too large".to_string())
        } else {
            ApiError::Validation(err.body_text())
        }
    }
}
