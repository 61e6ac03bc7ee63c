// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bim45d_processing::Error as ProcessingError;
use serde::Serialize;
use thiserror::Error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing file in request")]
    MissingFile,

    #[error("File too large: maximum size is {max_mb} MB")]
    FileTooLarge { max_mb: usize },

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Missing or invalid x-session-id header")]
    MissingSession,

    #[error("Session not found or expired: {0}")]
    SessionNotFound(String),

    #[error("No IFC model loaded in this session")]
    NoModel,

    #[error("Invalid IFC file: {0}")]
    InvalidModel(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Processing(String),

    #[error("Validator error: {0}")]
    Validator(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ApiError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "MULTIPART_ERROR"),
            ApiError::MissingSession => (StatusCode::UNAUTHORIZED, "MISSING_SESSION"),
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ApiError::NoModel => (StatusCode::CONFLICT, "NO_MODEL"),
            ApiError::InvalidModel(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_MODEL"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Processing(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PROCESSING_ERROR"),
            ApiError::Validator(_) => (StatusCode::BAD_GATEWAY, "VALIDATOR_ERROR"),
            ApiError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TASK_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<bim45d_core::Error> for ApiError {
    fn from(err: bim45d_core::Error) -> Self {
        match err {
            bim45d_core::Error::EntityNotFound(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Core(core) => core.into(),
            ProcessingError::InvalidInput(_)
            | ProcessingError::RuleIndex { .. }
            | ProcessingError::UnknownOption { .. }
            | ProcessingError::Xml(_)
            | ProcessingError::Json(_)
            | ProcessingError::Csv(_) => ApiError::BadRequest(err.to_string()),
            ProcessingError::Validator(message) => ApiError::Validator(message),
            ProcessingError::Zip(_)
            | ProcessingError::Xlsx(_)
            | ProcessingError::Pdf(_)
            | ProcessingError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<cacache::Error> for ApiError {
    fn from(err: cacache::Error) -> Self {
        ApiError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON error: {}", err))
    }
}
