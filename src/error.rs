use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    identity::IdentityError, models::MessageResponse, repository::RepositoryError,
    storage::StorageError,
};

/// AppError
///
/// Every failure a guard or handler can report. Rendered as
/// `{"message": "..."}` with the matching status code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Identity(IdentityError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Identity(IdentityError::Rejected(_)) => StatusCode::BAD_REQUEST,
            Self::Repository(RepositoryError::Duplicate(_)) => StatusCode::CONFLICT,
            Self::Repository(_) | Self::Storage(_) | Self::Identity(_) | Self::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // Internal details stay in the logs.
            tracing::error!(error = %self, "request failed");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}
