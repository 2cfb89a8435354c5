//! Mapping journal errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;

use journal_core::JournalError;

/// Error returned by every handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// Protected route reached without a session
    #[error("Login required")]
    LoginRequired,
}

/// JSON body sent with every error status
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::LoginRequired => StatusCode::SEE_OTHER,
            ApiError::Journal(err) => status_for(err),
        }
    }
}

/// HTTP status for a journal error
pub fn status_for(err: &JournalError) -> StatusCode {
    match err {
        JournalError::Validation(_) => StatusCode::BAD_REQUEST,
        JournalError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        JournalError::Forbidden { .. } => StatusCode::FORBIDDEN,
        JournalError::NotFound(_) => StatusCode::NOT_FOUND,
        JournalError::DuplicateUsername(_) | JournalError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        JournalError::Storage(_) | JournalError::UploadOrphan { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::LoginRequired => return Redirect::to("/login").into_response(),
            ApiError::Journal(err) => err,
        };

        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(kind = err.kind(), error = %err, "Request failed");
        } else {
            tracing::debug!(kind = err.kind(), error = %err, "Request rejected");
        }

        let body = ErrorBody {
            error: err.kind(),
            message: err.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
