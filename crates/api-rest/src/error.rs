//! HTTP error responses.

use api_shared::MessageRes;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use telehealth_core::AccountError;

/// A failure ready to be sent to the client as `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Maps a domain error to its response.
    ///
    /// `failure` is the message used for storage and other internal errors, whose details are
    /// logged and never returned.
    pub fn from_account(err: AccountError, failure: &'static str) -> Self {
        match err {
            AccountError::Unauthenticated => {
                Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
            }
            AccountError::Forbidden { .. } => Self::new(StatusCode::FORBIDDEN, "Access denied"),
            AccountError::InvalidUpdate(_) => Self::new(StatusCode::BAD_REQUEST, "Invalid updates"),
            AccountError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            AccountError::InvalidInput(detail) => Self::new(StatusCode::BAD_REQUEST, detail),
            AccountError::AlreadyExists(detail) => Self::new(StatusCode::CONFLICT, detail),
            AccountError::NotFound => Self::new(StatusCode::NOT_FOUND, "Account not found"),
            other => {
                tracing::error!("{failure}: {other}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failure)
            }
        }
    }

    /// Malformed or missing JSON body.
    pub fn from_json_rejection(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageRes::new(self.message))).into_response()
    }
}
