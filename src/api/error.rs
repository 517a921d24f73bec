//! API error handling.
//!
//! Every failure leaves the API as `{"success": false, "message": ...}`,
//! with field-level `errors` for validation failures.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::AppError;
use crate::domain::{FieldError, ValidationError};

/// JSON body of an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// API error response containing status code and error body.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                success: false,
                message: message.into(),
                errors: None,
            },
        }
    }

    /// 400 with one entry per rejected field.
    pub fn validation(error: ValidationError) -> Self {
        let mut response = Self::new(StatusCode::BAD_REQUEST, "Invalid data");
        response.body.errors = Some(error.errors);
        response
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 500. Details stay in the server log.
    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AppError> for ApiErrorResponse {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation(e) => Self::validation(e),
            AppError::CustomerNotFound(_) => Self::not_found("Customer not found"),
            AppError::TransactionNotFound(_) => Self::not_found("Transaction not found"),
            AppError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AppError::InvalidToken => Self::unauthorized("Invalid token"),
            AppError::UserAlreadyExists(_) => Self::new(StatusCode::CONFLICT, "User already exists"),
            AppError::Database(e) => {
                tracing::error!(error = ?e, "request failed");
                Self::internal_error()
            }
        }
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(ValidationError::single("body", rejection.body_text()))
    }
}
