//! Mapping of application errors onto HTTP responses
//!
//! Every authentication failure leaves the service as a 401 with one of a
//! few fixed messages; the precise reason only goes to the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::shared::{AppError, AuthError};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        debug!(reason = self.kind(), detail = %self, "Responding 401");
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(self.public_message())),
        )
            .into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
            AppError::Auth(err) => err.into_response(),
            AppError::Internal(detail) => {
                error!(detail = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("server error")),
                )
                    .into_response()
            }
        }
    }
}
