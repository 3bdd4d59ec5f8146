use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::auth::sessions::SessionError;
use crate::gateway::{Entity, GatewayError};
use crate::profile::validation::FieldError;

/// Every failure a service operation can report to the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("already taken")]
    Conflict(Vec<FieldError>),
    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),
    #[error("authentication required")]
    Unauthenticated,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not enough coins")]
    InsufficientFunds,
    #[error("skin is not owned")]
    SkinNotOwned,
    #[error("incomplete request: {0}")]
    IncompleteRequest(&'static str),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("storage unavailable")]
    Unavailable(#[source] GatewayError),
    #[error("session store failed")]
    Session(#[from] SessionError),
    #[error("blob storage failed")]
    Storage(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct FieldErrorList {
    error: Vec<FieldError>,
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(entity) => AppError::NotFound(entity),
            GatewayError::DuplicateEmail => AppError::Conflict(vec![FieldError::email_taken()]),
            GatewayError::DuplicateNickname => {
                AppError::Conflict(vec![FieldError::nickname_taken()])
            }
            GatewayError::MissingRequiredField => {
                AppError::IncompleteRequest("required field missing")
            }
            GatewayError::InsufficientFunds => AppError::InsufficientFunds,
            err @ GatewayError::Unavailable(_) => AppError::Unavailable(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self {
        AppError::MalformedInput(rej.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::MalformedInput(err.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationFailed(_) => StatusCode::FORBIDDEN,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials
            | AppError::InsufficientFunds
            | AppError::SkinNotOwned
            | AppError::IncompleteRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_)
            | AppError::Session(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // detail stays in the logs
            error!(error = ?self, "request failed");
            return (status, Json(json!({ "error": "internal server error" }))).into_response();
        }
        match self {
            AppError::Conflict(errors) | AppError::ValidationFailed(errors) => {
                (status, Json(FieldErrorList { error: errors })).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}
