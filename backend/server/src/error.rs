use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dice::{ParseError, payloads::ErrorBody};
use thiserror::Error;
use tracing::error;

use crate::database::StoreError;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include internal error detail in 500 bodies. Off in production.
pub fn expose_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("All fields are required: {0}")]
    MissingFields(&'static str),

    #[error("Incomplete or invalid data: {0}")]
    InvalidInput(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A valid userId is required in the query string")]
    OwnerRequired,

    #[error("Invalid user id")]
    InvalidOwner,

    #[error("Invalid {0} id")]
    InvalidIdentifier(&'static str),

    #[error("No fields provided for update")]
    NoFieldsProvided,

    #[error("{0}")]
    InvalidCategory(ParseError),

    #[error("{0}")]
    InvalidSortField(ParseError),

    #[error("Quick roll does not exist")]
    NotFound,

    #[error("You do not have permission to {0} this quick roll")]
    Forbidden(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // NotFound stays a 400, clients already branch on it.
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = if status.is_server_error() {
            error!("Request failed: {self}");

            ErrorBody {
                success: false,
                error: "Internal server error".to_string(),
                details: EXPOSE_DETAILS
                    .load(Ordering::Relaxed)
                    .then(|| self.to_string()),
            }
        } else {
            ErrorBody {
                success: false,
                error: self.to_string(),
                details: None,
            }
        };

        (status, Json(body)).into_response()
    }
}
