use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use derive_more::Display;
use serde_json::json;

use crate::services::PoolError;

#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "Internal server error")]
    InternalError,

    #[display(fmt = "Bad request: {}", _0)]
    BadRequest(String),

    #[display(fmt = "Membership error: {}", _0)]
    Membership(String),

    #[display(fmt = "Not found: {}", _0)]
    NotFound(String),

    #[display(fmt = "Conflict: {}", _0)]
    Conflict(String),

    #[display(fmt = "Settlement error: {}", _0)]
    Settlement(String),

    #[display(fmt = "Database error: {}", _0)]
    DatabaseError(String),

    #[display(fmt = "Unauthorized: {}", _0)]
    Unauthorized(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InternalError => "INTERNAL_ERROR",
            ApiError::BadRequest(_) => "VALIDATION_ERROR",
            ApiError::Membership(_) => "MEMBERSHIP_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND_ERROR",
            ApiError::Conflict(_) => "CONFLICT_ERROR",
            ApiError::Settlement(_) => "SETTLEMENT_ERROR",
            ApiError::DatabaseError(_) => "STORE_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }
}

impl From<PoolError> for ApiError {
    fn from(error: PoolError) -> Self {
        let message = error.to_string();
        match error {
            PoolError::Validation(_) => ApiError::BadRequest(message),
            PoolError::Membership { .. } => ApiError::Membership(message),
            PoolError::NotFound { .. } => ApiError::NotFound(message),
            PoolError::Conflict(_) => ApiError::Conflict(message),
            PoolError::Settlement { .. } => {
                log::error!("Settlement error: {}", message);
                ApiError::Settlement(message)
            }
            PoolError::Store(e) => {
                log::error!("Store error: {:#}", e);
                ApiError::DatabaseError(e.to_string())
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InternalError | ApiError::DatabaseError(_) | ApiError::Settlement(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Membership(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            ApiError::InternalError => "Internal server error".to_string(),
            ApiError::DatabaseError(ref message) => format!("Database error: {}", message),
            ApiError::BadRequest(ref message)
            | ApiError::Membership(ref message)
            | ApiError::NotFound(ref message)
            | ApiError::Conflict(ref message)
            | ApiError::Settlement(ref message)
            | ApiError::Unauthorized(ref message) => message.clone(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": error,
            "kind": self.kind()
        }))
    }
}
