use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Missing or invalid X-User-Id header")]
    Unauthorized,

    #[error("Administrator role required")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::CartNotFound
            | DomainError::CartItemNotFound
            | DomainError::OrderNotFound
            | DomainError::PaymentNotFound => AppError::NotFound(e.to_string()),
            DomainError::EmptyCart
            | DomainError::ProductInvalid(_)
            | DomainError::ProductValidationFailed { .. }
            | DomainError::InvalidInput(_) => AppError::Unprocessable(e.to_string()),
            DomainError::InvalidTransition { .. } | DomainError::CartChanged => {
                AppError::Conflict(e.to_string())
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}
