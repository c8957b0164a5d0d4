use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Rejected request input. Reported before any state is touched.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("Basket is empty")]
    EmptyBasket,

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Invalid rating")]
    InvalidRating,

    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("Invalid status")]
    InvalidStatus,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthenticated,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error("Orders are created only through the cart")]
    OrdersOnlyFromBasket,

    /// Checkout could not be committed; nothing was written and the caller may retry.
    #[error("Failed to create order: {0}")]
    OrderCreationFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::NotFound,
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(value: diesel::r2d2::PoolError) -> Self {
        AppError::Pool(value.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::OrdersOnlyFromBasket => StatusCode::METHOD_NOT_ALLOWED,
            AppError::OrderCreationFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::OrderCreationFailed(_) => "Failed to create order".to_string(),
            err if err.status_code().is_server_error() => "Internal server error".to_string(),
            err => err.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": message,
        }))
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, AppError>;
