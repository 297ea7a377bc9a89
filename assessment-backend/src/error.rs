use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidPayload(#[from] validator::ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("This code has already been redeemed")]
    AlreadyRedeemed,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Persistence error: {0}")]
    Persistence(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable kind, shared by the JSON body and the logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::Validation(_) | Error::InvalidPayload(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::InsufficientCredits => "insufficient_credits",
            Error::AlreadyRedeemed => "already_redeemed",
            Error::InvalidCode => "invalid_code",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden => "forbidden",
            Error::Persistence(_) | Error::Migration(_) => "persistence_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let kind = self.kind();
        let (status, message) = match &self {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::InvalidPayload(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::InsufficientCredits => (StatusCode::PAYMENT_REQUIRED, self.to_string()),
            Error::AlreadyRedeemed => (StatusCode::CONFLICT, self.to_string()),
            Error::InvalidCode => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Error::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            Error::Persistence(err) => {
                tracing::error!(error = ?err, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage is temporarily unavailable, please retry".to_string(),
                )
            }
            _ => {
                tracing::error!(error = %self, "unexpected failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": kind, "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Persistence(other),
        }
    }
}
