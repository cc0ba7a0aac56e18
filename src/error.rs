use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AppError
///
/// The single error type flowing out of repositories, services and handlers.
/// Each variant maps onto one HTTP status class so handlers can simply `?`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range input (lengths, blank fields, bad slugs).
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// No usable identity was presented on a route that needs one.
    #[error("Authentication required")]
    Unauthorized,

    /// An identity was presented but the policy denied the action.
    #[error("Access denied")]
    Forbidden,

    /// Uniqueness or reference constraint hit (duplicate email, slug in use, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// AppResult
///
/// Result alias used across the crate.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "authentication_error",
            AppError::Forbidden => "authorization_error",
            AppError::Conflict(_) => "conflict",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// Translates driver errors, keeping constraint violations distinguishable
/// from genuine store failures.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 unique_violation, 23503 foreign_key_violation
            match db_err.code().as_deref() {
                Some("23505") => {
                    return AppError::Conflict("resource already exists".to_string());
                }
                Some("23503") => {
                    return AppError::Conflict("resource is still referenced".to_string());
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store and internal failures are logged in full but never echoed to the client.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database failure: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("internal failure: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
