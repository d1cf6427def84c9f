use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use sqlx::error::ErrorKind;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] Box<figment::Error>),

    #[error("username already taken: {0}")]
    DuplicateUsername(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("table `{table}` does not match its declaration: {}", problems.join("; "))]
    SchemaConflict { table: String, problems: Vec<String> },

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("missing JSON body")]
    MissingJsonBody,

    #[error("request body too large")]
    PayloadTooLarge,
}

impl AuthError {
    /// Classify a failed write against the users table.
    pub fn from_write(err: SqlxError, username: &str) -> Self {
        let SqlxError::Database(db_err) = &err else {
            return AuthError::DatabaseError(err);
        };
        match db_err.kind() {
            ErrorKind::UniqueViolation => AuthError::DuplicateUsername(username.to_string()),
            ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                AuthError::ConstraintViolation(db_err.message().to_string())
            }
            _ => AuthError::DatabaseError(err),
        }
    }
}

impl From<figment::Error> for AuthError {
    fn from(e: figment::Error) -> Self {
        AuthError::ConfigError(Box::new(e))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            AuthError::DuplicateUsername(name) => (
                StatusCode::CONFLICT,
                "DUPLICATE_USERNAME",
                format!("username `{name}` is already taken"),
            ),
            AuthError::ConstraintViolation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CONSTRAINT_VIOLATION", msg)
            }
            AuthError::InvalidJson(msg) => (StatusCode::BAD_REQUEST, "INVALID_JSON", msg),
            AuthError::MissingJsonBody => (
                StatusCode::BAD_REQUEST,
                "MISSING_JSON_BODY",
                "expected a JSON request body".to_string(),
            ),
            AuthError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "request body too large".to_string(),
            ),
            AuthError::DatabaseError(_)
            | AuthError::IoError(_)
            | AuthError::ConfigError(_)
            | AuthError::SchemaConflict { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
