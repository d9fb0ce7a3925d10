//! Application error types.
//!
//! Every failure a request can hit ends up as an [`AppError`]. Clients only
//! ever see a generic 500 body; the variant and message are for server logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

use crate::response::ErrorResponse;

/// Result alias used across the services.
pub type AppResult<T> = Result<T, AppError>;

/// MySQL server error numbers that mean the login itself was refused.
const ACCESS_DENIED_ERRORS: [u16; 4] = [
    1044, // ER_DBACCESS_DENIED_ERROR
    1045, // ER_ACCESS_DENIED_ERROR
    1251, // ER_NOT_SUPPORTED_AUTH_MODE
    1698, // ER_ACCESS_DENIED_NO_PASSWORD_ERROR
];

/// Service error taxonomy.
#[derive(Debug, Error)]
pub enum AppError {
    /// The database could not be reached or refused the login.
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// A statement failed: bad SQL, missing table, denied catalog access,
    /// malformed identifier or an undecodable value.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    /// Invalid startup configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DatabaseConnection(_) => "connection",
            AppError::DatabaseQuery(_) => "query",
            AppError::Configuration(_) => "configuration",
        }
    }

    /// HTTP status for this error. Every variant is reported as a server
    /// error; callers get no hint about the underlying cause.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => AppError::DatabaseConnection(err.to_string()),
            sqlx::Error::Database(db_err)
                if db_err
                    .try_downcast_ref::<MySqlDatabaseError>()
                    .is_some_and(|e| ACCESS_DENIED_ERRORS.contains(&e.number())) =>
            {
                AppError::DatabaseConnection(err.to_string())
            }
            _ => AppError::DatabaseQuery(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse::internal())).into_response()
    }
}
