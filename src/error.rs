//! Error types for the trivia robot

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV file (not a single bad row, those are skipped)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON column could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Oops, that username's taken: {0}")]
    UsernameTaken(String),

    /// The user has answered every stored question
    #[error("You've answered EVERY question! How about listening to some music?")]
    QuestionPoolExhausted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::UsernameTaken(_) => StatusCode::CONFLICT,
            Error::QuestionPoolExhausted => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::NotFound("dj 7".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::UsernameTaken("robot".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::Unauthorized("bad password".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_exhausted_message() {
        let msg = Error::QuestionPoolExhausted.to_string();
        assert!(msg.contains("EVERY question"));
    }
}
