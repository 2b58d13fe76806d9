use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Question generator error: {0}")]
    Upstream(String),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The quiz was committed but its attempt was not.
    #[error("Quiz {quiz_id} was saved but its attempt was not: {reason}")]
    AttemptNotSaved { quiz_id: Uuid, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match &self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Error::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to generate the exam: {}", msg),
            ),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to generate the exam: {}", err),
            ),
            Error::AttemptNotSaved { quiz_id, reason } => {
                let body = Json(json!({
                    "error": format!("Quiz saved but attempt could not be recorded: {}", reason),
                    "quizId": quiz_id,
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
