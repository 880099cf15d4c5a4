//! Error types for the subscription tracker

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("unsupported username")]
  InvalidUsername,

  #[error("user not found")]
  UserNotFound,

  #[error("user already exists")]
  UserExists,

  #[error("store operation timed out")]
  Deadline,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("malformed checkpoint: {0}")]
  Checkpoint(#[from] chrono::ParseError),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      Error::InvalidUsername => {
        (StatusCode::BAD_REQUEST, "Unsupported username")
      }
      Error::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
      Error::UserExists => (StatusCode::CONFLICT, "User already exists"),
      Error::Database(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
      }
      Error::Deadline => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Operation timed out")
      }
      Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO error"),
      Error::Checkpoint(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
      }
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T> = std::result::Result<T, Error>;
