use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::{
    r2d2::PoolError,
    result::{DatabaseErrorKind, Error as DieselError},
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;

use crate::media::ImageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found")]
    NotFound,

    #[error("Authentication credentials were not provided")]
    Unauthorized,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Store error: {0}")]
    Store(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Media storage error: {0}")]
    Media(#[from] std::io::Error),

    #[error("Worker error: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Maps a unique-constraint failure to `duplicate`. Two requests racing
    /// past an existence check end up here.
    pub fn duplicate_as(err: DieselError, duplicate: AppError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => duplicate,
            err => AppError::Store(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Pool(_) | AppError::Media(_) | AppError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        AppError::validation("image", err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation { field, message } => {
                let mut errors = Map::new();
                errors.insert(field.clone(), json!([message]));
                Value::Object(errors)
            }
            _ if status.is_server_error() => {
                error!("Request failed: {self}");
                json!({ "detail": "Internal server error" })
            }
            _ => json!({ "detail": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
