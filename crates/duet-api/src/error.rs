use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use duet_db::DbError;
use duet_types::api::ErrorBody;
use duet_types::models::UserId;

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("No content provided")]
    EmptyContent,

    #[error("User {0} not found")]
    NotFound(UserId),

    #[error("No such user: {0}")]
    NoSuchUser(UserId),

    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Storage failure: {0}")]
    StorageFailure(#[source] DbError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DbError> for ChatError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UsernameTaken(username) => Self::DuplicateUsername(username),
            DbError::EmptyContent => Self::EmptyContent,
            other => Self::StorageFailure(other),
        }
    }
}

// Extractor rejections answer with the same JSON error body as everything else
impl From<PathRejection> for ChatError {
    fn from(_: PathRejection) -> Self {
        Self::InvalidInput("malformed user id")
    }
}

impl From<JsonRejection> for ChatError {
    fn from(_: JsonRejection) -> Self {
        Self::InvalidInput("malformed request body")
    }
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateUsername(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::EmptyContent | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::NoSuchUser(_) => StatusCode::NOT_FOUND,
            Self::StorageFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Storage and internal details stay in the logs
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
