use thiserror::Error;
use warp::http::StatusCode;
use crate::pdf::RenderError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Movie not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Render(_) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Internal causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(_) | ApiError::NotFound => self.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl warp::reject::Reject for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;
