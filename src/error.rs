use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::classify::ClassifyError;
use crate::store::StoreError;
use crate::validation::ValidationError;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a handler can return. Rendered as `{success: false, message}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("Server error: {0}")]
    Store(#[from] StoreError),

    #[error("Server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Classify(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!(error = %message, "Request failed");
        }

        (
            status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}
