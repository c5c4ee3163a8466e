use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use corkboard_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Store(e) => match e {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            ServerError::FileNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ServerError::Store(e) => e.code(),
            ServerError::FileNotFound(_) => "ENOTFOUND",
            ServerError::BadRequest(_) => "EBADREQUEST",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Never leak filesystem detail on unexpected failures.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed unexpectedly");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": self.code(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
