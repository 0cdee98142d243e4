use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

const INTERNAL_ERROR: &str = "Internal Server Error";
const INTERNAL_MESSAGE: &str = "The budget server could not complete the request";

/// Everything a handler can fail with. `IntoResponse` is the one place these
/// become HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("budget client call failed")]
    Delegate(#[source] anyhow::Error),

    #[error("budget client call timed out after {0:?}")]
    Timeout(Duration),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Delegate(_) | ApiError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Delegate(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(message) => json!({ "error": message }),
            ApiError::NotFound(_) => json!({ "error": "Not Found" }),
            ApiError::MethodNotAllowed(_) => json!({ "error": "Method Not Allowed" }),
            ApiError::Delegate(source) => {
                // Detail stays in the log, never in the body.
                error!(error = ?source, "Budget client call failed");
                json!({ "error": INTERNAL_ERROR, "message": INTERNAL_MESSAGE })
            }
            ApiError::Timeout(after) => {
                error!(timeout = ?after, "Budget client call timed out");
                json!({ "error": INTERNAL_ERROR, "message": INTERNAL_MESSAGE })
            }
        };
        (status, Json(body)).into_response()
    }
}
