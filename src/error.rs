use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Handler-level error taxonomy. Every variant maps to one status code and
/// the uniform `{success, message, error?}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Prediction service unavailable: {0}")]
    PredictionUnavailable(String),

    #[error("Internal server error")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PredictionUnavailable(_)
            | ApiError::Database(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Underlying detail is exposed only outside release builds.
    fn detail(&self) -> Option<String> {
        if !cfg!(debug_assertions) {
            return None;
        }
        match self {
            ApiError::Database(e) => Some(e.to_string()),
            ApiError::Internal(e) => Some(format!("{e:#}")),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(e) => error!(error = %e, "database error"),
            ApiError::Internal(e) => error!(error = %e, "internal error"),
            ApiError::PredictionUnavailable(msg) => {
                error!(error = %msg, "prediction upstream failure")
            }
            _ => {}
        }

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            error: self.detail(),
        };
        (self.status(), Json(body)).into_response()
    }
}
