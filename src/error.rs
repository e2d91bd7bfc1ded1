use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a request or channel frame can fail with. Infrastructure
/// variants are collapsed to a generic message at the boundary so disk
/// paths and parser detail never reach a client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unsupported format, use \"txt\" or \"pdf\"")]
    UnsupportedFormat,

    #[error("store i/o failed: {0}")]
    Store(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ApiError {
    pub fn missing(field: &str) -> Self {
        Self::Validation(format!("missing required field \"{field}\""))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UnsupportedFormat => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_owned()
        } else {
            self.to_string()
        }
    }

    /// Failure frame for the realtime channels, sent to the originating
    /// connection only, never broadcast.
    pub fn to_frame(&self) -> String {
        json!({ "success": false, "message": self.public_message() }).to_string()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.public_message();
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
