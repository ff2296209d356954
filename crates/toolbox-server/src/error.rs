use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use toolbox_mcp::tools::http_request::HttpRequestError;

/// Failure of a plain REST route, rendered as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid JSON")]
    InvalidJson(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotConfigured(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = match &self {
            Self::InvalidJson(detail) => json!({ "error": self.to_string(), "detail": detail }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<toolbox_core::Error> for ApiError {
    fn from(err: toolbox_core::Error) -> Self {
        match err {
            toolbox_core::Error::NotConfigured(capability) => Self::NotConfigured(capability),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<HttpRequestError> for ApiError {
    fn from(err: HttpRequestError) -> Self {
        Self::Upstream {
            status: StatusCode::from_u16(err.status).unwrap_or(StatusCode::BAD_GATEWAY),
            message: err.message,
        }
    }
}
