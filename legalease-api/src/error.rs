//! Error types for legalease-api
//!
//! Every handler error renders as `{"error": "<message>"}` with the matching
//! HTTP status, which is the shape the web client and extension expect.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai::AiError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid session (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Conflict (409) - e.g. analysis already running
    #[error("{0}")]
    Conflict(String),

    /// Upload over the configured size limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// File format text cannot be extracted from (415)
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// Generative model call failed (502)
    #[error("{0}")]
    Upstream(String),

    /// Generative model did not answer in time (504)
    #[error("{0}")]
    GatewayTimeout(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// legalease-common error
    #[error(transparent)]
    Common(#[from] legalease_common::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn document_not_found() -> Self {
        ApiError::NotFound("Document not found".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Common(legalease_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Common(legalease_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Common(_) | ApiError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(legalease_common::Error::Database(err))
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            _ => ApiError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let response = ApiError::BadRequest("No file provided".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_internal_errors_are_masked() {
        let response = ApiError::Internal("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }

    #[test]
    fn test_common_errors_map_to_status() {
        let not_found = ApiError::Common(legalease_common::Error::NotFound("x".into()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::Common(legalease_common::Error::InvalidInput("x".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let upstream: ApiError = AiError::EmptyResponse.into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_analyst_timeout_is_gateway_timeout() {
        let err: ApiError = AiError::Timeout(std::time::Duration::from_secs(120)).into();
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("timed out"));
    }
}
