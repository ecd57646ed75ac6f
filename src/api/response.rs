//! Response envelopes and error mapping
//!
//! Every non-success response is `{"ok": false, "error": {"message": ...}}`.

use crate::action::ActionError;
use crate::orchestrator::OrchestratorError;
use axum::{
    extract::{FromRequest, Request},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::error;

/// HTTP-surface errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request; no provider was called
    #[error("{0}")]
    Validation(String),

    /// A provider failed the primary operation
    #[error("{0}")]
    Upstream(String),

    /// The request outlived its deadline; in-flight provider calls were dropped
    #[error("Request timed out")]
    Timeout,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        }

        let body = Json(ErrorEnvelope {
            ok: false,
            error: ErrorBody {
                message: self.to_string(),
            },
        });
        (status, body).into_response()
    }
}

/// Give the timeout layer's bodiless 408 the failure envelope
pub async fn envelope_timeout(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return ApiError::Timeout.into_response();
    }
    response
}

/// Success envelope used by the service endpoints (`/health`)
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// JSON response that falls back to the internal-error envelope when the
/// value cannot be encoded
pub struct JsonReply<T>(pub T);

impl<T: Serialize> IntoResponse for JsonReply<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                bytes,
            )
                .into_response(),
            Err(e) => ApiError::Internal(format!("Failed to encode response: {}", e)).into_response(),
        }
    }
}

/// JSON body extractor whose rejections use the error envelope
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(format!("Invalid request body: {}", rejection.body_text())))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::Validation("missing title".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"ok": false, "error": {"message": "missing title"}})
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::Timeout.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err: ApiError = ActionError::MissingField { field: "title" }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "missing title");
    }

    #[tokio::test]
    async fn test_envelope_timeout_only_rewrites_408() {
        let timed_out = envelope_timeout(StatusCode::REQUEST_TIMEOUT.into_response()).await;
        assert_eq!(timed_out.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            body_json(timed_out).await,
            serde_json::json!({"ok": false, "error": {"message": "Request timed out"}})
        );

        let passed = envelope_timeout(JsonReply(serde_json::json!({"result": "ok"})).into_response()).await;
        assert_eq!(body_json(passed).await["result"], "ok");
    }

    #[tokio::test]
    async fn test_json_reply_sets_content_type() {
        let response = JsonReply(serde_json::json!({"result": "ok"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("application/json")
        );
        assert_eq!(body_json(response).await["result"], "ok");
    }

    #[tokio::test]
    async fn test_json_reply_encoding_failure_is_internal_error() {
        use std::collections::HashMap;
        // non-string map keys cannot be encoded as JSON
        let mut map = HashMap::new();
        map.insert((1, 2), "value");
        let response = JsonReply(map).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["ok"], false);
    }
}
