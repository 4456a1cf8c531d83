//! JSON envelope shared by every admin endpoint.
//!
//! Success: `{"success": true, "data": ..}`
//! Failure: `{"success": false, "error": "<message>"}`

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::domains::scraper_jobs::ScraperJobError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(message.into()),
        })
    }
}

/// `{"message": ..}` payload for actions with nothing else to return
#[derive(Debug, Serialize)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ScraperJobError>;

impl ScraperJobError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScraperJobError::Validation(_)
            | ScraperJobError::Duplicate(_)
            | ScraperJobError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ScraperJobError::NotFound(_) => StatusCode::NOT_FOUND,
            ScraperJobError::Ingestion(_) | ScraperJobError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ScraperJobError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ScraperJobError::Internal(e) => {
                // Full chain goes to the log, not the client
                error!(error = ?e, "Internal error handling scraper request");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, ApiResponse::error(message)).into_response()
    }
}

/// Malformed bodies are reported in the envelope instead of axum's plain-text rejection
impl From<JsonRejection> for ScraperJobError {
    fn from(rejection: JsonRejection) -> Self {
        ScraperJobError::Validation(rejection.body_text())
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
    async fn test_error_envelope_and_status() {
        let response = ScraperJobError::not_found("Job not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"success": false, "error": "Job not found"})
        );

        let response =
            ScraperJobError::Duplicate("Vehicle with this URL already exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let err: ScraperJobError = anyhow::anyhow!("password authentication failed").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            serde_json::json!("Internal server error")
        );
    }

    #[test]
    fn test_success_envelope_omits_error() {
        let Json(body) = ApiResponse::ok(MessageData::new("Job cancelled"));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"success": true, "data": {"message": "Job cancelled"}})
        );
    }
}
