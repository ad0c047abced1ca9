use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::pipeline::PipelineError;
use crate::services::request::ValidationError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    error: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    BadRequest(String),
    PayloadTooLarge(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            too_large @ ValidationError::ImageTooLarge { .. } => {
                ApiError::PayloadTooLarge(too_large.to_string())
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(invalid) => invalid.into(),
            unavailable @ PipelineError::StorageUnavailable => {
                ApiError::ServiceUnavailable(unavailable.to_string())
            }
            failed => ApiError::Internal(failed.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Unauthorized(message) => message.to_string(),
            ApiError::BadRequest(message) | ApiError::PayloadTooLarge(message) => message,
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                message
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                message
            }
        };

        (status, Json(ErrorResponse { status: status.as_u16(), error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&body).expect("json"))
    }

    #[tokio::test]
    async fn unauthorized_renders_status_and_error() {
        let (status, body) = render(ApiError::Unauthorized("Invalid access code")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
        assert_eq!(body["error"], "Invalid access code");
    }

    #[tokio::test]
    async fn pipeline_errors_map_to_http_statuses() {
        let (status, _) = render(PipelineError::Validation(ValidationError::NoImages).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let too_large = ValidationError::ImageTooLarge { filename: "a.jpg".into(), limit_mb: 10 };
        let (status, _) = render(too_large.into()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (status, _) = render(PipelineError::StorageUnavailable.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) =
            render(PipelineError::Ocr(anyhow::anyhow!("Gemini API error (503)")).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "OCR failed: Gemini API error (503)");
    }
}
