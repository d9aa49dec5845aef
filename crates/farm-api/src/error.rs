//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use farm_models::InvalidActuatorStatus;
use farm_vision::VisionError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rejected input; the message is returned to the client as-is.
    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Vision(#[from] VisionError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Vision(e) => match e {
                VisionError::AcquisitionExhausted { .. } | VisionError::Capture { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                VisionError::SourceBusy(_) => StatusCode::CONFLICT,
                VisionError::Inference { .. }
                | VisionError::ModelNotFound(_)
                | VisionError::InvalidConfig(_)
                | VisionError::Io(_)
                | VisionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable error code for clients.
    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Validation(_) => Some("validation_error"),
            ApiError::RateLimited => Some("rate_limited"),
            ApiError::Vision(e) => Some(e.kind()),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        match self {
            ApiError::Internal(_) => true,
            ApiError::Vision(e) => matches!(
                e,
                VisionError::ModelNotFound(_)
                    | VisionError::InvalidConfig(_)
                    | VisionError::Io(_)
                    | VisionError::Internal(_)
            ),
            _ => false,
        }
    }
}

impl From<InvalidActuatorStatus> for ApiError {
    fn from(e: InvalidActuatorStatus) -> Self {
        ApiError::Validation(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

/// Response extension set on errors whose detail must not leave the
/// process in production. See [`crate::middleware::redact_internal_errors`].
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorDetail {
    pub code: Option<&'static str>,
}

impl InternalErrorDetail {
    /// Same status and code, generic detail.
    pub fn redacted_response(&self, status: StatusCode) -> Response {
        let body = ErrorResponse {
            detail: "An internal error occurred".to_string(),
            code: self.code.map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let body = ErrorResponse {
            detail: self.to_string(),
            code: code.map(str::to_string),
        };

        let mut response = (status, Json(body)).into_response();
        if self.is_internal() {
            response
                .extensions_mut()
                .insert(InternalErrorDetail { code });
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_errors_map_to_distinct_statuses() {
        let exhausted = ApiError::from(VisionError::AcquisitionExhausted {
            source_id: "0".to_string(),
            attempts: 5,
        });
        let inference = ApiError::from(VisionError::inference("coco", "bad tensor"));
        let busy = ApiError::from(VisionError::SourceBusy("0".to_string()));

        assert_eq!(exhausted.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(exhausted.code(), Some("acquisition_exhausted"));
        assert_eq!(inference.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(inference.code(), Some("inference_failure"));
        assert_eq!(busy.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_status_is_validation_error() {
        let err = ApiError::from(InvalidActuatorStatus("unknown".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid status received: unknown");
        assert_eq!(err.code(), Some("validation_error"));
    }

    #[test]
    fn test_internal_errors_are_marked_for_redaction() {
        let response = ApiError::from(VisionError::invalid_config("bad camera")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let marker = response.extensions().get::<InternalErrorDetail>().unwrap();
        assert_eq!(marker.code, Some("invalid_config"));

        let response = ApiError::from(VisionError::inference("coco", "bad tensor")).into_response();
        assert!(response.extensions().get::<InternalErrorDetail>().is_none());
    }

    #[test]
    fn test_rate_limited_response() {
        let err = ApiError::RateLimited;
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.code(), Some("rate_limited"));
    }
}
