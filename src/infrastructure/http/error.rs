//! HTTP Error Handling
//!
//! 所有错误都以 HTTP 200 + `{errno, error, data: null}` 返回

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::ApiResponse;
use super::middleware::ApiFailure;
use crate::application::ApplicationError;

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const CONFLICT: i32 = 409;
    pub const UNPROCESSABLE: i32 = 422;
    pub const CANCELLED: i32 = 499;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// 忙碌 / 没有可取消的处理
    Conflict(String),
    /// 说话人或音色无法解析
    Unprocessable(String),
    Cancelled(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn errno(&self) -> i32 {
        match self {
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::NotFound(_) => errno::NOT_FOUND,
            ApiError::Conflict(_) => errno::CONFLICT,
            ApiError::Unprocessable(_) => errno::UNPROCESSABLE,
            ApiError::Cancelled(_) => errno::CANCELLED,
            ApiError::Internal(_) => errno::INTERNAL_ERROR,
            ApiError::ServiceUnavailable(_) => errno::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unprocessable(msg)
            | ApiError::Cancelled(msg)
            | ApiError::Internal(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let errno = self.errno();
        let body = ApiResponse::<()>::error(errno, self.message());
        let mut response = (StatusCode::OK, Json(body)).into_response();
        // 日志由 request_outcome_middleware 统一记录
        response.extensions_mut().insert(ApiFailure {
            errno,
            message: self.message().to_string(),
        });
        response
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::Busy(msg) | ApplicationError::InvalidState(msg) => {
                ApiError::Conflict(msg)
            }
            ApplicationError::ResolutionFailure(msg) => ApiError::Unprocessable(msg),
            ApplicationError::Cancelled => ApiError::Cancelled(e.to_string()),
            ApplicationError::ExternalServiceError(msg) => ApiError::ServiceUnavailable(msg),
            ApplicationError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_application_error_mapping() {
        let cases = [
            (ApplicationError::validation("empty"), errno::BAD_REQUEST),
            (ApplicationError::busy("running"), errno::CONFLICT),
            (ApplicationError::invalid_state("idle"), errno::CONFLICT),
            (ApplicationError::resolution("no voice"), errno::UNPROCESSABLE),
            (ApplicationError::Cancelled, errno::CANCELLED),
            (
                ApplicationError::ExternalServiceError("down".into()),
                errno::SERVICE_UNAVAILABLE,
            ),
            (ApplicationError::internal("boom"), errno::INTERNAL_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).errno(), expected);
        }
    }

    #[test]
    fn test_cancelled_message() {
        let err = ApiError::from(ApplicationError::Cancelled);
        assert_eq!(err.message(), "Processing cancelled");
    }

    #[tokio::test]
    async fn test_error_is_http_200_envelope() {
        let response = ApiError::Conflict("busy".into()).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errno"], 409);
        assert_eq!(json["error"], "busy");
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_error_carries_failure_extension() {
        let response = ApiError::ServiceUnavailable("tts down".into()).into_response();
        assert_eq!(
            response.extensions().get::<ApiFailure>(),
            Some(&ApiFailure {
                errno: errno::SERVICE_UNAVAILABLE,
                message: "tts down".to_string(),
            })
        );
    }
}
