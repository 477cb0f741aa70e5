//! HTTP Middleware
//!
//! 请求结果日志。业务错误以 HTTP 200 + 信封返回，
//! 错误码通过响应扩展 [`ApiFailure`] 从 `ApiError` 传到这里统一记录。

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use super::error::errno;

/// 状态轮询路由，客户端按固定间隔调用
const STATUS_POLL_PATH: &str = "/api/story/status";

/// 业务失败，由 `ApiError::into_response()` 写入响应扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub errno: i32,
    pub message: String,
}

/// 请求结果的日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// 处理流水线或合成服务故障
    Failed,
    /// 用户主动取消
    Cancelled,
    /// 输入或状态不满足要求
    Rejected,
    /// 未匹配的路由、方法不允许、请求体过大等
    Unrouted,
    Completed,
    /// 成功的状态轮询
    Polled,
}

fn classify(status: http::StatusCode, failure: Option<&ApiFailure>, path: &str) -> Outcome {
    if status.is_server_error() {
        return Outcome::Failed;
    }
    if status.is_client_error() {
        return Outcome::Unrouted;
    }
    match failure.map(|f| f.errno) {
        Some(errno::INTERNAL_ERROR | errno::SERVICE_UNAVAILABLE) => Outcome::Failed,
        Some(errno::CANCELLED) => Outcome::Cancelled,
        Some(_) => Outcome::Rejected,
        None if path == STATUS_POLL_PATH => Outcome::Polled,
        None => Outcome::Completed,
    }
}

/// 请求结果日志中间件
///
/// 按信封中的 errno 选择级别；成功的状态轮询只在 trace 级别记录
pub async fn request_outcome_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let failure = response.extensions().get::<ApiFailure>();
    let errno = failure.map_or(0, |f| f.errno);
    let error = failure.map_or("", |f| f.message.as_str());

    match classify(response.status(), failure, &path) {
        Outcome::Failed => {
            tracing::error!(%method, %path, status, errno, error, elapsed_ms, "Request failed")
        }
        Outcome::Cancelled => {
            tracing::info!(%method, %path, errno, error, elapsed_ms, "Request cancelled")
        }
        Outcome::Rejected => {
            tracing::warn!(%method, %path, errno, error, elapsed_ms, "Request rejected")
        }
        Outcome::Unrouted => {
            tracing::warn!(%method, %path, status, elapsed_ms, "HTTP client error")
        }
        Outcome::Completed => tracing::debug!(%method, %path, elapsed_ms, "Request completed"),
        Outcome::Polled => tracing::trace!(%method, %path, elapsed_ms, "Status polled"),
    }

    response
}
