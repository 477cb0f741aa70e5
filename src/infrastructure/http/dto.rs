//! Data Transfer Objects
//!
//! 统一响应信封；各端点的请求 / 响应体定义在对应 handler 中

use serde::{Deserialize, Serialize};

/// 统一 API 响应格式
///
/// `errno == 0` 表示成功
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }

    /// 错误响应
    pub fn error(errno: i32, error: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize, Deserialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

/// 只携带文本的请求体
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::success(3)).unwrap();
        assert_eq!(json, serde_json::json!({"errno": 0, "error": "", "data": 3}));

        let json = serde_json::to_value(ApiResponse::<i32>::error(409, "busy")).unwrap();
        assert_eq!(json["errno"], 409);
        assert!(json["data"].is_null());

        let json = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(json["data"], serde_json::json!({}));
    }
}
