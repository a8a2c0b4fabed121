//! 远程接口错误类型。

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("api returned '{status}'{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Envelope {
        status: String,
        message: Option<String>,
    },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("not signed in")]
    Unauthenticated,
    #[error("missing {0}")]
    MissingInput(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 面向用户的提示：有服务端/传输层消息时用它，否则用调用方给的通用文案。
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(m), ..
            }
            | ApiError::Envelope {
                message: Some(m), ..
            } => m.clone(),
            ApiError::Transport(e) => e.to_string(),
            ApiError::Unauthenticated => "Vui lòng đăng nhập để sử dụng tính năng này".to_string(),
            _ => generic.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// 从错误响应体里尽量取出 `message` 字段。
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .and_then(|m| m.as_str())
                    .map(|m| m.trim().to_string())
            })
            .filter(|m| !m.is_empty());
        ApiError::Status { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_picks_server_message() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"Đã tồn tại"}"#);
        assert_eq!(err.user_message("Có lỗi xảy ra"), "Đã tồn tại");
        assert_eq!(err.to_string(), "http 400 Bad Request: Đã tồn tại");
    }

    #[test]
    fn non_json_body_falls_back_to_generic() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(err.user_message("Có lỗi xảy ra"), "Có lỗi xảy ra");
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_detection() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_input_uses_generic_message() {
        let err = ApiError::MissingInput("chapter locator");
        assert_eq!(err.user_message("Không thể tải chapter"), "Không thể tải chapter");
    }
}
