use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// JSON envelope returned by every API route.
#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error: None,
        }
    }

    /// Error response carrying the underlying cause alongside the user-facing message
    pub fn error_with_detail(message: &str, detail: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_data_without_message() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json["message"].is_null());
    }

    #[test]
    fn error_carries_message_and_detail() {
        let response: ApiResponse<()> =
            ApiResponse::error_with_detail("Project not found", "row not found");
        assert!(!response.is_success());
        assert_eq!(response.message(), Some("Project not found"));
        assert_eq!(response.error_detail(), Some("row not found"));
        assert!(response.data().is_none());
    }
}
