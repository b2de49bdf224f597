//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is the error carried on the wire between a table store and its
/// clients:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details for debugging
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (table label, field errors, ...)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Table label attached through [`AppError::with_detail`], if any
    pub fn table_label(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get("table"))
            .and_then(Value::as_str)
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Table label unknown to the store
    pub fn table_not_found(label: &str) -> Self {
        Self::with_message(ErrorCode::TableNotFound, format!("Table {} not found", label))
            .with_detail("table", label)
    }

    /// Start lost against a concurrent session
    pub fn table_occupied(label: &str) -> Self {
        Self::with_message(ErrorCode::TableOccupied, format!("Table {} is occupied", label))
            .with_detail("table", label)
    }

    /// Stop/items on a table the store has no session for
    pub fn no_active_session(label: &str) -> Self {
        Self::with_message(
            ErrorCode::NoActiveSession,
            format!("Table {} has no active session", label),
        )
        .with_detail("table", label)
    }

    /// Store-side failure
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::StoreUnavailable, msg)
    }
}

/// Unified API response structure
///
/// Every table store response uses this envelope:
/// - `code`: Error code (0 for success)
/// - `message`: Human-readable message
/// - `data`: Response payload (on success)
/// - `details`: Additional error details (on failure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Error code (0 for success, non-zero for errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Human-readable message
    pub message: String,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Additional error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }

    /// Whether the envelope reports success (missing code counts as success)
    pub fn is_success(&self) -> bool {
        matches!(self.code, None | Some(0))
    }

    /// Rebuild the [`AppError`] carried by a failed envelope
    ///
    /// Unknown codes degrade to [`ErrorCode::Unknown`] so a newer store
    /// never breaks an older client.
    pub fn to_error(&self) -> AppError {
        let code = self
            .code
            .and_then(|c| ErrorCode::try_from(c).ok())
            .unwrap_or(ErrorCode::Unknown);
        AppError {
            code,
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

impl ApiResponse<()> {
    /// Create a success response without data
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: None,
            details: None,
        }
    }

    /// Create an error response from an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = if self.is_success() {
            StatusCode::OK
        } else {
            self.to_error().http_status()
        };

        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::NotFound);
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Resource not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::validation("bad line")
            .with_detail("field", "quantity")
            .with_detail("reason", "must be positive");

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "quantity");
        assert_eq!(details.get("reason").unwrap(), "must be positive");
    }

    #[test]
    fn test_table_constructors_carry_label() {
        let err = AppError::table_occupied("Bar 5");
        assert_eq!(err.code, ErrorCode::TableOccupied);
        assert_eq!(err.table_label(), Some("Bar 5"));
        assert_eq!(err.http_status(), StatusCode::CONFLICT);

        let err = AppError::no_active_session("Billiard 3");
        assert_eq!(err.code, ErrorCode::NoActiveSession);
        assert_eq!(err.message, "Table Billiard 3 has no active session");

        let err = AppError::table_not_found("Bar 99");
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::TableNotFound, "Table X not found");
        assert_eq!(format!("{}", err), "Table X not found");
    }

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success(42);
        assert_eq!(response.code, Some(0));
        assert_eq!(response.message, "OK");
        assert_eq!(response.data, Some(42));
        assert!(response.is_success());
    }

    #[test]
    fn test_api_response_error_round_trip() {
        let err = AppError::no_active_session("Bar 5");
        let response = ApiResponse::<()>::error(&err);
        assert_eq!(response.code, Some(7003));
        assert!(!response.is_success());

        let json = serde_json::to_string(&response).unwrap();
        let parsed: ApiResponse<()> = serde_json::from_str(&json).unwrap();
        let back = parsed.to_error();
        assert_eq!(back.code, ErrorCode::NoActiveSession);
        assert_eq!(back.table_label(), Some("Bar 5"));
    }

    #[test]
    fn test_api_response_unknown_code_degrades() {
        let json = r#"{"code":4242,"message":"future error"}"#;
        let response: ApiResponse<()> = serde_json::from_str(json).unwrap();
        assert_eq!(response.to_error().code, ErrorCode::Unknown);
        assert_eq!(response.to_error().message, "future error");
    }

    #[test]
    fn test_unauthorized_envelope_decodes_to_auth_code() {
        let json = r#"{"code":1001,"message":"User is not authenticated"}"#;
        let response: ApiResponse<()> = serde_json::from_str(json).unwrap();
        let err = response.to_error();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert_eq!(err.code.category(), crate::error::ErrorCategory::Auth);
        assert_eq!(err.http_status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_api_response_deserialize() {
        let json = r#"{"code":0,"message":"OK","data":42}"#;
        let response: ApiResponse<i32> = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, Some(0));
        assert_eq!(response.data, Some(42));
    }
}
