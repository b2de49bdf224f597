//! Unified error codes for table occupancy and billing
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 7xxx: Table / session errors
//! - 9xxx: System errors
//!
//! The numeric value is the stable identity of an error on the wire.
//! Clients must branch on the code, never on the message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Store rejected the bearer token (or none was sent)
    NotAuthenticated = 1001,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table is occupied by another session
    TableOccupied = 7002,
    /// Table has no active session
    NoActiveSession = 7003,
    /// Item line rejected (quantity, price, duplicate id)
    InvalidItemLine = 7010,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Table store is unreachable or failing
    StoreUnavailable = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableOccupied => "Table is occupied",
            ErrorCode::NoActiveSession => "Table has no active session",
            ErrorCode::InvalidItemLine => "Invalid item line",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StoreUnavailable => "Table store is unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableOccupied),
            7003 => Ok(ErrorCode::NoActiveSession),
            7010 => Ok(ErrorCode::InvalidItemLine),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9006 => Ok(ErrorCode::StoreUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);

        // Table
        assert_eq!(ErrorCode::TableNotFound.code(), 7001);
        assert_eq!(ErrorCode::TableOccupied.code(), 7002);
        assert_eq!(ErrorCode::NoActiveSession.code(), 7003);
        assert_eq!(ErrorCode::InvalidItemLine.code(), 7010);

        // System
        assert_eq!(ErrorCode::InternalError.code(), 9001);
        assert_eq!(ErrorCode::StoreUnavailable.code(), 9006);
    }

    #[test]
    fn test_try_from_known_codes() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::NotAuthenticated,
            ErrorCode::TableOccupied,
            ErrorCode::NoActiveSession,
            ErrorCode::StoreUnavailable,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_unknown_code() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
        // Retired codes are no longer recognised
        assert!(ErrorCode::try_from(2001).is_err());
        assert!(ErrorCode::try_from(9002).is_err());
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::NoActiveSession).unwrap();
        assert_eq!(json, "7003");

        let code: ErrorCode = serde_json::from_str("7002").unwrap();
        assert_eq!(code, ErrorCode::TableOccupied);

        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::TableOccupied.is_success());
    }
}
