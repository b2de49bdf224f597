//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 1xxx: Authentication errors
/// - 7xxx: Table errors
/// - 9xxx (and anything unassigned): System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Table errors (7xxx)
    Table,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            7000..8000 => Self::Table,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Table => "table",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(7003), ErrorCategory::Table);
        assert_eq!(ErrorCategory::from_code(9006), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::NotAuthenticated.category(), ErrorCategory::Auth);
        assert_eq!(ErrorCode::TableOccupied.category(), ErrorCategory::Table);
        assert_eq!(ErrorCode::NoActiveSession.category(), ErrorCategory::Table);
        assert_eq!(
            ErrorCode::StoreUnavailable.category(),
            ErrorCategory::System
        );
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Table).unwrap();
        assert_eq!(json, "\"table\"");

        let category: ErrorCategory = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(category, ErrorCategory::System);
    }
}
