//! Table engine error types
//!
//! Every failure a caller can observe is one of a small set of stable kinds.
//! Store implementations translate their transport's errors into these
//! variants, and the engine only ever branches on the variant.

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Table engine error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Start lost a race: another session already holds the table
    #[error("Table is already occupied: {0}")]
    AlreadyOccupied(String),

    /// Store has no session for a table the caller believed occupied
    #[error("No active session for table: {0}")]
    NoActiveSession(String),

    /// Label unknown to the store
    #[error("Table not found: {0}")]
    NotFound(String),

    /// Transport or store failure
    #[error("Table store unavailable: {0}")]
    Unavailable(String),

    /// Item line rejected before reaching the store
    #[error("Invalid item line: {0}")]
    InvalidItem(String),

    /// Force-free confirmed after the table already recovered on its own
    #[error("Recovery offer no longer pending for table: {0}")]
    RecoveryWithdrawn(String),
}

impl TableError {
    /// Stable code for this error
    pub fn kind(&self) -> ErrorCode {
        match self {
            TableError::AlreadyOccupied(_) => ErrorCode::TableOccupied,
            TableError::NoActiveSession(_) => ErrorCode::NoActiveSession,
            TableError::NotFound(_) => ErrorCode::TableNotFound,
            TableError::Unavailable(_) => ErrorCode::StoreUnavailable,
            TableError::InvalidItem(_) => ErrorCode::InvalidItemLine,
            TableError::RecoveryWithdrawn(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Whether the UI should pair this error with a force-free prompt
    pub fn offers_recovery(&self) -> bool {
        matches!(self, TableError::NoActiveSession(_))
    }

    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        TableError::Unavailable(err.to_string())
    }
}

impl From<AppError> for TableError {
    fn from(err: AppError) -> Self {
        let subject = err
            .table_label()
            .map(str::to_string)
            .unwrap_or_else(|| err.message.clone());
        match err.code {
            ErrorCode::TableOccupied => TableError::AlreadyOccupied(subject),
            ErrorCode::NoActiveSession => TableError::NoActiveSession(subject),
            ErrorCode::TableNotFound | ErrorCode::NotFound => TableError::NotFound(subject),
            ErrorCode::InvalidItemLine | ErrorCode::ValidationFailed => {
                TableError::InvalidItem(err.message)
            }
            _ => TableError::Unavailable(format!("[{}] {}", err.code, err.message)),
        }
    }
}

impl From<TableError> for AppError {
    fn from(err: TableError) -> Self {
        match &err {
            TableError::AlreadyOccupied(label) => AppError::table_occupied(label),
            TableError::NoActiveSession(label) => AppError::no_active_session(label),
            TableError::NotFound(label) => AppError::table_not_found(label),
            TableError::Unavailable(msg) => AppError::store_unavailable(msg.clone()),
            TableError::InvalidItem(msg) => AppError::with_message(err.kind(), msg.clone()),
            TableError::RecoveryWithdrawn(label) => {
                AppError::with_message(err.kind(), err.to_string()).with_detail("table", label.as_str())
            }
        }
    }
}

impl From<reqwest::Error> for TableError {
    fn from(err: reqwest::Error) -> Self {
        TableError::unavailable(err)
    }
}

/// Result type for table engine operations
pub type TableResult<T> = Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(
            TableError::AlreadyOccupied("Bar 5".into()).kind(),
            ErrorCode::TableOccupied
        );
        assert_eq!(
            TableError::NoActiveSession("Bar 5".into()).kind(),
            ErrorCode::NoActiveSession
        );
        assert_eq!(
            TableError::Unavailable("timeout".into()).kind(),
            ErrorCode::StoreUnavailable
        );
    }

    #[test]
    fn test_only_no_active_session_offers_recovery() {
        assert!(TableError::NoActiveSession("Bar 5".into()).offers_recovery());
        assert!(!TableError::AlreadyOccupied("Bar 5".into()).offers_recovery());
        assert!(!TableError::NotFound("Bar 5".into()).offers_recovery());
        assert!(!TableError::Unavailable("down".into()).offers_recovery());
    }

    #[test]
    fn test_from_app_error_uses_code_not_message() {
        // Message wording is irrelevant, only the code decides
        let err = AppError::with_message(ErrorCode::NoActiveSession, "something else entirely")
            .with_detail("table", "Bar 5");
        assert_eq!(
            TableError::from(err),
            TableError::NoActiveSession("Bar 5".into())
        );

        let err = AppError::with_message(ErrorCode::InternalError, "no active session");
        assert!(matches!(TableError::from(err), TableError::Unavailable(_)));
    }

    #[test]
    fn test_app_error_round_trip() {
        for err in [
            TableError::AlreadyOccupied("Billiard 3".into()),
            TableError::NoActiveSession("Billiard 3".into()),
            TableError::NotFound("Billiard 3".into()),
        ] {
            let app: AppError = err.clone().into();
            assert_eq!(app.code, err.kind());
            assert_eq!(TableError::from(app), err);
        }
    }
}
