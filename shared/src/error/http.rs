//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound | Self::TableNotFound => StatusCode::NOT_FOUND,

            // Both are precondition failures caused by another client
            Self::TableOccupied | Self::NoActiveSession => StatusCode::CONFLICT,

            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,

            Self::ValidationFailed | Self::InvalidRequest | Self::InvalidItemLine => {
                StatusCode::BAD_REQUEST
            }

            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::Unknown | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
