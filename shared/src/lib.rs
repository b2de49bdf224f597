//! Shared types for the table occupancy engine
//!
//! Types used by both table stores and their clients: error codes and the
//! API response envelope, table/session/bill models, and time helpers.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
