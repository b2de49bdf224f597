//! Data models
//!
//! Shared between table stores and the table engine (via API).
//! Timestamps are Unix milliseconds, money is `rust_decimal::Decimal`.

pub mod bill;
pub mod session;
pub mod table;

// Re-exports
pub use bill::*;
pub use session::*;
pub use table::*;
