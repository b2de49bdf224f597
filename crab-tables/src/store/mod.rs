//! Table store - the authoritative side of occupancy
//!
//! The engine never assumes exclusive access to the store: any mutating call
//! may fail because another client got there first, and the store's answer
//! always wins over the local view.
//!
//! Implementations:
//! - [`HttpTableStore`]: JSON over HTTP against a remote store
//! - [`InMemoryTableStore`]: process-local store for tests and simulations

mod http;
mod memory;

pub use http::HttpTableStore;
pub use memory::InMemoryTableStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{ItemLine, SessionSnapshot, SessionStarted, TableRecord};

use crate::error::TableResult;

/// Authoritative table store
///
/// Error contract (tagged, never by message text):
/// - `start_session` on an occupied table -> `AlreadyOccupied`
/// - `stop_session` / `replace_items` / `fetch_items` without a session -> `NoActiveSession`
/// - unknown label -> `NotFound`
/// - transport or backend failure -> `Unavailable`
#[async_trait]
pub trait TableStore: Send + Sync + 'static {
    /// Every table with its current occupancy
    async fn fetch_all(&self) -> TableResult<Vec<TableRecord>>;

    /// Open a session and mark the table occupied
    async fn start_session(
        &self,
        label: &str,
        server_id: &str,
        server_name: &str,
    ) -> TableResult<SessionStarted>;

    /// Close the session, clear occupancy and hand back what was billed
    async fn stop_session(&self, label: &str) -> TableResult<SessionSnapshot>;

    /// Replace the session's item lines wholesale
    async fn replace_items(&self, label: &str, items: &[ItemLine]) -> TableResult<()>;

    /// Current item lines of the active session
    async fn fetch_items(&self, label: &str) -> TableResult<Vec<ItemLine>>;

    /// Clear the occupancy flag and drop any session row, unconditionally
    async fn force_free(&self, label: &str) -> TableResult<()>;

    /// Time rate applied at stop
    async fn rate_per_minute(&self) -> TableResult<Decimal>;
}
