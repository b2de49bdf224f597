//! Bill Model
//!
//! Produced once per stopped session and handed to payment unchanged.

use super::session::ItemLine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable result of stopping a session
///
/// `total_amount` is always `time_cost + items_cost`; both parts are already
/// rounded to the currency's minor unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: String,
    pub table_label: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Unix millis
    pub start_time: i64,
    /// Unix millis
    pub end_time: i64,
    pub total_time_minutes: i64,
    pub rate_per_minute: Decimal,
    pub items: Vec<ItemLine>,
    pub time_cost: Decimal,
    pub items_cost: Decimal,
    pub total_amount: Decimal,
}
