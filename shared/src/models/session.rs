//! Session and item ledger models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One ordered item on an active session, keyed by `item_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLine {
    pub item_id: i64,
    pub name: String,
    /// Always >= 1
    pub quantity: i32,
    /// Always >= 0
    pub unit_price: Decimal,
}

impl ItemLine {
    pub fn new(item_id: i64, name: impl Into<String>, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            item_id,
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// quantity * unit_price, unrounded
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Start session request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub server_id: String,
    pub server_name: String,
}

/// Returned by the store when a session has been opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
    pub session_id: String,
    /// Unix millis, stamped by the store
    pub start_time: i64,
}

/// Replace items request body (full replacement, never a patch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceItemsRequest {
    pub items: Vec<ItemLine>,
}

/// Closed session as returned by the store's stop call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    /// Unix millis
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemLine>,
}
