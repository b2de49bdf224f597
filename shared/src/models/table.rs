//! Table Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of physical table, fixed when the table is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableKind {
    Billiard,
    Bar,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Billiard => write!(f, "Billiard"),
            TableKind::Bar => write!(f, "Bar"),
        }
    }
}

/// Authoritative table row as reported by the table store
///
/// `occupied` is the store's flag. It is normally backed by a session
/// (`session_id` + `start_time`), but an orphaned flag without a session is
/// a valid observation and must round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    /// Unique, stable table label ("Billiard 3", "Bar 5")
    pub label: String,
    pub kind: TableKind,
    pub occupied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Session start (Unix millis)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

impl TableRecord {
    /// A free table with no session fields
    pub fn available(label: impl Into<String>, kind: TableKind) -> Self {
        Self {
            label: label.into(),
            kind,
            occupied: false,
            session_id: None,
            start_time: None,
            server_id: None,
            server_name: None,
        }
    }

    /// Occupied flag set without the session that should back it
    pub fn is_orphaned(&self) -> bool {
        self.occupied && (self.session_id.is_none() || self.start_time.is_none())
    }
}
