//! In-process table store
//!
//! Behaves like the remote store (same error contract, store-stamped start
//! times, session ids) so several engines can share one instance and race
//! each other the way real clients do.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use shared::models::{ItemLine, SessionSnapshot, SessionStarted, TableKind, TableRecord};

use super::TableStore;
use crate::clock::{Clock, SystemClock};
use crate::error::{TableError, TableResult};

#[derive(Debug, Clone)]
struct StoredSession {
    session_id: String,
    server_id: String,
    server_name: String,
    start_time: i64,
    items: Vec<ItemLine>,
}

#[derive(Debug, Clone)]
struct StoredTable {
    label: String,
    kind: TableKind,
    occupied: bool,
    session: Option<StoredSession>,
}

impl StoredTable {
    fn to_record(&self) -> TableRecord {
        TableRecord {
            label: self.label.clone(),
            kind: self.kind,
            occupied: self.occupied,
            session_id: self.session.as_ref().map(|s| s.session_id.clone()),
            start_time: self.session.as_ref().map(|s| s.start_time),
            server_id: self.session.as_ref().map(|s| s.server_id.clone()),
            server_name: self.session.as_ref().map(|s| s.server_name.clone()),
        }
    }
}

/// Shared in-memory store; clones share the same tables
#[derive(Clone)]
pub struct InMemoryTableStore {
    tables: Arc<Mutex<Vec<StoredTable>>>,
    rate_per_minute: Arc<Mutex<Decimal>>,
    available: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTableStore {
    pub fn new(rate_per_minute: Decimal) -> Self {
        Self::with_clock(rate_per_minute, Arc::new(SystemClock))
    }

    pub fn with_clock(rate_per_minute: Decimal, clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Vec::new())),
            rate_per_minute: Arc::new(Mutex::new(rate_per_minute)),
            available: Arc::new(AtomicBool::new(true)),
            clock,
        }
    }

    /// Register a free table (builder style)
    pub fn with_table(self, label: impl Into<String>, kind: TableKind) -> Self {
        self.add_table(label, kind);
        self
    }

    /// Register a free table; an existing label is left as is
    pub fn add_table(&self, label: impl Into<String>, kind: TableKind) {
        let label = label.into();
        let mut tables = self.tables.lock();
        if tables.iter().any(|t| t.label == label) {
            return;
        }
        tables.push(StoredTable {
            label,
            kind,
            occupied: false,
            session: None,
        });
    }

    pub fn set_rate_per_minute(&self, rate: Decimal) {
        *self.rate_per_minute.lock() = rate;
    }

    /// Simulate an outage: every call fails with `Unavailable` while false
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Leave the occupied flag set while losing the session row,
    /// the state a crashed client leaves behind
    pub fn orphan(&self, label: &str) -> TableResult<()> {
        self.with_table_mut(label, |table| {
            table.occupied = true;
            table.session = None;
            Ok(())
        })
    }

    /// Authoritative record for one table (test inspection)
    pub fn record(&self, label: &str) -> Option<TableRecord> {
        self.tables
            .lock()
            .iter()
            .find(|t| t.label == label)
            .map(StoredTable::to_record)
    }

    fn ensure_available(&self) -> TableResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TableError::Unavailable("in-memory store offline".into()))
        }
    }

    fn with_table_mut<T>(
        &self,
        label: &str,
        f: impl FnOnce(&mut StoredTable) -> TableResult<T>,
    ) -> TableResult<T> {
        let mut tables = self.tables.lock();
        let table = tables
            .iter_mut()
            .find(|t| t.label == label)
            .ok_or_else(|| TableError::NotFound(label.to_string()))?;
        f(table)
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn fetch_all(&self) -> TableResult<Vec<TableRecord>> {
        self.ensure_available()?;
        Ok(self.tables.lock().iter().map(StoredTable::to_record).collect())
    }

    async fn start_session(
        &self,
        label: &str,
        server_id: &str,
        server_name: &str,
    ) -> TableResult<SessionStarted> {
        self.ensure_available()?;
        let start_time = self.clock.now_millis();
        self.with_table_mut(label, |table| {
            if table.occupied {
                return Err(TableError::AlreadyOccupied(label.to_string()));
            }
            let session = StoredSession {
                session_id: Uuid::new_v4().to_string(),
                server_id: server_id.to_string(),
                server_name: server_name.to_string(),
                start_time,
                items: Vec::new(),
            };
            let started = SessionStarted {
                session_id: session.session_id.clone(),
                start_time,
            };
            table.occupied = true;
            table.session = Some(session);
            Ok(started)
        })
    }

    async fn stop_session(&self, label: &str) -> TableResult<SessionSnapshot> {
        self.ensure_available()?;
        self.with_table_mut(label, |table| {
            let session = table
                .session
                .take()
                .ok_or_else(|| TableError::NoActiveSession(label.to_string()))?;
            table.occupied = false;
            Ok(SessionSnapshot {
                session_id: session.session_id,
                start_time: session.start_time,
                server_id: Some(session.server_id),
                server_name: Some(session.server_name),
                items: session.items,
            })
        })
    }

    async fn replace_items(&self, label: &str, items: &[ItemLine]) -> TableResult<()> {
        self.ensure_available()?;
        self.with_table_mut(label, |table| {
            let session = table
                .session
                .as_mut()
                .ok_or_else(|| TableError::NoActiveSession(label.to_string()))?;
            session.items = items.to_vec();
            Ok(())
        })
    }

    async fn fetch_items(&self, label: &str) -> TableResult<Vec<ItemLine>> {
        self.ensure_available()?;
        self.with_table_mut(label, |table| {
            table
                .session
                .as_ref()
                .map(|s| s.items.clone())
                .ok_or_else(|| TableError::NoActiveSession(label.to_string()))
        })
    }

    async fn force_free(&self, label: &str) -> TableResult<()> {
        self.ensure_available()?;
        self.with_table_mut(label, |table| {
            table.occupied = false;
            table.session = None;
            Ok(())
        })
    }

    async fn rate_per_minute(&self) -> TableResult<Decimal> {
        self.ensure_available()?;
        Ok(*self.rate_per_minute.lock())
    }
}
