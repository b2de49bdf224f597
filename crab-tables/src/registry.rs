//! Table registry - the local view the UI renders
//!
//! Holds one [`Table`] per label plus the cached item ledger of its session.
//! Writers are the lifecycle operations (after the store confirmed) and the
//! reconciliation loop. The lock is synchronous and never held across an
//! `.await`; observers subscribe to a revision counter and re-read
//! [`TableRegistry::snapshot`] when it moves.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::watch;

use shared::models::{TableKind, TableRecord};

use crate::ledger::ItemLedger;

/// Occupancy state of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Available,
    Occupied,
}

/// Table view entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub label: String,
    pub kind: TableKind,
    pub occupied: bool,
    pub session_id: Option<String>,
    /// Unix millis
    pub start_time: Option<i64>,
    pub server_id: Option<String>,
    pub server_name: Option<String>,
    /// Display cache of the current ledger; only ledger writes touch it
    pub items_summary: String,
}

impl Table {
    pub fn from_record(record: &TableRecord) -> Self {
        let mut table = Self {
            label: record.label.clone(),
            kind: record.kind,
            occupied: false,
            session_id: None,
            start_time: None,
            server_id: None,
            server_name: None,
            items_summary: String::new(),
        };
        table.apply_record(record);
        table
    }

    /// Overwrite the store-owned fields; `items_summary` is left alone
    pub fn apply_record(&mut self, record: &TableRecord) {
        self.occupied = record.occupied;
        self.session_id = record.session_id.clone();
        self.start_time = record.start_time;
        self.server_id = record.server_id.clone();
        self.server_name = record.server_name.clone();
    }

    /// Clear occupancy and session identity
    pub fn clear_session(&mut self) {
        self.occupied = false;
        self.session_id = None;
        self.start_time = None;
        self.server_id = None;
        self.server_name = None;
    }

    pub fn status(&self) -> TableStatus {
        if self.occupied {
            TableStatus::Occupied
        } else {
            TableStatus::Available
        }
    }

    /// Occupied locally without the session identity that should back it
    pub fn is_orphaned(&self) -> bool {
        self.occupied && (self.session_id.is_none() || self.start_time.is_none())
    }
}

/// Outcome of merging one fetch into the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Existing tables whose store-owned fields changed
    pub updated: usize,
    /// Labels seen for the first time
    pub inserted: usize,
    /// Registry tables absent from the fetch (left untouched)
    pub missing: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.updated > 0 || self.inserted > 0
    }
}

#[derive(Default)]
struct RegistryInner {
    tables: Vec<Table>,
    ledgers: HashMap<String, ItemLedger>,
}

impl RegistryInner {
    fn find_mut(&mut self, label: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.label == label)
    }
}

/// In-memory collection of tables, in store order
pub struct TableRegistry {
    inner: RwLock<RegistryInner>,
    revision: watch::Sender<u64>,
}

impl TableRegistry {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: RwLock::new(RegistryInner::default()),
            revision,
        }
    }

    /// Copy of every table
    pub fn snapshot(&self) -> Vec<Table> {
        self.inner.read().tables.clone()
    }

    pub fn get(&self, label: &str) -> Option<Table> {
        self.inner.read().tables.iter().find(|t| t.label == label).cloned()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.inner.read().tables.iter().any(|t| t.label == label)
    }

    pub fn len(&self) -> usize {
        self.inner.read().tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().tables.is_empty()
    }

    /// Cached ledger of the table's current session
    pub fn ledger(&self, label: &str) -> Option<ItemLedger> {
        self.inner.read().ledgers.get(label).cloned()
    }

    /// Revision counter, bumped on every visible change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Merge authoritative records by label
    pub(crate) fn merge_records(&self, records: &[TableRecord]) -> MergeReport {
        let mut report = MergeReport::default();
        {
            let mut inner = self.inner.write();
            for record in records {
                match inner.find_mut(&record.label) {
                    Some(table) => {
                        let before = table.clone();
                        table.apply_record(record);
                        if *table != before {
                            report.updated += 1;
                        }
                    }
                    None => {
                        inner.tables.push(Table::from_record(record));
                        report.inserted += 1;
                    }
                }
            }
            report.missing = inner
                .tables
                .iter()
                .filter(|t| !records.iter().any(|r| r.label == t.label))
                .count();
        }
        if report.changed() {
            self.bump();
        }
        report
    }

    /// Mutate one table in place; returns false when the label is unknown
    pub(crate) fn update(&self, label: &str, f: impl FnOnce(&mut Table)) -> bool {
        let changed = {
            let mut inner = self.inner.write();
            match inner.find_mut(label) {
                Some(table) => {
                    let before = table.clone();
                    f(table);
                    *table != before
                }
                None => return false,
            }
        };
        if changed {
            self.bump();
        }
        true
    }

    pub(crate) fn set_ledger(&self, label: &str, ledger: ItemLedger) {
        self.inner.write().ledgers.insert(label.to_string(), ledger);
    }

    pub(crate) fn clear_ledger(&self, label: &str) {
        self.inner.write().ledgers.remove(label);
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}
