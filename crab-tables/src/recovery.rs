//! Drift recovery
//!
//! When the store reports `NoActiveSession` for a table this client believed
//! occupied, the table may be orphaned (a crashed client left the flag set).
//! The engine records a [`RecoveryOffer`]; only a human confirming that offer
//! yields the [`ConfirmedForceFree`] token that [`RecoveryManager::force_free`]
//! requires. Offers disappear once the table recovers by other means: a
//! reconciliation tick showing it anything but orphaned, or a successful
//! start or stop. Force-free re-reads the store first and refuses to clear a
//! table that holds a live session.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{TableError, TableResult};
use crate::registry::{Table, TableRegistry};
use crate::store::TableStore;

/// Operation that ran into the drift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftOrigin {
    Stop,
    ReplaceItems,
    FetchItems,
}

/// Pending offer to force-free one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOffer {
    label: String,
    origin: DriftOrigin,
    /// Unix millis
    detected_at: i64,
}

impl RecoveryOffer {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn origin(&self) -> DriftOrigin {
        self.origin
    }

    pub fn detected_at(&self) -> i64 {
        self.detected_at
    }

    /// Explicit human confirmation
    pub fn confirm(self) -> ConfirmedForceFree {
        ConfirmedForceFree { label: self.label }
    }
}

/// Proof that a human approved force-freeing `label`
///
/// Only obtainable through [`RecoveryOffer::confirm`].
#[derive(Debug)]
pub struct ConfirmedForceFree {
    label: String,
}

impl ConfirmedForceFree {
    pub fn label(&self) -> &str {
        &self.label
    }
}

pub struct RecoveryManager {
    store: Arc<dyn TableStore>,
    registry: Arc<TableRegistry>,
    clock: Arc<dyn Clock>,
    offers: Mutex<HashMap<String, RecoveryOffer>>,
}

impl RecoveryManager {
    pub fn new(
        store: Arc<dyn TableStore>,
        registry: Arc<TableRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            offers: Mutex::new(HashMap::new()),
        }
    }

    /// Record drift on `label`; the first detection time is kept
    pub(crate) fn record_drift(&self, label: &str, origin: DriftOrigin) {
        let detected_at = self.clock.now_millis();
        let mut offers = self.offers.lock();
        if offers.contains_key(label) {
            return;
        }
        tracing::warn!(table = %label, ?origin, "Table drifted from the store, force-free offered");
        offers.insert(
            label.to_string(),
            RecoveryOffer {
                label: label.to_string(),
                origin,
                detected_at,
            },
        );
    }

    /// Drop the offer for `label`, if any
    pub(crate) fn withdraw(&self, label: &str) -> bool {
        let removed = self.offers.lock().remove(label).is_some();
        if removed {
            tracing::info!(table = %label, "Recovery offer withdrawn");
        }
        removed
    }

    pub fn pending_offer(&self, label: &str) -> Option<RecoveryOffer> {
        self.offers.lock().get(label).cloned()
    }

    /// All pending offers, oldest first
    pub fn pending_offers(&self) -> Vec<RecoveryOffer> {
        let mut offers: Vec<RecoveryOffer> = self.offers.lock().values().cloned().collect();
        offers.sort_by(|a, b| {
            a.detected_at
                .cmp(&b.detected_at)
                .then_with(|| a.label.cmp(&b.label))
        });
        offers
    }

    /// Labels that look orphaned in the local view
    ///
    /// Informational only; it never creates an offer.
    pub fn suspected_orphans(&self) -> Vec<String> {
        self.registry
            .snapshot()
            .into_iter()
            .filter(Table::is_orphaned)
            .map(|t| t.label)
            .collect()
    }

    /// Release a drifted table
    ///
    /// The store is read again first: a table that now holds a live session
    /// is refused with `RecoveryWithdrawn` and its offer dropped. Otherwise
    /// any in-flight ledger data of the abandoned session is lost. The
    /// displayed items summary is left as is.
    pub async fn force_free(&self, confirmed: ConfirmedForceFree) -> TableResult<()> {
        let label = confirmed.label;
        if self.pending_offer(&label).is_none() {
            return Err(TableError::RecoveryWithdrawn(label));
        }

        let records = self.store.fetch_all().await?;
        let record = records
            .iter()
            .find(|r| r.label == label)
            .ok_or_else(|| TableError::NotFound(label.clone()))?;
        if record.occupied && !record.is_orphaned() {
            self.registry.update(&label, |t| t.apply_record(record));
            self.offers.lock().remove(&label);
            tracing::warn!(
                table = %label,
                server = %record.server_name.as_deref().unwrap_or("-"),
                "Table holds a live session, force-free refused"
            );
            return Err(TableError::RecoveryWithdrawn(label));
        }

        if let Err(e) = self.store.force_free(&label).await {
            tracing::error!(table = %label, error = %e, "Force-free failed");
            return Err(e);
        }

        self.registry.update(&label, Table::clear_session);
        self.registry.clear_ledger(&label);
        self.offers.lock().remove(&label);

        crate::audit_log!(
            "local",
            "force_free",
            format!("table:{label}"),
            "orphaned occupancy cleared"
        );
        Ok(())
    }
}
