//! Session lifecycle: start and stop
//!
//! The store arbitrates every transition. The local view only changes after
//! the store accepted the call, so a lost race leaves it exactly as it was
//! and the next reconciliation tick shows the winner.

use std::sync::Arc;

use shared::models::Bill;

use crate::billing;
use crate::clock::Clock;
use crate::error::TableResult;
use crate::ledger::ItemLedger;
use crate::recovery::{DriftOrigin, RecoveryManager};
use crate::registry::{TableRegistry, TableStatus};
use crate::store::TableStore;

pub struct SessionLifecycle {
    store: Arc<dyn TableStore>,
    registry: Arc<TableRegistry>,
    recovery: Arc<RecoveryManager>,
    clock: Arc<dyn Clock>,
}

impl SessionLifecycle {
    pub fn new(
        store: Arc<dyn TableStore>,
        registry: Arc<TableRegistry>,
        recovery: Arc<RecoveryManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            recovery,
            clock,
        }
    }

    /// Local occupancy status, if the table is known
    pub fn status(&self, label: &str) -> Option<TableStatus> {
        self.registry.get(label).map(|t| t.status())
    }

    /// Open a session on `label` for the given server
    ///
    /// Returns the store-assigned session id. Fails with `AlreadyOccupied`
    /// when another client (or an orphaned flag) holds the table.
    pub async fn start_session(
        &self,
        label: &str,
        server_id: &str,
        server_name: &str,
    ) -> TableResult<String> {
        let started = match self.store.start_session(label, server_id, server_name).await {
            Ok(started) => started,
            Err(e) => {
                tracing::warn!(table = %label, server = %server_name, error = %e, "Start session failed");
                return Err(e);
            }
        };

        let applied = self.registry.update(label, |t| {
            t.occupied = true;
            t.session_id = Some(started.session_id.clone());
            t.start_time = Some(started.start_time);
            t.server_id = Some(server_id.to_string());
            t.server_name = Some(server_name.to_string());
            t.items_summary.clear();
        });
        if !applied {
            tracing::warn!(table = %label, "Session started on a table not yet in the registry");
        }
        self.registry.set_ledger(label, ItemLedger::empty());
        self.recovery.withdraw(label);

        tracing::info!(
            table = %label,
            server = %server_name,
            session_id = %started.session_id,
            "Session started"
        );
        Ok(started.session_id)
    }

    /// Close the session on `label` and compute its bill
    ///
    /// The rate is read before the session is closed, so a rate failure
    /// leaves the session open. `NoActiveSession` records a recovery offer
    /// and leaves the local view untouched.
    pub async fn stop_session(&self, label: &str) -> TableResult<Bill> {
        let rate = match self.store.rate_per_minute().await {
            Ok(rate) => rate,
            Err(e) => {
                tracing::warn!(table = %label, error = %e, "Rate lookup failed, session left open");
                return Err(e);
            }
        };

        let snapshot = match self.store.stop_session(label).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(table = %label, error = %e, "Stop session failed");
                if e.offers_recovery() {
                    self.recovery.record_drift(label, DriftOrigin::Stop);
                }
                return Err(e);
            }
        };

        let end_time = self.clock.now_millis();
        let bill = billing::compute_bill(label, snapshot, end_time, rate);

        self.registry.update(label, |t| {
            t.clear_session();
            t.items_summary.clear();
        });
        self.registry.clear_ledger(label);
        self.recovery.withdraw(label);

        tracing::info!(
            table = %label,
            bill_id = %bill.bill_id,
            minutes = bill.total_time_minutes,
            total = %bill.total_amount,
            "Session stopped"
        );
        crate::audit_log!(
            bill.server_name.as_deref().unwrap_or("unknown"),
            "stop_session",
            format!("table:{label}"),
            format!("bill:{} total:{}", bill.bill_id, bill.total_amount)
        );
        Ok(bill)
    }
}
