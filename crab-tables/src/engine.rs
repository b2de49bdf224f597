//! Table engine facade
//!
//! Wires the registry, lifecycle, ledger, recovery and reconciliation pieces
//! around one store and owns the background loop.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use crab_tables::{InMemoryTableStore, TableEngine};
//! # use rust_decimal::Decimal;
//! # async fn demo() -> crab_tables::TableResult<()> {
//! let store = Arc::new(InMemoryTableStore::new(Decimal::new(50, 2)));
//! let engine = TableEngine::builder(store).start();
//! engine.refresh().await?;
//! engine.start_session("Billiard 3", "srv1", "Alice").await?;
//! let bill = engine.stop_session("Billiard 3").await?;
//! println!("{}", bill.total_amount);
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use shared::models::{Bill, ItemLine};

use crate::clock::{Clock, SystemClock};
use crate::config::{DEFAULT_RECONCILE_INTERVAL, EngineConfig};
use crate::error::TableResult;
use crate::ledger::{ItemLedger, ItemLedgerManager};
use crate::lifecycle::SessionLifecycle;
use crate::reconcile::{ReconciliationHandle, ReconciliationLoop, Reconciler};
use crate::recovery::{ConfirmedForceFree, RecoveryManager, RecoveryOffer};
use crate::registry::{MergeReport, Table, TableRegistry, TableStatus};
use crate::store::TableStore;

/// Builder for [`TableEngine`]
pub struct TableEngineBuilder {
    store: Arc<dyn TableStore>,
    clock: Arc<dyn Clock>,
    reconcile_interval: Duration,
    live_mode: bool,
}

impl TableEngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    pub fn live_mode(mut self, live: bool) -> Self {
        self.live_mode = live;
        self
    }

    /// Build the engine and spawn its reconciliation loop
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(self) -> TableEngine {
        let registry = Arc::new(TableRegistry::new());
        let recovery = Arc::new(RecoveryManager::new(
            self.store.clone(),
            registry.clone(),
            self.clock.clone(),
        ));
        let lifecycle = SessionLifecycle::new(
            self.store.clone(),
            registry.clone(),
            recovery.clone(),
            self.clock,
        );
        let ledger = ItemLedgerManager::new(self.store.clone(), registry.clone(), recovery.clone());
        let reconciler = Arc::new(Reconciler::new(self.store, registry.clone(), recovery.clone()));
        let reconciliation =
            ReconciliationLoop::spawn(reconciler.clone(), self.reconcile_interval, self.live_mode);

        TableEngine {
            registry,
            lifecycle,
            ledger,
            recovery,
            reconciler,
            reconciliation,
        }
    }
}

/// Client-side table occupancy and billing engine
pub struct TableEngine {
    registry: Arc<TableRegistry>,
    lifecycle: SessionLifecycle,
    ledger: ItemLedgerManager,
    recovery: Arc<RecoveryManager>,
    reconciler: Arc<Reconciler>,
    reconciliation: ReconciliationHandle,
}

impl TableEngine {
    pub fn builder(store: Arc<dyn TableStore>) -> TableEngineBuilder {
        TableEngineBuilder {
            store,
            clock: Arc::new(SystemClock),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            live_mode: true,
        }
    }

    /// Build and start with interval and live mode from `config`
    pub fn from_config(store: Arc<dyn TableStore>, config: &EngineConfig) -> Self {
        Self::builder(store)
            .reconcile_interval(config.reconcile_interval)
            .live_mode(config.live_mode)
            .start()
    }

    // ========== Registry ==========

    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }

    /// Current local view of every table
    pub fn tables(&self) -> Vec<Table> {
        self.registry.snapshot()
    }

    pub fn table(&self, label: &str) -> Option<Table> {
        self.registry.get(label)
    }

    pub fn status(&self, label: &str) -> Option<TableStatus> {
        self.lifecycle.status(label)
    }

    /// Revision counter that moves whenever the view changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.registry.subscribe()
    }

    // ========== Sessions ==========

    pub async fn start_session(
        &self,
        label: &str,
        server_id: &str,
        server_name: &str,
    ) -> TableResult<String> {
        self.lifecycle
            .start_session(label, server_id, server_name)
            .await
    }

    pub async fn stop_session(&self, label: &str) -> TableResult<Bill> {
        self.lifecycle.stop_session(label).await
    }

    // ========== Items ==========

    pub async fn replace_items(&self, label: &str, lines: Vec<ItemLine>) -> TableResult<()> {
        self.ledger.replace_items(label, lines).await
    }

    pub async fn current_items(&self, label: &str) -> TableResult<Vec<ItemLine>> {
        self.ledger.current_items(label).await
    }

    pub fn cached_items(&self, label: &str) -> Option<ItemLedger> {
        self.ledger.cached_items(label)
    }

    // ========== Recovery ==========

    pub fn pending_recovery(&self, label: &str) -> Option<RecoveryOffer> {
        self.recovery.pending_offer(label)
    }

    pub fn pending_recoveries(&self) -> Vec<RecoveryOffer> {
        self.recovery.pending_offers()
    }

    pub fn suspected_orphans(&self) -> Vec<String> {
        self.recovery.suspected_orphans()
    }

    pub async fn force_free(&self, confirmed: ConfirmedForceFree) -> TableResult<()> {
        self.recovery.force_free(confirmed).await
    }

    // ========== Reconciliation ==========

    /// Run one reconciliation tick now, surfacing its error
    pub async fn refresh(&self) -> TableResult<MergeReport> {
        self.reconciler.tick().await
    }

    pub fn set_live_mode(&self, live: bool) {
        self.reconciliation.set_live_mode(live);
    }

    pub fn is_live(&self) -> bool {
        self.reconciliation.is_live()
    }

    /// Stop the reconciliation loop
    pub async fn shutdown(self) {
        self.reconciliation.shutdown().await;
    }
}
