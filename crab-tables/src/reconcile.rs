//! Reconciliation - periodic convergence with the store
//!
//! A tick fetches every table and merges the store's answer into the
//! registry. Ticks run on a fixed interval while live mode is on; turning
//! live mode back on ticks immediately. A failed tick is logged and
//! skipped, the next one retries.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::TableResult;
use crate::recovery::RecoveryManager;
use crate::registry::{MergeReport, TableRegistry};
use crate::store::TableStore;

/// One-shot convergence step
pub struct Reconciler {
    store: Arc<dyn TableStore>,
    registry: Arc<TableRegistry>,
    recovery: Arc<RecoveryManager>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn TableStore>,
        registry: Arc<TableRegistry>,
        recovery: Arc<RecoveryManager>,
    ) -> Self {
        Self {
            store,
            registry,
            recovery,
        }
    }

    /// Fetch all tables and merge them into the registry
    ///
    /// Unknown labels are added, tables missing from the answer are kept.
    /// Any table the store does not report orphaned withdraws its recovery
    /// offer, whether it is free or held by a live session.
    pub async fn tick(&self) -> TableResult<MergeReport> {
        let records = self.store.fetch_all().await?;
        let report = self.registry.merge_records(&records);

        for record in records.iter().filter(|r| !r.is_orphaned()) {
            self.recovery.withdraw(&record.label);
        }
        if report.missing > 0 {
            tracing::debug!(missing = report.missing, "Tables absent from store fetch");
        }
        Ok(report)
    }
}

/// Background loop driving [`Reconciler::tick`]
pub struct ReconciliationLoop {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    live: watch::Receiver<bool>,
    shutdown: CancellationToken,
}

impl ReconciliationLoop {
    /// Spawn the loop on the current runtime
    pub fn spawn(
        reconciler: Arc<Reconciler>,
        interval: Duration,
        live: bool,
    ) -> ReconciliationHandle {
        let (live_tx, live_rx) = watch::channel(live);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(
            Self {
                reconciler,
                interval,
                live: live_rx,
                shutdown: shutdown.clone(),
            }
            .run(),
        );
        ReconciliationHandle {
            live: live_tx,
            shutdown,
            task: Some(task),
        }
    }

    async fn run(mut self) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Reconciliation loop started");

        'outer: loop {
            if !*self.live.borrow_and_update() {
                tracing::debug!("Reconciliation paused");
                tokio::select! {
                    _ = self.shutdown.cancelled() => break 'outer,
                    changed = self.live.changed() => {
                        if changed.is_err() {
                            break 'outer;
                        }
                        continue 'outer;
                    }
                }
            }

            // First tick fires immediately
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break 'outer,
                    changed = self.live.changed() => {
                        if changed.is_err() {
                            break 'outer;
                        }
                        if !*self.live.borrow_and_update() {
                            continue 'outer;
                        }
                    }
                    _ = ticker.tick() => self.tick().await,
                }
            }
        }

        tracing::info!("Reconciliation loop stopped");
    }

    async fn tick(&self) {
        match self.reconciler.tick().await {
            Ok(report) if report.changed() => {
                tracing::debug!(
                    updated = report.updated,
                    inserted = report.inserted,
                    "Registry reconciled"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Reconciliation tick failed"),
        }
    }
}

/// Control handle for a spawned [`ReconciliationLoop`]
///
/// Dropping the handle stops the loop.
pub struct ReconciliationHandle {
    live: watch::Sender<bool>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReconciliationHandle {
    /// Enable or pause polling; enabling ticks immediately
    pub fn set_live_mode(&self, live: bool) {
        self.live.send_if_modified(|current| {
            if *current == live {
                false
            } else {
                *current = live;
                true
            }
        });
    }

    pub fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    /// Stop the loop and wait for it to finish
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Reconciliation task ended abnormally");
        }
    }
}

impl Drop for ReconciliationHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
