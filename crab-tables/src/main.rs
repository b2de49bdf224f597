//! Crab Tables watcher
//!
//! Connects to a table store, keeps the local view reconciled and logs every
//! occupancy change until interrupted.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use crab_tables::logger::init_logger;
use crab_tables::{EngineConfig, HttpTableStore, Table, TableEngine};

#[derive(Debug, Parser)]
#[command(name = "crab-tables", version, about = "Table occupancy watcher")]
struct Cli {
    /// Table store base URL
    #[arg(long, env = "TABLE_STORE_URL")]
    store_url: Option<String>,

    /// Reconciliation interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Start with polling paused
    #[arg(long)]
    paused: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// JSON log output
    #[arg(long)]
    json: bool,

    /// Directory for rolling log files
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    fn apply(self, mut config: EngineConfig) -> EngineConfig {
        if let Some(url) = self.store_url {
            config.store_url = url;
        }
        if let Some(ms) = self.interval_ms.filter(|ms| *ms > 0) {
            config.reconcile_interval = Duration::from_millis(ms);
        }
        if self.paused {
            config.live_mode = false;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.json {
            config.log_json = true;
        }
        if self.log_dir.is_some() {
            config.log_dir = self.log_dir;
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Cli::parse().apply(EngineConfig::from_env()?);
    init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        store = %config.store_url,
        interval_ms = config.reconcile_interval.as_millis() as u64,
        live = config.live_mode,
        "Crab Tables starting"
    );

    let store = HttpTableStore::from_config(&config)?;
    let engine = TableEngine::from_config(Arc::new(store), &config);
    if let Err(e) = engine.refresh().await {
        tracing::warn!(error = %e, "Initial fetch failed, waiting for the next tick");
    }

    let mut changes = engine.subscribe();
    let mut last = engine.tables();
    log_tables(&last);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = engine.tables();
                log_changes(&last, &current);
                for label in engine.suspected_orphans() {
                    tracing::warn!(table = %label, "Table looks orphaned");
                }
                last = current;
            }
        }
    }

    tracing::info!("Shutting down");
    engine.shutdown().await;
    Ok(())
}

fn log_tables(tables: &[Table]) {
    for table in tables {
        log_table(table);
    }
}

fn log_changes(before: &[Table], after: &[Table]) {
    for table in after {
        if before.iter().find(|t| t.label == table.label) != Some(table) {
            log_table(table);
        }
    }
}

fn log_table(table: &Table) {
    let since = table
        .start_time
        .map(shared::util::format_millis)
        .unwrap_or_default();
    tracing::info!(
        table = %table.label,
        kind = %table.kind,
        status = ?table.status(),
        server = table.server_name.as_deref().unwrap_or(""),
        since = %since,
        items = %table.items_summary,
        "Table"
    );
}
