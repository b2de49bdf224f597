//! Crab Tables - table occupancy and billing-session engine
//!
//! Client-side engine for a bar/billiard POS. Several clients share one
//! authoritative table store; each keeps a local view that converges to the
//! store by polling, opens and closes billing sessions, edits the item
//! ledger of a running session and offers a confirmed force-free when a
//! table is left orphaned.

pub mod billing;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod logger;
pub mod reconcile;
pub mod recovery;
pub mod registry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::{TableEngine, TableEngineBuilder};
pub use error::{TableError, TableResult};
pub use ledger::ItemLedger;
pub use recovery::{ConfirmedForceFree, DriftOrigin, RecoveryOffer};
pub use registry::{MergeReport, Table, TableStatus};
pub use store::{HttpTableStore, InMemoryTableStore, TableStore};

// Re-export shared types for convenience
pub use shared::models::{Bill, ItemLine, TableKind, TableRecord};
