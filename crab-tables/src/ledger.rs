//! Item ledger of an active session
//!
//! The ledger is replaced wholesale on every write. Lines are validated
//! before anything reaches the store; what the store hands back is taken as
//! is.

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

use shared::models::ItemLine;

use crate::billing;
use crate::error::{TableError, TableResult};
use crate::recovery::{DriftOrigin, RecoveryManager};
use crate::registry::TableRegistry;
use crate::store::TableStore;

/// Largest quantity a single line may carry
pub const MAX_QUANTITY: i32 = 9999;

/// Largest unit price a single line may carry
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Ordered list of item lines attached to one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemLedger {
    lines: Vec<ItemLine>,
}

impl ItemLedger {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and wrap caller-supplied lines
    pub fn new(lines: Vec<ItemLine>) -> TableResult<Self> {
        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            validate_line(line)?;
            if !seen.insert(line.item_id) {
                return Err(TableError::InvalidItem(format!(
                    "duplicate item id {}",
                    line.item_id
                )));
            }
        }
        Ok(Self { lines })
    }

    /// Wrap lines read back from the store without validation
    pub(crate) fn from_store(lines: Vec<ItemLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[ItemLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<ItemLine> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, item_id: i64) -> Option<&ItemLine> {
        self.lines.iter().find(|line| line.item_id == item_id)
    }

    pub fn items_cost(&self) -> Decimal {
        billing::items_cost(&self.lines)
    }

    /// One-line display text, e.g. `Coffee x2, Beer x1 | total 11.00`
    ///
    /// Empty ledgers summarize to an empty string.
    pub fn summary(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = self
            .lines
            .iter()
            .map(|line| format!("{} x{}", line.name, line.quantity))
            .collect();
        format!("{} | total {:.2}", lines.join(", "), self.items_cost())
    }
}

fn validate_line(line: &ItemLine) -> TableResult<()> {
    if line.name.trim().is_empty() {
        return Err(TableError::InvalidItem(format!(
            "item {} has a blank name",
            line.item_id
        )));
    }
    if line.quantity < 1 || line.quantity > MAX_QUANTITY {
        return Err(TableError::InvalidItem(format!(
            "{}: quantity {} outside 1..={MAX_QUANTITY}",
            line.name, line.quantity
        )));
    }
    if line.unit_price.is_sign_negative() || line.unit_price > MAX_UNIT_PRICE {
        return Err(TableError::InvalidItem(format!(
            "{}: unit price {} outside 0..={MAX_UNIT_PRICE}",
            line.name, line.unit_price
        )));
    }
    Ok(())
}

/// Reads and replaces the ledger of a table's active session
pub struct ItemLedgerManager {
    store: Arc<dyn TableStore>,
    registry: Arc<TableRegistry>,
    recovery: Arc<RecoveryManager>,
}

impl ItemLedgerManager {
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

    /// Overwrite the session's ledger with `lines`
    ///
    /// The local summary only changes once the store accepted the write.
    pub async fn replace_items(&self, label: &str, lines: Vec<ItemLine>) -> TableResult<()> {
        let ledger = ItemLedger::new(lines)?;

        if let Err(e) = self.store.replace_items(label, ledger.lines()).await {
            tracing::warn!(table = %label, error = %e, "Replace items failed");
            if e.offers_recovery() {
                self.recovery.record_drift(label, DriftOrigin::ReplaceItems);
            }
            return Err(e);
        }

        let summary = ledger.summary();
        if !self.registry.update(label, |t| t.items_summary = summary) {
            tracing::warn!(table = %label, "Items stored for a table not yet in the registry");
        }
        tracing::debug!(table = %label, lines = ledger.lines().len(), "Items replaced");
        self.registry.set_ledger(label, ledger);
        Ok(())
    }

    /// Ledger of the active session, read from the store
    pub async fn current_items(&self, label: &str) -> TableResult<Vec<ItemLine>> {
        let items = match self.store.fetch_items(label).await {
            Ok(items) => items,
            Err(e) => {
                if e.offers_recovery() {
                    self.recovery.record_drift(label, DriftOrigin::FetchItems);
                }
                return Err(e);
            }
        };
        self.registry
            .set_ledger(label, ItemLedger::from_store(items.clone()));
        Ok(items)
    }

    /// Last ledger this client wrote or read, without touching the store
    pub fn cached_items(&self, label: &str) -> Option<ItemLedger> {
        self.registry.ledger(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coffee() -> ItemLine {
        ItemLine::new(1, "Coffee", 2, Decimal::new(350, 2))
    }

    #[test]
    fn test_summary_format() {
        let ledger = ItemLedger::new(vec![
            coffee(),
            ItemLine::new(2, "Beer", 1, Decimal::new(400, 2)),
        ])
        .unwrap();
        assert_eq!(ledger.summary(), "Coffee x2, Beer x1 | total 11.00");
        assert_eq!(ledger.items_cost(), Decimal::new(1100, 2));
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = ItemLedger::new(vec![]).unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.summary(), "");
        assert_eq!(ledger.items_cost(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_price_is_allowed() {
        let ledger = ItemLedger::new(vec![ItemLine::new(9, "Water", 1, Decimal::ZERO)]).unwrap();
        assert_eq!(ledger.summary(), "Water x1 | total 0.00");
    }

    #[test]
    fn test_rejects_bad_quantity() {
        for quantity in [0, -1, MAX_QUANTITY + 1] {
            let line = ItemLine::new(1, "Coffee", quantity, Decimal::ONE);
            assert!(matches!(
                ItemLedger::new(vec![line]),
                Err(TableError::InvalidItem(_))
            ));
        }
        assert!(ItemLedger::new(vec![ItemLine::new(1, "Coffee", MAX_QUANTITY, Decimal::ONE)]).is_ok());
    }

    #[test]
    fn test_rejects_bad_price_and_name() {
        let negative = ItemLine::new(1, "Coffee", 1, Decimal::new(-1, 2));
        assert!(ItemLedger::new(vec![negative]).is_err());

        let huge = ItemLine::new(1, "Coffee", 1, MAX_UNIT_PRICE + Decimal::ONE);
        assert!(ItemLedger::new(vec![huge]).is_err());

        let blank = ItemLine::new(1, "  ", 1, Decimal::ONE);
        assert!(ItemLedger::new(vec![blank]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_item_ids() {
        let err = ItemLedger::new(vec![coffee(), coffee()]).unwrap_err();
        assert!(err.to_string().contains("duplicate item id 1"));
    }

    #[test]
    fn test_get_by_item_id() {
        let ledger = ItemLedger::new(vec![coffee()]).unwrap();
        assert_eq!(ledger.get(1).map(|l| l.quantity), Some(2));
        assert!(ledger.get(2).is_none());
    }
}
