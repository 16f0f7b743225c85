//! Stock ledger tests
//!
//! Property-based and unit tests for the ledger rules:
//! - Stock quantity never goes negative
//! - Every applied delta produces a consistent before/after pair
//! - Replaying the log from the initial quantity reproduces the final stock

use proptest::prelude::*;

// ============================================================================
// Ledger simulation
// ============================================================================

/// One ledger entry as the database would record it
#[derive(Debug, Clone)]
struct LogEntry {
    quantity: i32,
    before_quantity: i32,
    after_quantity: i32,
}

/// In-memory model of a single product's stock under ledger rules
#[derive(Debug, Default)]
struct LedgerModel {
    stock: i32,
    log: Vec<LogEntry>,
}

impl LedgerModel {
    fn new(initial: i32) -> Self {
        Self {
            stock: initial,
            log: Vec::new(),
        }
    }

    /// Apply a signed delta; rejected deltas leave both stock and log
    /// untouched
    fn apply(&mut self, delta: i32) -> Result<(), ()> {
        let after = self.stock.checked_add(delta).filter(|q| *q >= 0).ok_or(())?;
        self.log.push(LogEntry {
            quantity: delta,
            before_quantity: self.stock,
            after_quantity: after,
        });
        self.stock = after;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_exact_drain_to_zero() {
    let mut model = LedgerModel::new(50);
    assert!(model.apply(-50).is_ok());
    assert_eq!(model.stock, 0);

    // The next removal has nothing left to take
    assert!(model.apply(-1).is_err());
    assert_eq!(model.stock, 0);
    assert_eq!(model.log.len(), 1);
}

#[test]
fn test_rejected_delta_writes_no_log() {
    let mut model = LedgerModel::new(2);
    assert!(model.apply(-3).is_err());
    assert!(model.log.is_empty());
    assert_eq!(model.stock, 2);
}

#[test]
fn test_each_entry_links_before_and_after() {
    let mut model = LedgerModel::new(10);
    model.apply(5).unwrap();
    model.apply(-3).unwrap();
    model.apply(-12).unwrap();

    for entry in &model.log {
        assert_eq!(entry.before_quantity + entry.quantity, entry.after_quantity);
    }
    assert_eq!(model.stock, 0);
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Stock never goes negative, whatever sequence of deltas arrives
    #[test]
    fn prop_stock_never_negative(
        initial in 0i32..=10_000,
        deltas in prop::collection::vec(-500i32..=500, 0..50)
    ) {
        let mut model = LedgerModel::new(initial);
        for delta in deltas {
            let _ = model.apply(delta);
            prop_assert!(model.stock >= 0);
        }
    }

    /// Replaying the accepted log entries from the initial quantity
    /// reproduces the final stock exactly
    #[test]
    fn prop_log_replay_reproduces_stock(
        initial in 0i32..=10_000,
        deltas in prop::collection::vec(-500i32..=500, 0..50)
    ) {
        let mut model = LedgerModel::new(initial);
        for delta in deltas {
            let _ = model.apply(delta);
        }

        let replayed = model
            .log
            .iter()
            .fold(initial, |stock, entry| stock + entry.quantity);
        prop_assert_eq!(replayed, model.stock);
    }

    /// Log entries chain: each before quantity equals the previous after
    #[test]
    fn prop_log_entries_chain(
        initial in 0i32..=10_000,
        deltas in prop::collection::vec(-500i32..=500, 1..50)
    ) {
        let mut model = LedgerModel::new(initial);
        for delta in deltas {
            let _ = model.apply(delta);
        }

        let mut expected_before = initial;
        for entry in &model.log {
            prop_assert_eq!(entry.before_quantity, expected_before);
            expected_before = entry.after_quantity;
        }
    }

    /// A rejected delta is exactly one that would drive the stock negative
    #[test]
    fn prop_rejection_criterion(current in 0i32..=10_000, delta in -20_000i32..=20_000) {
        let mut model = LedgerModel::new(current);
        let accepted = model.apply(delta).is_ok();
        prop_assert_eq!(accepted, current + delta >= 0);
    }
}
