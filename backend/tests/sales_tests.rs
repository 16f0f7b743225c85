//! Sales transaction tests
//!
//! Property-based and unit tests for order entry and cancellation:
//! - Order totals equal the sum of line subtotals
//! - Discounts never push a subtotal below zero
//! - Selling then cancelling restores stock exactly and leaves a paired
//!   sale/return log trail referencing the same order
//! - Only completed orders can be cancelled

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use shared::types::StockStatus;
use shared::validation::{validate_discount, validate_sale_quantity};

// ============================================================================
// Pricing model
// ============================================================================

#[derive(Debug, Clone)]
struct CartLine {
    unit_price: Decimal,
    quantity: i32,
    discount: Decimal,
}

impl CartLine {
    fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity) - self.discount
    }
}

fn order_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::subtotal).sum()
}

// ============================================================================
// Order lifecycle model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderState {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Sale,
    Return,
}

/// One inventory log entry as the ledger would record it
#[derive(Debug, Clone)]
struct LogEntry {
    product: u32,
    kind: ChangeKind,
    delta: i32,
    order_ref: u32,
}

const ORDER_REF: u32 = 1;

/// A store with product stock, a ledger log, threshold alerts and one
/// order, for sell/cancel round trips
#[derive(Debug)]
struct StoreModel {
    stock: HashMap<u32, i32>,
    min_stock: i32,
    max_stock: i32,
    log: Vec<LogEntry>,
    alerts: HashSet<(u32, &'static str)>,
    order_lines: Vec<(u32, i32)>,
    order_state: Option<OrderState>,
}

impl StoreModel {
    fn new(stock: HashMap<u32, i32>) -> Self {
        Self::with_thresholds(stock, 0, i32::MAX)
    }

    fn with_thresholds(stock: HashMap<u32, i32>, min_stock: i32, max_stock: i32) -> Self {
        Self {
            stock,
            min_stock,
            max_stock,
            log: Vec::new(),
            alerts: HashSet::new(),
            order_lines: Vec::new(),
            order_state: None,
        }
    }

    /// Record a threshold breach after a mutation, mirroring the alert
    /// evaluation every stock change runs through
    fn evaluate_alert(&mut self, product: u32) {
        let quantity = self.stock.get(&product).copied().unwrap_or(0);
        match StockStatus::evaluate(quantity, self.min_stock, self.max_stock) {
            StockStatus::Normal => {}
            status => {
                self.alerts.insert((product, status.as_str()));
            }
        }
    }

    /// All-or-nothing sale: if any line lacks stock, nothing changes
    fn sell(&mut self, lines: Vec<(u32, i32)>) -> Result<(), ()> {
        if lines.is_empty() {
            return Err(());
        }
        // Aggregate requested quantities per product before checking, the
        // same product may appear on several lines
        let mut requested: HashMap<u32, i32> = HashMap::new();
        for (product, quantity) in &lines {
            if *quantity <= 0 {
                return Err(());
            }
            *requested.entry(*product).or_insert(0) += quantity;
        }
        for (product, quantity) in &requested {
            if self.stock.get(product).copied().unwrap_or(0) < *quantity {
                return Err(());
            }
        }
        // One log entry per cart line, in caller order
        for (product, quantity) in &lines {
            *self.stock.get_mut(product).unwrap() -= quantity;
            self.log.push(LogEntry {
                product: *product,
                kind: ChangeKind::Sale,
                delta: -quantity,
                order_ref: ORDER_REF,
            });
            self.evaluate_alert(*product);
        }
        self.order_lines = lines;
        self.order_state = Some(OrderState::Completed);
        Ok(())
    }

    /// Compensating cancellation: restore exactly what the order sold
    fn cancel(&mut self) -> Result<(), ()> {
        match self.order_state {
            Some(OrderState::Completed) => {}
            _ => return Err(()),
        }
        let lines = self.order_lines.clone();
        for (product, quantity) in lines {
            *self.stock.entry(product).or_insert(0) += quantity;
            self.log.push(LogEntry {
                product,
                kind: ChangeKind::Return,
                delta: quantity,
                order_ref: ORDER_REF,
            });
            self.evaluate_alert(product);
        }
        self.order_state = Some(OrderState::Cancelled);
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_empty_cart_rejected() {
    let mut store = StoreModel::new(HashMap::from([(1, 10)]));
    assert!(store.sell(vec![]).is_err());
    assert_eq!(store.stock[&1], 10);
    assert!(store.log.is_empty());
}

#[test]
fn test_oversell_changes_nothing() {
    let mut store = StoreModel::new(HashMap::from([(1, 10), (2, 2)]));
    // Second line exceeds stock, so the first must not be applied either
    assert!(store.sell(vec![(1, 5), (2, 3)]).is_err());
    assert_eq!(store.stock[&1], 10);
    assert_eq!(store.stock[&2], 2);
    assert!(store.log.is_empty());
}

#[test]
fn test_repeated_product_lines_are_aggregated() {
    let mut store = StoreModel::new(HashMap::from([(1, 5)]));
    // 3 + 3 exceeds the 5 in stock even though each line alone fits
    assert!(store.sell(vec![(1, 3), (1, 3)]).is_err());
    assert_eq!(store.stock[&1], 5);
}

#[test]
fn test_cancel_requires_completed_order() {
    let mut store = StoreModel::new(HashMap::from([(1, 10)]));
    assert!(store.cancel().is_err());

    store.sell(vec![(1, 4)]).unwrap();
    assert!(store.cancel().is_ok());
    // Cancelling twice is rejected
    assert!(store.cancel().is_err());
    assert_eq!(store.stock[&1], 10);
}

#[test]
fn test_sell_cancel_writes_paired_log_entries() {
    let mut store = StoreModel::new(HashMap::from([(7, 20)]));
    store.sell(vec![(7, 6)]).unwrap();
    store.cancel().unwrap();

    // Exactly two entries: one sale at -Q, one return at +Q, both
    // referencing the same order
    assert_eq!(store.log.len(), 2);
    let sale = &store.log[0];
    let restore = &store.log[1];
    assert_eq!(sale.kind, ChangeKind::Sale);
    assert_eq!(sale.delta, -6);
    assert_eq!(restore.kind, ChangeKind::Return);
    assert_eq!(restore.delta, 6);
    assert_eq!(sale.order_ref, restore.order_ref);
}

#[test]
fn test_cancelled_restore_raises_high_alert() {
    // Stock sits exactly at the maximum; selling clears the breach zone,
    // the compensating restore re-enters it and must be recorded
    let mut store = StoreModel::with_thresholds(HashMap::from([(1, 10)]), 2, 10);
    store.sell(vec![(1, 3)]).unwrap();
    assert!(!store.alerts.contains(&(1, "high")));

    store.cancel().unwrap();
    assert!(store.alerts.contains(&(1, "high")));
}

#[test]
fn test_full_discount_zeroes_subtotal() {
    let line = CartLine {
        unit_price: Decimal::new(1250, 2),
        quantity: 2,
        discount: Decimal::new(2500, 2),
    };
    assert_eq!(line.subtotal(), Decimal::ZERO);
}

#[test]
fn test_quantity_validation_bounds() {
    assert!(validate_sale_quantity(1).is_ok());
    assert!(validate_sale_quantity(0).is_err());
    assert!(validate_sale_quantity(-5).is_err());
}

// ============================================================================
// Property Tests
// ============================================================================

fn price_strategy() -> impl Strategy<Value = Decimal> {
    // 0.01 to 10000.00 in cents
    (1i64..=1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    /// The order total is always the sum of its line subtotals
    #[test]
    fn prop_total_is_sum_of_subtotals(
        lines in prop::collection::vec(
            (price_strategy(), 1i32..=50, 0u32..=100),
            1..10
        )
    ) {
        let cart: Vec<CartLine> = lines
            .into_iter()
            .map(|(unit_price, quantity, discount_pct)| {
                let gross = unit_price * Decimal::from(quantity);
                CartLine {
                    unit_price,
                    quantity,
                    discount: gross * Decimal::from(discount_pct) / Decimal::from(100u32),
                }
            })
            .collect();

        let expected: Decimal = cart.iter().map(CartLine::subtotal).sum();
        prop_assert_eq!(order_total(&cart), expected);
    }

    /// A discount validated against the line gross never produces a
    /// negative subtotal
    #[test]
    fn prop_validated_discount_keeps_subtotal_non_negative(
        unit_price in price_strategy(),
        quantity in 1i32..=50,
        discount_cents in 0i64..=2_000_000
    ) {
        let discount = Decimal::new(discount_cents, 2);
        let gross = unit_price * Decimal::from(quantity);
        let line = CartLine { unit_price, quantity, discount };

        if validate_discount(discount, gross).is_ok() {
            prop_assert!(line.subtotal() >= Decimal::ZERO);
        }
    }

    /// Sell then cancel always restores the starting stock levels, and the
    /// log holds one sale/return pair per line, all referencing the order
    #[test]
    fn prop_sell_cancel_round_trip(
        initial in prop::collection::hash_map(1u32..=5, 0i32..=100, 1..5),
        requests in prop::collection::vec((1u32..=5, 1i32..=20), 1..6)
    ) {
        let mut store = StoreModel::new(initial.clone());
        if store.sell(requests.clone()).is_ok() {
            store.cancel().unwrap();
            for (product, quantity) in &initial {
                prop_assert_eq!(store.stock.get(product).copied().unwrap_or(0), *quantity);
            }

            // Two entries per cart line: the i-th sale pairs with the i-th
            // return, with symmetric deltas and the same order reference
            let line_count = requests.len();
            prop_assert_eq!(store.log.len(), 2 * line_count);
            for (i, (product, quantity)) in requests.iter().enumerate() {
                let sale = &store.log[i];
                let restore = &store.log[line_count + i];
                prop_assert_eq!(sale.kind, ChangeKind::Sale);
                prop_assert_eq!(sale.product, *product);
                prop_assert_eq!(sale.delta, -quantity);
                prop_assert_eq!(restore.kind, ChangeKind::Return);
                prop_assert_eq!(restore.product, *product);
                prop_assert_eq!(restore.delta, *quantity);
                prop_assert_eq!(sale.order_ref, restore.order_ref);
            }

            // The paired deltas cancel out per product
            let mut per_product: HashMap<u32, i32> = HashMap::new();
            for entry in &store.log {
                *per_product.entry(entry.product).or_insert(0) += entry.delta;
            }
            for (_, net) in per_product {
                prop_assert_eq!(net, 0);
            }
        } else {
            // Rejected sale must not have touched stock or the log
            for (product, quantity) in &initial {
                prop_assert_eq!(store.stock.get(product).copied().unwrap_or(0), *quantity);
            }
            prop_assert!(store.log.is_empty());
        }
    }
}
