//! # Cart & Pricing
//!
//! The counter cart and the pricing rules shared with the sale procedure.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Operation              Cart Change            │
//! │  ───────────────          ─────────              ───────────            │
//! │                                                                         │
//! │  Click medicine ─────────► add() ───────────────► new line or qty + 1   │
//! │                                                                         │
//! │  Change quantity ────────► update_qty() ────────► clamp to stock        │
//! │                                                                         │
//! │  Click remove ───────────► remove() ────────────► line dropped          │
//! │                                                                         │
//! │  Inventory reloaded ─────► reconcile() ─────────► refresh, clamp, evict │
//! │                                                                         │
//! │  Checkout ───────────────► check_stock() ───────► (read only)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - One line per medicine
//! - `1 <= qty <= stock` for every line after any operation
//!
//! The cart is an optimistic view, not a reservation. The sale procedure is
//! the only thing that decrements stock.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    classify_status, Medicine, PaymentMethod, SaleRequest, SaleRequestItem, Settings,
    StockStatus, TaxRate,
};

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// `name`, `sku` and `price_cents` are a snapshot taken when the line was
/// added, refreshed by [`Cart::reconcile`] whenever the inventory reloads.
/// `stock` mirrors the last known stock and is the ceiling for `qty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub medicine_id: String,
    pub name: String,
    pub sku: String,
    pub price_cents: i64,
    pub qty: i64,
    pub stock: i64,
}

impl CartLine {
    fn from_medicine(medicine: &Medicine) -> Self {
        CartLine {
            medicine_id: medicine.id.clone(),
            name: medicine.name.clone(),
            sku: medicine.sku.clone(),
            price_cents: medicine.price_cents,
            qty: 1,
            stock: medicine.stock,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price() * self.qty
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Subtotal, tax and total for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Applies the store tax rules to a subtotal.
    ///
    /// ## Rules
    /// ```text
    /// rate = 0 or subtotal <= 0 ──► tax = 0, total = subtotal
    /// prices include tax ─────────► tax backed out, total = subtotal
    /// otherwise ──────────────────► tax added, total = subtotal + tax
    /// ```
    ///
    /// Each derived amount is rounded half-up to the cent on its own.
    ///
    /// ## Example
    /// ```rust
    /// use novacare_core::cart::SaleTotals;
    /// use novacare_core::money::Money;
    /// use novacare_core::types::TaxRate;
    ///
    /// let totals = SaleTotals::compute(Money::from_cents(1495), TaxRate::from_bps(1000), false);
    /// assert_eq!(totals.tax.cents(), 150);
    /// assert_eq!(totals.total.cents(), 1645);
    /// ```
    pub fn compute(subtotal: Money, rate: TaxRate, prices_include_tax: bool) -> Self {
        if rate.is_zero() || !subtotal.is_positive() {
            return SaleTotals {
                subtotal,
                tax: Money::zero(),
                total: subtotal,
            };
        }

        if prices_include_tax {
            SaleTotals {
                subtotal,
                tax: subtotal.included_tax(rate),
                total: subtotal,
            }
        } else {
            let tax = subtotal.calculate_tax(rate);
            SaleTotals {
                subtotal,
                tax,
                total: subtotal + tax,
            }
        }
    }

    /// Prices `(unit price, qty)` pairs with the given settings.
    pub fn for_lines<I>(lines: I, settings: &Settings) -> Self
    where
        I: IntoIterator<Item = (Money, i64)>,
    {
        let subtotal: Money = lines.into_iter().map(|(price, qty)| price * qty).sum();
        Self::compute(subtotal, settings.tax_rate, settings.prices_include_tax)
    }
}

/// Cart summary for the checkout panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    /// Number of distinct lines.
    pub item_count: usize,
    /// Sum of quantities.
    pub total_quantity: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// The counter cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, medicine_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.medicine_id == medicine_id)
    }

    /// Quantity of `medicine_id` currently in the cart (0 if absent).
    pub fn quantity_of(&self, medicine_id: &str) -> i64 {
        self.line(medicine_id).map(|l| l.qty).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.qty).sum()
    }

    /// Adds one unit of `medicine`.
    ///
    /// ## Errors
    /// - [`CoreError::ExpiredMedicine`] if the medicine is expired as of `today`
    /// - [`CoreError::InsufficientStock`] if the cart already holds every unit on hand
    pub fn add(&mut self, medicine: &Medicine, today: NaiveDate) -> CoreResult<()> {
        if classify_status(medicine, today) == StockStatus::Expired {
            return Err(CoreError::ExpiredMedicine {
                name: medicine.name.clone(),
            });
        }

        if self.quantity_of(&medicine.id) >= medicine.stock {
            return Err(CoreError::InsufficientStock {
                name: medicine.name.clone(),
            });
        }

        match self.lines.iter_mut().find(|l| l.medicine_id == medicine.id) {
            Some(line) => {
                line.qty += 1;
                line.stock = medicine.stock;
            }
            None => self.lines.push(CartLine::from_medicine(medicine)),
        }
        Ok(())
    }

    /// Sets the quantity of a line, saturating at its stock ceiling.
    ///
    /// `next <= 0` removes the line. Unknown ids are ignored.
    pub fn update_qty(&mut self, medicine_id: &str, next: i64) {
        if next <= 0 {
            self.remove(medicine_id);
            return;
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.medicine_id == medicine_id) {
            line.qty = next.min(line.stock);
        }
        self.lines.retain(|l| l.qty > 0);
    }

    /// Removes a line. No-op if absent.
    pub fn remove(&mut self, medicine_id: &str) {
        self.lines.retain(|l| l.medicine_id != medicine_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Re-derives every line from a freshly loaded medicine list.
    ///
    /// Name, SKU, price and stock are refreshed; lines whose medicine is gone
    /// are dropped; quantities are clamped to the new stock and zero lines
    /// evicted. Returns the number of lines dropped.
    pub fn reconcile(&mut self, medicines: &[Medicine]) -> usize {
        let by_id: HashMap<&str, &Medicine> =
            medicines.iter().map(|m| (m.id.as_str(), m)).collect();

        let before = self.lines.len();
        self.lines.retain_mut(|line| match by_id.get(line.medicine_id.as_str()) {
            Some(medicine) => {
                line.name = medicine.name.clone();
                line.sku = medicine.sku.clone();
                line.price_cents = medicine.price_cents;
                line.stock = medicine.stock;
                line.qty = line.qty.min(medicine.stock);
                line.qty > 0
            }
            None => false,
        });
        before - self.lines.len()
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Prices the cart with the store settings.
    pub fn price(&self, settings: &Settings) -> CartTotals {
        let totals = SaleTotals::compute(
            self.subtotal(),
            settings.tax_rate,
            settings.prices_include_tax,
        );
        CartTotals {
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
        }
    }

    /// Pre-submission check against the last known stock.
    ///
    /// Fails on the first line asking for more than its stock.
    pub fn check_stock(&self) -> CoreResult<()> {
        match self.lines.iter().find(|l| l.qty > l.stock) {
            Some(line) => Err(CoreError::StockExceeded {
                name: line.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Builds the payload for the sale procedure.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyCart`] if there is nothing to sell
    /// - [`CoreError::StockExceeded`] from [`Cart::check_stock`]
    pub fn to_sale_request(&self, payment_method: PaymentMethod) -> CoreResult<SaleRequest> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        self.check_stock()?;

        Ok(SaleRequest {
            payment_method,
            items: self
                .lines
                .iter()
                .map(|l| SaleRequestItem {
                    medicine_id: l.medicine_id.clone(),
                    qty: l.qty,
                })
                .collect(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn medicine(id: &str, price_cents: i64, stock: i64) -> Medicine {
        Medicine {
            id: id.to_string(),
            sku: format!("SKU-{}", id),
            name: format!("Medicine {}", id),
            category: "General".to_string(),
            price_cents,
            stock,
            expiry: NaiveDate::from_ymd_opt(2030, 1, 1),
            created_at: Utc::now(),
        }
    }

    fn settings(bps: u32, inclusive: bool) -> Settings {
        Settings {
            tax_rate: TaxRate::from_bps(bps),
            prices_include_tax: inclusive,
            ..Settings::default()
        }
    }

    #[test]
    fn test_add_inserts_then_increments() {
        let mut cart = Cart::new();
        let m = medicine("a", 450, 5);

        cart.add(&m, today()).unwrap();
        cart.add(&m, today()).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.quantity_of("a"), 2);
    }

    #[test]
    fn test_add_rejects_expired() {
        let mut cart = Cart::new();
        let mut m = medicine("a", 450, 5);
        m.expiry = NaiveDate::from_ymd_opt(2024, 6, 14);

        let err = cart.add(&m, today()).unwrap_err();
        assert!(matches!(err, CoreError::ExpiredMedicine { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_at_stock_ceiling() {
        let mut cart = Cart::new();
        let m = medicine("a", 450, 2);

        cart.add(&m, today()).unwrap();
        cart.add(&m, today()).unwrap();
        let err = cart.add(&m, today()).unwrap_err();

        assert_eq!(err.to_string(), "Insufficient stock for Medicine a.");
        assert_eq!(cart.quantity_of("a"), 2);

        let empty = medicine("b", 100, 0);
        assert!(cart.add(&empty, today()).is_err());
    }

    #[test]
    fn test_update_qty_clamps_and_removes() {
        let mut cart = Cart::new();
        cart.add(&medicine("a", 450, 5), today()).unwrap();

        cart.update_qty("a", 99);
        assert_eq!(cart.quantity_of("a"), 5);

        cart.update_qty("a", 3);
        assert_eq!(cart.quantity_of("a"), 3);

        cart.update_qty("a", 0);
        assert!(cart.is_empty());

        // Unknown id is a no-op.
        cart.update_qty("zzz", 4);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_qty_drops_line_with_zero_ceiling() {
        let mut cart = Cart::new();
        cart.add(&medicine("a", 450, 5), today()).unwrap();
        cart.reconcile(&[medicine("a", 450, 5)]);
        cart.lines[0].stock = 0;

        cart.update_qty("a", 2);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_reconcile_refreshes_clamps_and_evicts() {
        let mut cart = Cart::new();
        let a = medicine("a", 450, 10);
        let b = medicine("b", 200, 10);
        let c = medicine("c", 300, 10);
        for _ in 0..4 {
            cart.add(&a, today()).unwrap();
        }
        cart.add(&b, today()).unwrap();
        cart.add(&c, today()).unwrap();

        // a: stock fell to 2 and price changed; b: sold out; c: deleted
        let mut a2 = medicine("a", 500, 2);
        a2.name = "Renamed".to_string();
        let b2 = medicine("b", 200, 0);

        let dropped = cart.reconcile(&[a2, b2]);

        assert_eq!(dropped, 2);
        assert_eq!(cart.item_count(), 1);
        let line = cart.line("a").unwrap();
        assert_eq!(line.qty, 2);
        assert_eq!(line.stock, 2);
        assert_eq!(line.price_cents, 500);
        assert_eq!(line.name, "Renamed");
    }

    #[test]
    fn test_reconcile_keeps_qty_within_stock() {
        let mut cart = Cart::new();
        cart.add(&medicine("a", 100, 3), today()).unwrap();
        cart.add(&medicine("a", 100, 3), today()).unwrap();

        cart.reconcile(&[medicine("a", 100, 50)]);

        for line in cart.lines() {
            assert!(line.qty >= 1 && line.qty <= line.stock);
        }
        assert_eq!(cart.quantity_of("a"), 2);
    }

    #[test]
    fn test_price_exclusive_tax() {
        let mut cart = Cart::new();
        let m = medicine("a", 1495, 5);
        cart.add(&m, today()).unwrap();

        let totals = cart.price(&settings(1000, false));
        assert_eq!(totals.subtotal.cents(), 1495);
        assert_eq!(totals.tax.cents(), 150);
        assert_eq!(totals.total.cents(), 1645);
        assert_eq!(totals.item_count, 1);
        assert_eq!(totals.total_quantity, 1);
    }

    #[test]
    fn test_price_inclusive_tax() {
        let mut cart = Cart::new();
        let m = medicine("a", 1100, 5);
        cart.add(&m, today()).unwrap();

        let totals = cart.price(&settings(1000, true));
        assert_eq!(totals.tax.cents(), 100);
        assert_eq!(totals.total.cents(), 1100);
    }

    #[test]
    fn test_price_zero_rate_and_empty_cart() {
        let mut cart = Cart::new();
        assert_eq!(cart.price(&settings(1000, false)).total, Money::zero());

        cart.add(&medicine("a", 999, 5), today()).unwrap();
        let totals = cart.price(&settings(0, false));
        assert!(totals.tax.is_zero());
        assert_eq!(totals.total.cents(), 999);
    }

    #[test]
    fn test_subtotal_is_exact_in_cents() {
        // 0.10 + 0.20 would drift in floating point
        let mut cart = Cart::new();
        cart.add(&medicine("a", 10, 5), today()).unwrap();
        cart.add(&medicine("b", 20, 5), today()).unwrap();
        assert_eq!(cart.subtotal().cents(), 30);
    }

    #[test]
    fn test_check_stock_reports_first_offender() {
        let mut cart = Cart::new();
        cart.add(&medicine("a", 100, 5), today()).unwrap();
        cart.add(&medicine("b", 100, 5), today()).unwrap();
        cart.lines[1].qty = 6;

        let err = cart.check_stock().unwrap_err();
        assert_eq!(err.to_string(), "Stock is insufficient for Medicine b.");
    }

    #[test]
    fn test_to_sale_request() {
        let cart = Cart::new();
        assert_eq!(
            cart.to_sale_request(PaymentMethod::Cash).unwrap_err(),
            CoreError::EmptyCart
        );

        let mut cart = Cart::new();
        cart.add(&medicine("a", 100, 5), today()).unwrap();
        cart.update_qty("a", 3);

        let request = cart.to_sale_request(PaymentMethod::Card).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Card);
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].qty, 3);
    }

    #[test]
    fn test_sale_totals_for_lines() {
        let totals = SaleTotals::for_lines(
            [(Money::from_cents(450), 2), (Money::from_cents(595), 1)],
            &settings(825, false),
        );
        // 14.95 × 8.25% = 1.233375 → 1.23
        assert_eq!(totals.subtotal.cents(), 1495);
        assert_eq!(totals.tax.cents(), 123);
        assert_eq!(totals.total.cents(), 1618);
    }
}
