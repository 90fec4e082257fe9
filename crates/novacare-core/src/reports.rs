//! # Reports
//!
//! Pure projections over loaded medicines and transactions: the dashboard
//! tiles, the finance page series and breakdown, and the inventory filters.
//!
//! ## Date Handling
//! ```text
//! range bounds arrive as "YYYY-MM-DD" text from date inputs
//!
//!   both parse ──► start = min(from, to) 00:00:00.000 UTC
//!                  end   = max(from, to) 23:59:59.999 UTC
//!
//!   either fails ─► range_filter      returns everything (fail-open)
//!                   build_daily_series returns no buckets
//! ```
//!
//! Transactions are bucketed by the UTC calendar date of `created_at`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{classify_status, Medicine, PaymentMethod, StockStatus, Transaction};

/// Preset applied when the finance page first opens.
pub const DEFAULT_FINANCE_PRESET_DAYS: u32 = 30;

/// Category option that matches every medicine.
pub const ALL_CATEGORIES: &str = "All";

// =============================================================================
// Date Range
// =============================================================================

/// Finance page date range as edited in the form.
///
/// Bounds are kept as text so a half-typed date does not lose the other
/// bound; parsing happens when the range is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    pub from: String,
    pub to: String,
    /// Day count of the preset that produced this range, `None` once edited.
    pub preset: Option<u32>,
}

impl DateRange {
    /// A hand-edited range.
    pub fn custom(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            preset: None,
        }
    }
}

/// Longest preset, about ten years. Keeps the daily series bounded.
pub const MAX_FINANCE_PRESET_DAYS: u32 = 3650;

/// The last `days` days ending `today` (inclusive). `days` is clamped to
/// `1..=MAX_FINANCE_PRESET_DAYS`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use novacare_core::reports::finance_preset;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
/// let range = finance_preset(7, today);
/// assert_eq!(range.from, "2024-03-04");
/// assert_eq!(range.to, "2024-03-10");
/// ```
pub fn finance_preset(days: u32, today: NaiveDate) -> DateRange {
    let days = days.clamp(1, MAX_FINANCE_PRESET_DAYS);
    let from = today
        .checked_sub_days(Days::new(u64::from(days) - 1))
        .unwrap_or(NaiveDate::MIN);
    DateRange {
        from: date_key(from),
        to: date_key(today),
        preset: Some(days),
    }
}

/// Parses a `YYYY-MM-DD` date key.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Ordered `(start, end)` dates, or `None` if either bound is unparseable.
fn ordered_bounds(from: &str, to: &str) -> Option<(NaiveDate, NaiveDate)> {
    let from = parse_date_key(from)?;
    let to = parse_date_key(to)?;
    Some((from.min(to), from.max(to)))
}

// =============================================================================
// Range Filter
// =============================================================================

/// Transactions created within `[from, to]`, whole days, in either order.
///
/// Fail-open: if either bound does not parse, every transaction is returned.
pub fn range_filter<'a>(
    transactions: &'a [Transaction],
    from: &str,
    to: &str,
) -> Vec<&'a Transaction> {
    let Some((start, end)) = ordered_bounds(from, to) else {
        return transactions.iter().collect();
    };

    let start: DateTime<Utc> = start.and_time(NaiveTime::MIN).and_utc();
    let end_time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    let end: DateTime<Utc> = end.and_time(end_time).and_utc();

    transactions
        .iter()
        .filter(|tx| tx.created_at >= start && tx.created_at <= end)
        .collect()
}

// =============================================================================
// Daily Series
// =============================================================================

/// One day of the revenue chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyBucket {
    /// `YYYY-MM-DD`
    pub key: String,
    /// Short label, e.g. `"Jan 5"`.
    pub label: String,
    pub total: Money,
}

/// One bucket per calendar day in the range, summing transaction totals.
///
/// Days without sales report zero. Unparseable bounds produce no buckets.
pub fn build_daily_series<'a, I>(transactions: I, from: &str, to: &str) -> Vec<DailyBucket>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let Some((start, end)) = ordered_bounds(from, to) else {
        return Vec::new();
    };

    let mut totals: HashMap<NaiveDate, Money> = HashMap::new();
    for tx in transactions {
        *totals.entry(tx.created_at.date_naive()).or_default() += tx.total();
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| DailyBucket {
            key: date_key(day),
            label: day.format("%b %-d").to_string(),
            total: totals.get(&day).copied().unwrap_or_default(),
        })
        .collect()
}

// =============================================================================
// Payment Breakdown
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentTotal {
    pub method: PaymentMethod,
    pub total: Money,
}

/// Revenue per payment method, every method listed (cash, card, insurance).
pub fn payment_breakdown<'a, I>(transactions: I) -> Vec<PaymentTotal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut totals: HashMap<PaymentMethod, Money> = HashMap::new();
    for tx in transactions {
        *totals.entry(tx.payment_method).or_default() += tx.total();
    }

    PaymentMethod::ALL
        .into_iter()
        .map(|method| PaymentTotal {
            method,
            total: totals.get(&method).copied().unwrap_or_default(),
        })
        .collect()
}

// =============================================================================
// Finance Report
// =============================================================================

/// Everything the finance page shows for one range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinanceReport {
    pub range: DateRange,
    pub transactions: Vec<Transaction>,
    pub revenue: Money,
    pub tax_collected: Money,
    pub series: Vec<DailyBucket>,
    pub breakdown: Vec<PaymentTotal>,
}

pub fn finance_report(transactions: &[Transaction], range: &DateRange) -> FinanceReport {
    let filtered = range_filter(transactions, &range.from, &range.to);

    FinanceReport {
        range: range.clone(),
        revenue: filtered.iter().map(|tx| tx.total()).sum(),
        tax_collected: filtered.iter().map(|tx| tx.tax()).sum(),
        series: build_daily_series(filtered.iter().copied(), &range.from, &range.to),
        breakdown: payment_breakdown(filtered.iter().copied()),
        transactions: filtered.into_iter().cloned().collect(),
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Dashboard tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub revenue: Money,
    pub transactions_count: usize,
    /// Σ price × stock over the whole catalogue.
    pub stock_value: Money,
    pub low_stock: usize,
}

pub fn dashboard_stats(
    medicines: &[Medicine],
    transactions: &[Transaction],
    today: NaiveDate,
) -> DashboardStats {
    DashboardStats {
        revenue: transactions.iter().map(Transaction::total).sum(),
        transactions_count: transactions.len(),
        stock_value: medicines.iter().map(Medicine::stock_value).sum(),
        low_stock: count_status(medicines, today, StockStatus::LowStock),
    }
}

/// Inventory attention counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventorySignals {
    pub low_stock: usize,
    pub expired: usize,
}

pub fn inventory_signals(medicines: &[Medicine], today: NaiveDate) -> InventorySignals {
    InventorySignals {
        low_stock: count_status(medicines, today, StockStatus::LowStock),
        expired: count_status(medicines, today, StockStatus::Expired),
    }
}

fn count_status(medicines: &[Medicine], today: NaiveDate, status: StockStatus) -> usize {
    medicines
        .iter()
        .filter(|m| classify_status(m, today) == status)
        .count()
}

// =============================================================================
// Inventory Filters
// =============================================================================

/// `"All"` followed by each distinct category in first-seen order.
pub fn category_options(medicines: &[Medicine]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(
            medicines
                .iter()
                .filter(|m| seen.insert(m.category.as_str()))
                .map(|m| m.category.clone()),
        )
        .collect()
}

/// Medicines matching a category and a case-insensitive search over name,
/// SKU and category.
pub fn filter_medicines<'a>(
    medicines: &'a [Medicine],
    query: &str,
    category: &str,
) -> Vec<&'a Medicine> {
    let query = query.trim().to_lowercase();
    medicines
        .iter()
        .filter(|m| category == ALL_CATEGORIES || m.category == category)
        .filter(|m| {
            query.is_empty()
                || m.name.to_lowercase().contains(&query)
                || m.sku.to_lowercase().contains(&query)
                || m.category.to_lowercase().contains(&query)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
