//! # Domain Types
//!
//! Core domain types used throughout NovaCare.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Medicine     │   │   Transaction   │   │    Profile      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (auth id)   │       │
//! │  │  sku (business) │   │  user_id        │   │  email          │       │
//! │  │  price_cents    │   │  total_cents    │   │  role           │       │
//! │  │  stock, expiry  │   │  items[]        │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  StockStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  InStock        │   │  Cash           │       │
//! │  │  825 = 8.25%    │   │  LowStock       │   │  Card           │       │
//! │  └─────────────────┘   │  Expired        │   │  Insurance      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Medicines have:
//! - `id`: UUID v4 - immutable, used for database relations and cart lines
//! - `sku`: human-readable business identifier, unique across the catalogue

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::permissions::Permissions;
use crate::LOW_STOCK_THRESHOLD;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25%
///
/// The settings page edits a percentage; it is converted once on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage.
    ///
    /// Negative and non-finite inputs clamp to zero; range checks belong to
    /// [`crate::validation::validate_tax_percentage`].
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return TaxRate(0);
        }
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// Category assigned when a stored row has none.
pub const DEFAULT_CATEGORY: &str = "General";

/// A medicine in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Medicine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    /// Display name shown at the counter and in reports.
    pub name: String,

    /// Free-form category, used for filtering.
    pub category: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Expiry date, if known.
    #[ts(as = "Option<String>")]
    pub expiry: Option<NaiveDate>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Medicine {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Stock value of this medicine (price × stock).
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.price() * self.stock
    }

    /// Availability status as of `today`.
    #[inline]
    pub fn status(&self, today: NaiveDate) -> StockStatus {
        classify_status(self, today)
    }

    /// Fills in the category default for rows stored without one.
    pub fn with_default_category(mut self) -> Self {
        if self.category.trim().is_empty() {
            self.category = DEFAULT_CATEGORY.to_string();
        }
        self
    }
}

// =============================================================================
// Medicine Input
// =============================================================================

/// Form input for a new medicine.
///
/// Validated and trimmed by [`crate::validation::validate_new_medicine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMedicine {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub stock: i64,
    #[ts(as = "Option<String>")]
    pub expiry: Option<NaiveDate>,
}

/// Form input for editing a medicine. The SKU is not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MedicineUpdate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub stock: i64,
    #[ts(as = "Option<String>")]
    pub expiry: Option<NaiveDate>,
}

// =============================================================================
// Stock Status
// =============================================================================

/// Availability of a medicine, derived from expiry and stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    /// Past its expiry date. Cannot be sold regardless of stock.
    Expired,
}

impl StockStatus {
    /// Label used by the inventory table.
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::Expired => "Expired",
        }
    }
}

/// Classifies a medicine.
///
/// ## Rules (first match wins)
/// 1. `expiry < today` → Expired (a medicine expiring today is still sellable)
/// 2. `stock <= LOW_STOCK_THRESHOLD` → LowStock
/// 3. otherwise → InStock
pub fn classify_status(medicine: &Medicine, today: NaiveDate) -> StockStatus {
    match medicine.expiry {
        Some(expiry) if expiry < today => StockStatus::Expired,
        _ if medicine.stock <= LOW_STOCK_THRESHOLD => StockStatus::LowStock,
        _ => StockStatus::InStock,
    }
}

/// A medicine with its status resolved, as the inventory and POS pages list it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MedicineWithStatus {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub status: StockStatus,
}

impl MedicineWithStatus {
    pub fn new(medicine: Medicine, today: NaiveDate) -> Self {
        let status = classify_status(&medicine, today);
        Self { medicine, status }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment. Selected after every completed sale.
    #[default]
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Billed to the customer's insurer.
    Insurance,
}

impl PaymentMethod {
    /// Every method, in the order the finance page lists them.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Insurance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Insurance => "insurance",
        }
    }

    /// Parses the stored lowercase name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "insurance" => Some(PaymentMethod::Insurance),
            _ => None,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A completed sale, as listed on the dashboard and finance pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// Profile id of the operator who completed the sale.
    pub user_id: Option<String>,
    /// Grand total in cents (tax included).
    pub total_cents: i64,
    pub tax_cents: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub items: Vec<TransactionItem>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    /// Number of units sold across all lines.
    pub fn items_count(&self) -> i64 {
        self.items.iter().map(|item| item.qty).sum()
    }
}

/// Name shown for a line whose medicine has since been deleted.
pub const FALLBACK_ITEM_NAME: &str = "Medicine";
/// SKU shown for a line whose medicine has since been deleted.
pub const FALLBACK_ITEM_SKU: &str = "-";

/// A line of a completed sale.
/// Uses snapshot pattern to freeze the unit price at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionItem {
    pub medicine_id: Option<String>,
    /// Current medicine name, or [`FALLBACK_ITEM_NAME`].
    pub name: String,
    /// Current medicine SKU, or [`FALLBACK_ITEM_SKU`].
    pub sku: String,
    pub qty: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl TransactionItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Sale Request
// =============================================================================

/// Payload handed to the atomic sale procedure.
///
/// Only ids and quantities travel; prices and totals are recomputed by the
/// procedure from the stored rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub payment_method: PaymentMethod,
    pub items: Vec<SaleRequestItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequestItem {
    pub medicine_id: String,
    pub qty: i64,
}

// =============================================================================
// Role & Profile
// =============================================================================

/// Operator role.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access. Permission flags are ignored.
    Admin,
    #[default]
    Staff,
}

impl Role {
    /// Maps a free-form role string. Anything other than "admin" is staff.
    pub fn from_input(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Staff
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }
}

/// The application-level record of an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Profile {
    /// Same id as the auth identity.
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Profile {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Name for greetings; falls back to the email.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}

/// A profile paired with its resolved permissions, for the staff page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffMember {
    pub profile: Profile,
    pub permissions: Permissions,
}

/// Form input for registering a staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffRegistration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub permissions: Permissions,
}

/// Form input for editing a staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffUpdate {
    pub profile_id: String,
    pub full_name: String,
    pub role: Role,
    pub permissions: Permissions,
}

// =============================================================================
// Settings
// =============================================================================

pub const DEFAULT_STORE_NAME: &str = "NovaCare Pharmacy";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Store-wide settings.
///
/// When no row exists, [`Settings::default`] is used in memory and the first
/// save inserts a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settings {
    /// Row id, `None` until the first save.
    pub id: Option<String>,
    pub store_name: String,
    /// ISO 4217 code.
    pub currency: String,
    pub tax_rate: TaxRate,
    /// Whether catalogue prices already contain tax.
    pub prices_include_tax: bool,
    pub address: String,
    pub phone: String,
    pub support_email: String,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: None,
            store_name: DEFAULT_STORE_NAME.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            tax_rate: TaxRate::zero(),
            prices_include_tax: false,
            address: String::new(),
            phone: String::new(),
            support_email: String::new(),
            updated_at: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(stock: i64, expiry: Option<NaiveDate>) -> Medicine {
        Medicine {
            id: "m1".to_string(),
            sku: "PARA-500".to_string(),
            name: "Paracetamol 500mg".to_string(),
            category: "Analgesic".to_string(),
            price_cents: 450,
            stock,
            expiry,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
        assert_eq!(TaxRate::from_percentage(10.0).bps(), 1000);
        assert_eq!(TaxRate::from_percentage(-3.0).bps(), 0);
        assert_eq!(TaxRate::from_percentage(f64::NAN).bps(), 0);
        assert!((TaxRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_classify_status() {
        let today = date(2024, 6, 15);

        assert_eq!(
            classify_status(&medicine(50, Some(date(2025, 1, 1))), today),
            StockStatus::InStock
        );
        assert_eq!(
            classify_status(&medicine(10, Some(date(2025, 1, 1))), today),
            StockStatus::LowStock
        );
        assert_eq!(
            classify_status(&medicine(11, None), today),
            StockStatus::InStock
        );
        // Expired beats low stock.
        assert_eq!(
            classify_status(&medicine(0, Some(date(2024, 6, 14))), today),
            StockStatus::Expired
        );
        // Expiring today is still sellable.
        assert_eq!(
            classify_status(&medicine(50, Some(today)), today),
            StockStatus::InStock
        );
    }

    #[test]
    fn test_default_category() {
        let mut m = medicine(5, None);
        m.category = "  ".to_string();
        assert_eq!(m.with_default_category().category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_role_from_input() {
        assert_eq!(Role::from_input("admin"), Role::Admin);
        assert_eq!(Role::from_input(" Admin "), Role::Admin);
        assert_eq!(Role::from_input("manager"), Role::Staff);
        assert_eq!(Role::from_input(""), Role::Staff);
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("CARD"), Some(PaymentMethod::Card));
        assert_eq!(PaymentMethod::parse("cheque"), None);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Insurance).unwrap(),
            "\"insurance\""
        );
    }

    #[test]
    fn test_items_count() {
        let item = |qty| TransactionItem {
            medicine_id: Some("m1".to_string()),
            name: "Paracetamol".to_string(),
            sku: "PARA".to_string(),
            qty,
            unit_price_cents: 100,
            line_total_cents: 100 * qty,
        };
        let tx = Transaction {
            id: "t1".to_string(),
            user_id: None,
            total_cents: 500,
            tax_cents: 0,
            payment_method: PaymentMethod::Cash,
            created_at: Utc::now(),
            items: vec![item(2), item(3)],
        };
        assert_eq!(tx.items_count(), 5);
    }

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.store_name, "NovaCare Pharmacy");
        assert_eq!(settings.currency, "USD");
        assert!(settings.tax_rate.is_zero());
        assert!(!settings.prices_include_tax);
        assert!(settings.id.is_none());
    }
}
