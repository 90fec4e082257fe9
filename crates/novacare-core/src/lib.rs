//! # novacare-core: Pure Business Logic for NovaCare Pharmacy POS
//!
//! This crate is the **heart** of NovaCare. It contains the business rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     NovaCare POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              novacare-pharmacy (application layer)              │   │
//! │  │   session bridge ──► controller intents ──► read projections    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ novacare-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │permissions│  │   │
//! │  │   │ Medicine  │  │   Money   │  │   Cart    │  │ PageKey   │  │   │
//! │  │   │Transaction│  │ currency  │  │SaleTotals │  │normalize  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │  reports  │  │validation │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  novacare-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, atomic sale procedure        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Medicine, Transaction, Profile, Settings)
//! - [`money`] - Money type with integer arithmetic and currency formatting
//! - [`cart`] - Cart lines, reconciliation and pricing
//! - [`permissions`] - Page access flags and normalization
//! - [`reports`] - Dashboard and finance projections
//! - [`error`] - Domain error types
//! - [`validation`] - Form validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: callers pass `today`; nothing here reads the clock
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use novacare_core::money::Money;
//! use novacare_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(1495); // $14.95
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(1000)); // 10%
//! assert_eq!(tax.cents(), 150);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod permissions;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use novacare_core::Money` instead of
// `use novacare_core::money::Money`

pub use cart::{Cart, CartLine, CartTotals, SaleTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{format_currency, Money};
pub use permissions::{normalize_permissions, PageKey, Permissions, STAFF_DEFAULT};
pub use types::*;
pub use validation::ValidationResult;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Stock at or below this level is reported as low.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Smallest price accepted by the medicine forms (0.10).
pub const MIN_PRICE_CENTS: i64 = 10;

/// Minimum password length for new staff accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;
