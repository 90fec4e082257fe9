//! # Error Types
//!
//! Domain-specific error types for novacare-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  novacare-core errors (this file)                                      │
//! │  ├── CoreError        - Cart and business rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  novacare-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  pharmacy app errors                                                   │
//! │  ├── StoreError       - Collaborator failures (schema, stock, auth)    │
//! │  └── ApiError         - What views see (code + message)                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Notice banner          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (medicine name, field)
//! 3. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// The `Display` text is shown to the operator verbatim, so it reads as a
/// sentence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Medicine is past its expiry date and cannot be added to a cart.
    #[error("{name} is expired and cannot be sold.")]
    ExpiredMedicine { name: String },

    /// The cart already holds every unit the store has on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Click medicine (stock: 3, in cart: 3)
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Amoxicillin 500mg" }
    ///      │
    ///      ▼
    /// Banner: "Insufficient stock for Amoxicillin 500mg."
    /// ```
    #[error("Insufficient stock for {name}.")]
    InsufficientStock { name: String },

    /// A cart line asks for more than the last known stock. Raised by the
    /// pre-submission check, before the sale procedure is called.
    #[error("Stock is insufficient for {name}.")]
    StockExceeded { name: String },

    /// Sale submitted with no lines.
    #[error("Add medicines to complete a sale.")]
    EmptyCart,

    /// Medicine id is not in the current inventory list.
    #[error("Medicine not found: {0}")]
    MedicineNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when operator input doesn't meet requirements. The operation
/// is never attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A group of required fields is missing or empty. The message is the
    /// form-level sentence shown to the operator.
    #[error("{message}")]
    MissingFields { message: String },

    /// A single required field is missing or empty.
    #[error("{field} is required.")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters.")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters.")]
    TooLong { field: String, max: usize },

    /// Value is below the allowed minimum.
    #[error("{field} must be at least {min}.")]
    BelowMinimum { field: String, min: String },

    /// Value must not be negative.
    #[error("{field} must be 0 or greater.")]
    Negative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}.")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid date, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Creates a form-level "fields required" error.
    pub fn missing(message: impl Into<String>) -> Self {
        ValidationError::MissingFields {
            message: message.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
