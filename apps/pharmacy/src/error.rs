//! # API Error Type
//!
//! Unified error type for controller intents.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in NovaCare                               │
//! │                                                                         │
//! │  View layer                  Rust Backend                               │
//! │  ──────────                  ────────────                               │
//! │                                                                         │
//! │  controller.complete_sale()                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Intent                                                          │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Form input bad? ──── ValidationError ──────────┐                │  │
//! │  │         │                                       │                │  │
//! │  │         ▼                                       ▼                │  │
//! │  │  Cart rule broken? ── CoreError ─────────────► ApiError ───────►│  │
//! │  │         │                                       ▲                │  │
//! │  │         ▼                                       │                │  │
//! │  │  Collaborator failed? ── StoreError ────────────┘                │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  The same message is also posted as an error Notice in AppState.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are operator-facing sentences and are never rewritten on the
//! way up.

use serde::Serialize;

use crate::ports::StoreError;
use novacare_core::{CoreError, ValidationError};

/// Error returned from every intent.
///
/// ## Serialization
/// ```json
/// {
///   "code": "STOCK_CONFLICT",
///   "message": "Insufficient stock for Amoxicillin 250mg."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for intent failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input rejected before (or by) the backend
    Validation,

    /// Caller's role does not allow the intent
    Unauthorized,

    /// Storage is missing a table or column the intent needs
    SchemaUnavailable,

    /// Stock changed between the cart check and the sale
    StockConflict,

    /// A sale is already being submitted
    SaleInProgress,

    NotFound,

    /// Sign-in or sign-up refused by the auth provider
    Auth,

    /// The signed-in identity has no profile; the session was ended
    ProfileMissing,

    /// Any other collaborator failure
    Backend,

    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Whether the operator can retry or correct the input and carry on.
    ///
    /// Only a missing profile (session already torn down) and internal
    /// faults are terminal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.code, ErrorCode::ProfileMissing | ErrorCode::Internal)
    }

    /// Replaces a blank message with `fallback`.
    pub fn with_fallback(mut self, fallback: &str) -> Self {
        if self.message.trim().is_empty() {
            self.message = fallback.to_string();
        }
        self
    }
}

/// Converts collaborator errors to API errors, keeping the message.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::UndefinedRelation(_) | StoreError::UndefinedColumn(_) => {
                ErrorCode::SchemaUnavailable
            }
            StoreError::PermissionDenied(_) => ErrorCode::Unauthorized,
            StoreError::NotFound(_) => ErrorCode::NotFound,
            StoreError::Duplicate(_) | StoreError::Rejected(_) => ErrorCode::Validation,
            StoreError::StockConflict(_) => ErrorCode::StockConflict,
            StoreError::Auth(_) => ErrorCode::Auth,
            StoreError::Backend(_) => ErrorCode::Backend,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MedicineNotFound(_) => ApiError::new(ErrorCode::NotFound, err.to_string()),
            CoreError::ExpiredMedicine { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::StockExceeded { .. }
            | CoreError::EmptyCart
            | CoreError::Validation(_) => ApiError::validation(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_message() {
        let err = ApiError::from(StoreError::StockConflict(
            "Insufficient stock for Zinc 50mg.".to_string(),
        ));
        assert_eq!(err.code, ErrorCode::StockConflict);
        assert_eq!(err.message, "Insufficient stock for Zinc 50mg.");
        assert!(err.is_recoverable());

        let err = ApiError::from(StoreError::UndefinedColumn("no such column: x".into()));
        assert_eq!(err.code, ErrorCode::SchemaUnavailable);
    }

    #[test]
    fn test_core_errors_are_validation() {
        let err = ApiError::from(CoreError::EmptyCart);
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Add medicines to complete a sale.");
    }

    #[test]
    fn test_terminal_codes() {
        assert!(!ApiError::new(ErrorCode::ProfileMissing, "x").is_recoverable());
        assert!(!ApiError::internal("x").is_recoverable());
        assert!(ApiError::new(ErrorCode::SaleInProgress, "x").is_recoverable());
    }

    #[test]
    fn test_serializes_screaming_code() {
        let json = serde_json::to_value(ApiError::new(ErrorCode::SaleInProgress, "busy")).unwrap();
        assert_eq!(json["code"], "SALE_IN_PROGRESS");
        assert_eq!(json["message"], "busy");
    }
}
