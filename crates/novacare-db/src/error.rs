//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (pharmacy ports) ← Uniform collaborator error              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError ← Serialized for the view layer                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Schema Shape Errors
//! The permission store probes for optional schema objects. SQLite reports a
//! missing table as `no such table: x` and a missing column as
//! `no such column: x`; both are classified here so callers can demote to the
//! next storage shape instead of failing.

use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    /// - A sale references a deleted medicine
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting duplicate SKU
    /// - Registering an email that already has an account
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation {
        field: String,
        value: String,
    },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation {
        message: String,
    },

    /// The referenced table does not exist in this deployment.
    #[error("Undefined relation: {0}")]
    UndefinedRelation(String),

    /// The referenced column does not exist in this deployment.
    #[error("Undefined column: {0}")]
    UndefinedColumn(String),

    /// Access to the object was refused.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Conditional stock decrement affected no row.
    #[error("Insufficient stock for {name}.")]
    InsufficientStock {
        name: String,
    },

    /// A sale line references an expired medicine.
    #[error("{name} is expired and cannot be sold.")]
    ExpiredMedicine {
        name: String,
    },

    /// Input rejected before touching the database.
    #[error("{0}")]
    InvalidInput(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Migration version conflict
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the error means an optional schema object is absent.
    pub fn is_schema_missing(&self) -> bool {
        matches!(
            self,
            DbError::UndefinedRelation(_) | DbError::UndefinedColumn(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint / schema type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => classify_message(db_err.message()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Maps a SQLite error message onto a [`DbError`] variant.
///
/// SQLite messages:
/// - `UNIQUE constraint failed: <table>.<column>`
/// - `FOREIGN KEY constraint failed`
/// - `no such table: <table>`
/// - `no such column: <column>` (also `table x has no column named y` on insert)
/// - `not authorized`
fn classify_message(msg: &str) -> DbError {
    if let Some(field) = msg.split("UNIQUE constraint failed: ").nth(1) {
        DbError::UniqueViolation {
            field: field.to_string(),
            value: "unknown".to_string(),
        }
    } else if msg.contains("FOREIGN KEY constraint failed") {
        DbError::ForeignKeyViolation {
            message: msg.to_string(),
        }
    } else if let Some(table) = msg.split("no such table: ").nth(1) {
        DbError::UndefinedRelation(table.to_string())
    } else if let Some(column) = msg.split("no such column: ").nth(1) {
        DbError::UndefinedColumn(column.to_string())
    } else if msg.contains("has no column named") {
        DbError::UndefinedColumn(msg.to_string())
    } else if msg.contains("not authorized") {
        DbError::PermissionDenied(msg.to_string())
    } else {
        DbError::QueryFailed(msg.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_schema_messages() {
        assert!(matches!(
            classify_message("no such table: staff_permissions"),
            DbError::UndefinedRelation(t) if t == "staff_permissions"
        ));
        assert!(matches!(
            classify_message("no such column: permissions"),
            DbError::UndefinedColumn(c) if c == "permissions"
        ));
        assert!(classify_message("table profiles has no column named permissions")
            .is_schema_missing());
    }

    #[test]
    fn test_classify_constraint_messages() {
        assert!(matches!(
            classify_message("UNIQUE constraint failed: medicines.sku"),
            DbError::UniqueViolation { field, .. } if field == "medicines.sku"
        ));
        assert!(matches!(
            classify_message("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(
            classify_message("disk I/O error"),
            DbError::QueryFailed(_)
        ));
    }

    #[test]
    fn test_sale_error_messages() {
        let err = DbError::InsufficientStock {
            name: "Amoxicillin".to_string(),
        };
        assert_eq!(err.to_string(), "Insufficient stock for Amoxicillin.");

        let err = DbError::ExpiredMedicine {
            name: "Cough Syrup".to_string(),
        };
        assert_eq!(err.to_string(), "Cough Syrup is expired and cannot be sold.");
    }
}
