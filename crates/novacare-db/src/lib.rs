//! # novacare-db: Database Layer for NovaCare Pharmacy POS
//!
//! This crate provides database access for the NovaCare pharmacy POS.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        NovaCare Data Flow                               │
//! │                                                                         │
//! │  SqliteBackend (apps/pharmacy) ── implements the store traits          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   novacare-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ MedicineRepo   │   │              │  │   │
//! │  │   │ SqlitePool    │    │ TransactionRepo│   │ 001_init.sql │  │   │
//! │  │   │ Connection    │◄───│ ProfileRepo    │   │ 002_trigger  │  │   │
//! │  │   │ Management    │    │ PermissionRepo │   │ 003_perms    │  │   │
//! │  │   │               │    │ SettingsRepo   │   │              │  │   │
//! │  │   │               │    │ AuthRepo       │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/novacare/novacare.db                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (medicine, transaction, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use novacare_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/novacare.db")).await?;
//!
//! let medicines = db.medicines().list().await?;
//! let settings = db.settings().latest().await?.unwrap_or_default();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::auth::{AuthAccount, AuthRepository};
pub use repository::medicine::MedicineRepository;
pub use repository::permission::PermissionRepository;
pub use repository::profile::ProfileRepository;
pub use repository::settings::SettingsRepository;
pub use repository::transaction::TransactionRepository;
