//! # Repository Module
//!
//! Database repository implementations for NovaCare Pharmacy POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  SqliteBackend (store trait impl)                                      │
//! │       │                                                                 │
//! │       │  db.medicines().list()                                          │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  MedicineRepository                                                    │
//! │  ├── list(&self)                                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, medicine)                                           │
//! │  └── update(&self, medicine)                                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (mock the repository)                                  │
//! │  • SQL is isolated in one place                                        │
//! │  • Can swap database implementations                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`MedicineRepository`](medicine::MedicineRepository) - Medicine catalogue CRUD
//! - [`TransactionRepository`](transaction::TransactionRepository) - Sale history and the atomic sale procedure
//! - [`ProfileRepository`](profile::ProfileRepository) - Operator profiles
//! - [`PermissionRepository`](permission::PermissionRepository) - Page permissions in either storage shape
//! - [`SettingsRepository`](settings::SettingsRepository) - Store settings
//! - [`AuthRepository`](auth::AuthRepository) - Local auth accounts

pub mod auth;
pub mod medicine;
pub mod permission;
pub mod profile;
pub mod settings;
pub mod transaction;

// =============================================================================
// Test Support
// =============================================================================
