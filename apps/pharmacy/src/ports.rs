//! # Collaborator Ports
//!
//! Traits for everything the application talks to but does not own: the
//! auth provider, the stores and the atomic sale procedure.
//!
//! ## Seams
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AppController                                    │
//! │                                                                         │
//! │   Arc<dyn AuthProvider>      sign in/out, session, auth events          │
//! │   Arc<dyn ProfileStore>      operator profiles                          │
//! │   Arc<dyn PermissionStore>   keyed table OR embedded column             │
//! │   Arc<dyn InventoryStore>    medicines                                  │
//! │   Arc<dyn TransactionStore>  sales history with nested items            │
//! │   Arc<dyn SaleProcedure>     atomic stock decrement + sale insert       │
//! │   Arc<dyn SettingsStore>     store settings rows                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                │                                   │
//!                ▼                                   ▼
//!      backend::SqliteBackend              backend::LocalAuthProvider
//! ```
//!
//! Every method reports failures as [`StoreError`]. Its `Display` text is
//! shown to the operator verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use novacare_core::permissions::Permissions;
use novacare_core::types::{
    Medicine, MedicineUpdate, NewMedicine, Profile, Role, SaleRequest, Settings, Transaction,
};

// =============================================================================
// Auth Types
// =============================================================================

/// An authenticated identity as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Auth state change pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        AuthEvent { kind, session }
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// Uniform collaborator error.
///
/// The schema variants drive the permission backend resolver; the rest map
/// onto API error codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A table the query needs does not exist.
    #[error("{0}")]
    UndefinedRelation(String),

    /// A column the query needs does not exist.
    #[error("{0}")]
    UndefinedColumn(String),

    /// The relation exists but the caller may not read or write it.
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    /// Stock changed underneath a sale.
    #[error("{0}")]
    StockConflict(String),

    /// The backend refused the request for a business reason.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Auth Provider
// =============================================================================

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Password sign-in. Emits `SignedIn` on success.
    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session>;

    /// Ends the current session. Emits `SignedOut`.
    async fn sign_out(&self) -> StoreResult<()>;

    async fn current_session(&self) -> StoreResult<Option<Session>>;

    /// Receiver for auth state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// A client that never persists or emits into this client's session.
    fn create_isolated_client(&self) -> Arc<dyn AuthProvider>;

    /// Registers a new identity and returns its user ID. Only called on
    /// isolated clients.
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> StoreResult<String>;
}

// =============================================================================
// Stores
// =============================================================================

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>>;

    /// Updates name and role, and the email when given.
    async fn update_profile(
        &self,
        id: &str,
        full_name: &str,
        role: Role,
        email: Option<&str>,
    ) -> StoreResult<Profile>;

    /// Every profile, newest first.
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;

    async fn delete_profile(&self, id: &str) -> StoreResult<()>;
}

/// Raw permission storage in either shape.
///
/// Reads return the stored JSON object untouched; normalization is the
/// resolver's job.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn probe_table(&self) -> StoreResult<()>;
    async fn probe_column(&self) -> StoreResult<()>;

    async fn table_get(&self, user_id: &str) -> StoreResult<Option<Value>>;
    async fn table_all(&self) -> StoreResult<HashMap<String, Value>>;
    async fn table_upsert(&self, user_id: &str, permissions: &Permissions) -> StoreResult<()>;
    async fn table_delete(&self, user_id: &str) -> StoreResult<()>;

    async fn column_get(&self, user_id: &str) -> StoreResult<Option<Value>>;
    async fn column_all(&self) -> StoreResult<HashMap<String, Value>>;
    async fn column_update(&self, user_id: &str, permissions: &Permissions) -> StoreResult<()>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Every medicine ordered by name.
    async fn list_medicines(&self) -> StoreResult<Vec<Medicine>>;
    async fn insert_medicine(&self, input: &NewMedicine) -> StoreResult<Medicine>;
    async fn update_medicine(&self, input: &MedicineUpdate) -> StoreResult<Medicine>;
    async fn delete_medicine(&self, id: &str) -> StoreResult<()>;
    async fn delete_all_medicines(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Every transaction newest first, items nested with denormalized
    /// medicine name and SKU.
    async fn list_transactions(&self) -> StoreResult<Vec<Transaction>>;
}

/// The atomic sale. Either every line is decremented and the sale recorded,
/// or nothing changes.
#[async_trait]
pub trait SaleProcedure: Send + Sync {
    /// Returns the new transaction ID.
    async fn complete_sale(
        &self,
        user_id: Option<&str>,
        request: &SaleRequest,
    ) -> StoreResult<String>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Most recently updated row.
    async fn latest_settings(&self) -> StoreResult<Option<Settings>>;

    /// Updates the row with `settings.id`. `None` when there is no such row.
    async fn update_settings(&self, settings: &Settings) -> StoreResult<Option<Settings>>;

    async fn insert_settings(&self, settings: &Settings) -> StoreResult<Settings>;
}
