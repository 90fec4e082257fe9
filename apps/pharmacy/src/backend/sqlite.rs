//! # SQLite Backend
//!
//! Implements every store port and the sale procedure over
//! [`novacare_db::Database`].
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────────────────────┐
//! │  ports::*Store       │ ───► │  SqliteBackend                       │
//! │  ports::SaleProcedure│      │    db.medicines()    InventoryStore  │
//! └──────────────────────┘      │    db.transactions() Transaction/Sale│
//!                               │    db.profiles()     ProfileStore    │
//!                               │    db.permissions()  PermissionStore │
//!                               │    db.settings()     SettingsStore   │
//!                               └──────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::error;

use crate::ports::{
    InventoryStore, PermissionStore, ProfileStore, SaleProcedure, SettingsStore, StoreError,
    StoreResult, TransactionStore,
};
use novacare_core::permissions::Permissions;
use novacare_core::types::{
    Medicine, MedicineUpdate, NewMedicine, Profile, Role, SaleRequest, Settings, Transaction,
};
use novacare_db::{Database, DbError};

/// Converts database errors to collaborator errors.
///
/// ## Mapping
/// ```text
/// UndefinedRelation / UndefinedColumn ─► same (drives backend demotion)
/// InsufficientStock ───────────────────► StockConflict
/// ExpiredMedicine / InvalidInput ──────► Rejected
/// connection / query / pool / internal ► Backend (logged)
/// ```
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UndefinedRelation(_) => StoreError::UndefinedRelation(err.to_string()),
            DbError::UndefinedColumn(_) => StoreError::UndefinedColumn(err.to_string()),
            DbError::PermissionDenied(_) => StoreError::PermissionDenied(err.to_string()),
            DbError::NotFound { .. } => StoreError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => StoreError::Duplicate(err.to_string()),
            DbError::InsufficientStock { .. } => StoreError::StockConflict(err.to_string()),
            DbError::ExpiredMedicine { .. } | DbError::InvalidInput(_) => {
                StoreError::Rejected(err.to_string())
            }
            DbError::ForeignKeyViolation { .. }
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => {
                error!(error = %err, "Database operation failed");
                StoreError::Backend(err.to_string())
            }
        }
    }
}

/// All stores over one SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    db: Database,
}

impl SqliteBackend {
    pub fn new(db: Database) -> Self {
        SqliteBackend { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ProfileStore for SqliteBackend {
    async fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>> {
        Ok(self.db.profiles().get(id).await?)
    }

    async fn update_profile(
        &self,
        id: &str,
        full_name: &str,
        role: Role,
        email: Option<&str>,
    ) -> StoreResult<Profile> {
        Ok(self.db.profiles().update(id, full_name, role, email).await?)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        Ok(self.db.profiles().list().await?)
    }

    async fn delete_profile(&self, id: &str) -> StoreResult<()> {
        Ok(self.db.profiles().delete(id).await?)
    }
}

#[async_trait]
impl PermissionStore for SqliteBackend {
    async fn probe_table(&self) -> StoreResult<()> {
        Ok(self.db.permissions().probe_table().await?)
    }

    async fn probe_column(&self) -> StoreResult<()> {
        Ok(self.db.permissions().probe_column().await?)
    }

    async fn table_get(&self, user_id: &str) -> StoreResult<Option<Value>> {
        Ok(self.db.permissions().table_get(user_id).await?)
    }

    async fn table_all(&self) -> StoreResult<HashMap<String, Value>> {
        Ok(self.db.permissions().table_all().await?)
    }

    async fn table_upsert(&self, user_id: &str, permissions: &Permissions) -> StoreResult<()> {
        Ok(self.db.permissions().table_upsert(user_id, permissions).await?)
    }

    async fn table_delete(&self, user_id: &str) -> StoreResult<()> {
        self.db.permissions().table_delete(user_id).await?;
        Ok(())
    }

    async fn column_get(&self, user_id: &str) -> StoreResult<Option<Value>> {
        Ok(self.db.permissions().column_get(user_id).await?)
    }

    async fn column_all(&self) -> StoreResult<HashMap<String, Value>> {
        Ok(self.db.permissions().column_all().await?)
    }

    async fn column_update(&self, user_id: &str, permissions: &Permissions) -> StoreResult<()> {
        Ok(self.db.permissions().column_update(user_id, permissions).await?)
    }
}

#[async_trait]
impl InventoryStore for SqliteBackend {
    async fn list_medicines(&self) -> StoreResult<Vec<Medicine>> {
        Ok(self.db.medicines().list().await?)
    }

    async fn insert_medicine(&self, input: &NewMedicine) -> StoreResult<Medicine> {
        self.db.medicines().insert(input).await.map_err(|e| match e {
            DbError::UniqueViolation { value, .. } => {
                StoreError::Duplicate(format!("A medicine with SKU {} already exists.", value))
            }
            other => other.into(),
        })
    }

    async fn update_medicine(&self, input: &MedicineUpdate) -> StoreResult<Medicine> {
        Ok(self.db.medicines().update(input).await?)
    }

    async fn delete_medicine(&self, id: &str) -> StoreResult<()> {
        Ok(self.db.medicines().delete(id).await?)
    }

    async fn delete_all_medicines(&self) -> StoreResult<u64> {
        Ok(self.db.medicines().delete_all().await?)
    }
}

#[async_trait]
impl TransactionStore for SqliteBackend {
    async fn list_transactions(&self) -> StoreResult<Vec<Transaction>> {
        Ok(self.db.transactions().list().await?)
    }
}

#[async_trait]
impl SaleProcedure for SqliteBackend {
    async fn complete_sale(
        &self,
        user_id: Option<&str>,
        request: &SaleRequest,
    ) -> StoreResult<String> {
        let today = Utc::now().date_naive();
        let transaction = self
            .db
            .transactions()
            .complete_sale(user_id, request, today)
            .await?;
        Ok(transaction.id)
    }
}

#[async_trait]
impl SettingsStore for SqliteBackend {
    async fn latest_settings(&self) -> StoreResult<Option<Settings>> {
        Ok(self.db.settings().latest().await?)
    }

    async fn update_settings(&self, settings: &Settings) -> StoreResult<Option<Settings>> {
        Ok(self.db.settings().update(settings).await?)
    }

    async fn insert_settings(&self, settings: &Settings) -> StoreResult<Settings> {
        Ok(self.db.settings().insert(settings).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
