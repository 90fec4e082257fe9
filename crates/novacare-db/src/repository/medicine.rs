//! # Medicine Repository
//!
//! Database operations for the medicine catalogue.
//!
//! ## Query Patterns
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Medicine Queries                                    │
//! │                                                                         │
//! │  list()            SELECT ... ORDER BY name ASC                         │
//! │                    (POS grid and inventory table order)                 │
//! │                                                                         │
//! │  insert()          SKU must be unique → DbError::UniqueViolation        │
//! │                                                                         │
//! │  update()          SKU is immutable; only name, category, price,        │
//! │                    stock and expiry change                              │
//! │                                                                         │
//! │  delete()          Hard delete. Transaction lines keep their frozen     │
//! │                    price; their medicine_id becomes NULL               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is only decremented by the sale procedure in
//! [`TransactionRepository`](super::transaction::TransactionRepository).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use novacare_core::types::{Medicine, MedicineUpdate, NewMedicine};

const MEDICINE_COLUMNS: &str =
    "id, sku, name, category, price_cents, stock, expiry, created_at";

/// Row shape of the `medicines` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MedicineRecord {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub expiry: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<MedicineRecord> for Medicine {
    fn from(record: MedicineRecord) -> Self {
        Medicine {
            id: record.id,
            sku: record.sku,
            name: record.name,
            category: record.category.unwrap_or_default(),
            price_cents: record.price_cents,
            stock: record.stock,
            expiry: record.expiry,
            created_at: record.created_at,
        }
        .with_default_category()
    }
}

/// Repository for medicine database operations.
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    /// Lists every medicine, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Medicine>> {
        let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines ORDER BY name ASC");
        let records: Vec<MedicineRecord> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = records.len(), "Listed medicines");
        Ok(records.into_iter().map(Medicine::from).collect())
    }

    /// Gets a medicine by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Medicine>> {
        let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1");
        let record: Option<MedicineRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Medicine::from))
    }

    /// Inserts a new medicine.
    ///
    /// ## Returns
    /// The stored medicine with its generated ID.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the SKU is already taken
    pub async fn insert(&self, input: &NewMedicine) -> DbResult<Medicine> {
        let medicine = Medicine {
            id: generate_medicine_id(),
            sku: input.sku.clone(),
            name: input.name.clone(),
            category: input.category.clone(),
            price_cents: input.price_cents,
            stock: input.stock,
            expiry: input.expiry,
            created_at: Utc::now(),
        };

        debug!(id = %medicine.id, sku = %medicine.sku, "Inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, sku, name, category, price_cents, stock, expiry, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.sku)
        .bind(&medicine.name)
        .bind(&medicine.category)
        .bind(medicine.price_cents)
        .bind(medicine.stock)
        .bind(medicine.expiry)
        .bind(medicine.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: medicine.sku.clone(),
            },
            other => other,
        })?;

        Ok(medicine.with_default_category())
    }

    /// Updates an existing medicine's editable fields.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no medicine with that ID
    pub async fn update(&self, input: &MedicineUpdate) -> DbResult<Medicine> {
        debug!(id = %input.id, "Updating medicine");

        let result = sqlx::query(
            r#"
            UPDATE medicines
            SET
                name = ?2,
                category = ?3,
                price_cents = ?4,
                stock = ?5,
                expiry = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&input.id)
        .bind(&input.name)
        .bind(&input.category)
        .bind(input.price_cents)
        .bind(input.stock)
        .bind(input.expiry)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", &input.id));
        }

        self.get_by_id(&input.id)
            .await?
            .ok_or_else(|| DbError::not_found("Medicine", &input.id))
    }

    /// Deletes a medicine.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no medicine with that ID
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting medicine");

        let result = sqlx::query("DELETE FROM medicines WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }

        Ok(())
    }

    /// Deletes every medicine. Returns the number of rows removed.
    pub async fn delete_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM medicines")
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "Cleared medicine catalogue");
        Ok(result.rows_affected())
    }

    /// Counts total medicines.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new medicine ID.
pub fn generate_medicine_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
