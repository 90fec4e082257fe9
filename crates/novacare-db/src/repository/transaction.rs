//! # Transaction Repository
//!
//! Sale history and the atomic sale procedure.
//!
//! ## Sale Procedure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    complete_sale (one DB transaction)                   │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    │                                                                    │
//! │    ├── for each requested line:                                         │
//! │    │     ├── UPDATE medicines                                           │
//! │    │     │   SET stock = stock - qty                                    │
//! │    │     │   WHERE id = ? AND stock >= qty                              │
//! │    │     ├── load medicine ────────── missing  → NotFound   ─┐          │
//! │    │     ├── expiry < today ───────── expired  → Expired    ─┤          │
//! │    │     └── 0 rows decremented ───────────── → Insufficient ┤          │
//! │    │                                                         │          │
//! │    ├── read latest settings (tax rate, inclusive flag)       │          │
//! │    ├── price lines with the stored unit prices               │          │
//! │    ├── INSERT transactions                                   │          │
//! │    ├── INSERT transaction_items (price frozen)               ▼          │
//! │    │                                              drop tx → ROLLBACK    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of the transaction is a write, so SQLite takes the
//! write lock up front (waiting out `busy_timeout` behind other counters)
//! instead of failing to upgrade a read snapshot with `database is locked`.
//!
//! The conditional decrement is what keeps stock non-negative when two
//! counters sell the last units at the same time: the second decrement
//! matches no row and the whole sale rolls back.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::settings::latest_in;
use novacare_core::cart::SaleTotals;
use novacare_core::money::Money;
use novacare_core::types::{
    PaymentMethod, SaleRequest, Settings, Transaction, TransactionItem, FALLBACK_ITEM_NAME,
    FALLBACK_ITEM_SKU,
};

/// Row shape of the `transactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub total_cents: i64,
    pub tax_cents: i64,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

/// A transaction line joined with the current medicine name and SKU.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionItemRecord {
    pub transaction_id: String,
    pub medicine_id: Option<String>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub qty: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<TransactionItemRecord> for TransactionItem {
    fn from(record: TransactionItemRecord) -> Self {
        TransactionItem {
            medicine_id: record.medicine_id,
            name: record
                .name
                .unwrap_or_else(|| FALLBACK_ITEM_NAME.to_string()),
            sku: record.sku.unwrap_or_else(|| FALLBACK_ITEM_SKU.to_string()),
            qty: record.qty,
            unit_price_cents: record.unit_price_cents,
            line_total_cents: record.line_total_cents,
        }
    }
}

/// Medicine columns the sale procedure needs.
#[derive(Debug, sqlx::FromRow)]
struct SaleMedicineRow {
    name: String,
    price_cents: i64,
    expiry: Option<NaiveDate>,
}

/// Repository for transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Lists every transaction, newest first, with its lines.
    ///
    /// Lines whose medicine was deleted carry the fallback name and SKU.
    pub async fn list(&self) -> DbResult<Vec<Transaction>> {
        let records: Vec<TransactionRecord> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_cents, tax_cents, payment_method, created_at
            FROM transactions
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<TransactionItemRecord> = sqlx::query_as(
            r#"
            SELECT
                ti.transaction_id,
                ti.medicine_id,
                m.name,
                m.sku,
                ti.qty,
                ti.unit_price_cents,
                ti.line_total_cents
            FROM transaction_items ti
            LEFT JOIN medicines m ON m.id = ti.medicine_id
            ORDER BY ti.transaction_id, ti.line_no
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_transaction: HashMap<String, Vec<TransactionItem>> = HashMap::new();
        for item in items {
            by_transaction
                .entry(item.transaction_id.clone())
                .or_default()
                .push(TransactionItem::from(item));
        }

        debug!(count = records.len(), "Listed transactions");

        Ok(records
            .into_iter()
            .map(|record| {
                let items = by_transaction.remove(&record.id).unwrap_or_default();
                assemble(record, items)
            })
            .collect())
    }

    /// Gets a transaction by ID, with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let record: Option<TransactionRecord> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_cents, tax_cents, payment_method, created_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let items: Vec<TransactionItemRecord> = sqlx::query_as(
            r#"
            SELECT
                ti.transaction_id,
                ti.medicine_id,
                m.name,
                m.sku,
                ti.qty,
                ti.unit_price_cents,
                ti.line_total_cents
            FROM transaction_items ti
            LEFT JOIN medicines m ON m.id = ti.medicine_id
            WHERE ti.transaction_id = ?1
            ORDER BY ti.line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(assemble(
            record,
            items.into_iter().map(TransactionItem::from).collect(),
        )))
    }

    /// Completes a sale atomically.
    ///
    /// ## Arguments
    /// * `user_id` - profile of the operator, recorded on the transaction
    /// * `request` - payment method and `(medicine_id, qty)` lines
    /// * `today` - date used for the expiry check
    ///
    /// ## Returns
    /// The stored transaction. Prices and totals come from the stored rows,
    /// never from the request.
    ///
    /// ## Errors
    /// Any error leaves the database untouched:
    /// * `DbError::InvalidInput` - no lines, or a non-positive quantity
    /// * `DbError::NotFound` - a line references a missing medicine
    /// * `DbError::ExpiredMedicine` - a line references an expired medicine
    /// * `DbError::InsufficientStock` - a decrement would go below zero
    pub async fn complete_sale(
        &self,
        user_id: Option<&str>,
        request: &SaleRequest,
        today: NaiveDate,
    ) -> DbResult<Transaction> {
        if request.items.is_empty() {
            return Err(DbError::InvalidInput(
                "Add medicines to complete a sale.".to_string(),
            ));
        }
        if let Some(line) = request.items.iter().find(|line| line.qty <= 0) {
            return Err(DbError::InvalidInput(format!(
                "Quantity must be at least 1 for {}.",
                line.medicine_id
            )));
        }

        debug!(
            lines = request.items.len(),
            payment_method = request.payment_method.as_str(),
            "Starting sale"
        );

        let mut tx = self.pool.begin().await?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let decremented = sqlx::query(
                "UPDATE medicines SET stock = stock - ?2 WHERE id = ?1 AND stock >= ?2",
            )
            .bind(&line.medicine_id)
            .bind(line.qty)
            .execute(&mut *tx)
            .await?;

            let medicine: SaleMedicineRow =
                sqlx::query_as("SELECT name, price_cents, expiry FROM medicines WHERE id = ?1")
                    .bind(&line.medicine_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| DbError::not_found("Medicine", &line.medicine_id))?;

            if matches!(medicine.expiry, Some(expiry) if expiry < today) {
                return Err(DbError::ExpiredMedicine {
                    name: medicine.name,
                });
            }

            if decremented.rows_affected() == 0 {
                return Err(DbError::InsufficientStock {
                    name: medicine.name,
                });
            }

            let unit_price = Money::from_cents(medicine.price_cents);
            items.push(TransactionItem {
                medicine_id: Some(line.medicine_id.clone()),
                name: medicine.name,
                sku: String::new(),
                qty: line.qty,
                unit_price_cents: unit_price.cents(),
                line_total_cents: (unit_price * line.qty).cents(),
            });
        }

        let settings = latest_in(&mut *tx).await?.unwrap_or_else(Settings::default);
        let totals = SaleTotals::for_lines(
            items
                .iter()
                .map(|item| (Money::from_cents(item.unit_price_cents), item.qty)),
            &settings,
        );

        let transaction_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, total_cents, tax_cents, payment_method, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&transaction_id)
        .bind(user_id)
        .bind(totals.total.cents())
        .bind(totals.tax.cents())
        .bind(request.payment_method)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        for (line_no, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, medicine_id, line_no,
                    qty, unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&transaction_id)
            .bind(&item.medicine_id)
            .bind(line_no as i64)
            .bind(item.qty)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %transaction_id,
            total_cents = totals.total.cents(),
            tax_cents = totals.tax.cents(),
            "Sale completed"
        );

        self.get_by_id(&transaction_id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", &transaction_id))
    }

    /// Counts total transactions.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn assemble(record: TransactionRecord, items: Vec<TransactionItem>) -> Transaction {
    Transaction {
        id: record.id,
        user_id: record.user_id,
        total_cents: record.total_cents,
        tax_cents: record.tax_cents,
        payment_method: record.payment_method,
        created_at: record.created_at,
        items,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
