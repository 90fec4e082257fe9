//! # Settings Repository
//!
//! Store-wide settings. The table may hold several rows; the most recently
//! updated one is authoritative.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use novacare_core::types::{Settings, TaxRate};

const SETTINGS_COLUMNS: &str = "id, store_name, currency, tax_rate_bps, prices_include_tax, \
     address, phone, support_email, updated_at";

/// Row shape of the `settings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettingsRecord {
    pub id: String,
    pub store_name: String,
    pub currency: String,
    pub tax_rate_bps: i64,
    pub prices_include_tax: bool,
    pub address: String,
    pub phone: String,
    pub support_email: String,
    pub updated_at: DateTime<Utc>,
}

impl From<SettingsRecord> for Settings {
    fn from(record: SettingsRecord) -> Self {
        Settings {
            id: Some(record.id),
            store_name: record.store_name,
            currency: record.currency,
            tax_rate: TaxRate::from_bps(record.tax_rate_bps.clamp(0, 10_000) as u32),
            prices_include_tax: record.prices_include_tax,
            address: record.address,
            phone: record.phone,
            support_email: record.support_email,
            updated_at: Some(record.updated_at),
        }
    }
}

/// Repository for settings rows.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Returns the most recently updated settings row, if any.
    pub async fn latest(&self) -> DbResult<Option<Settings>> {
        latest_in(&self.pool).await
    }

    /// Updates the row with `settings.id`.
    ///
    /// ## Returns
    /// * `Ok(Some(settings))` - the stored row, `updated_at` set to now
    /// * `Ok(None)` - `settings.id` is empty or matches no row
    pub async fn update(&self, settings: &Settings) -> DbResult<Option<Settings>> {
        let Some(id) = settings.id.as_deref() else {
            return Ok(None);
        };

        debug!(id = %id, "Updating settings");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE settings
            SET
                store_name = ?2,
                currency = ?3,
                tax_rate_bps = ?4,
                prices_include_tax = ?5,
                address = ?6,
                phone = ?7,
                support_email = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&settings.store_name)
        .bind(&settings.currency)
        .bind(settings.tax_rate.bps() as i64)
        .bind(settings.prices_include_tax)
        .bind(&settings.address)
        .bind(&settings.phone)
        .bind(&settings.support_email)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(Settings {
            id: Some(id.to_string()),
            updated_at: Some(now),
            ..settings.clone()
        }))
    }

    /// Inserts a new settings row with a fresh ID.
    pub async fn insert(&self, settings: &Settings) -> DbResult<Settings> {
        let stored = Settings {
            id: Some(Uuid::new_v4().to_string()),
            updated_at: Some(Utc::now()),
            ..settings.clone()
        };

        debug!(id = ?stored.id, "Inserting settings");

        sqlx::query(
            r#"
            INSERT INTO settings (
                id, store_name, currency, tax_rate_bps, prices_include_tax,
                address, phone, support_email, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.store_name)
        .bind(&stored.currency)
        .bind(stored.tax_rate.bps() as i64)
        .bind(stored.prices_include_tax)
        .bind(&stored.address)
        .bind(&stored.phone)
        .bind(&stored.support_email)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }
}

/// Latest settings row, read through any executor.
///
/// The sale procedure calls this inside its database transaction so totals
/// are priced with the settings visible to that transaction.
pub(crate) async fn latest_in<'e, E>(executor: E) -> DbResult<Option<Settings>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {SETTINGS_COLUMNS} FROM settings ORDER BY updated_at DESC LIMIT 1"
    );
    let record: Option<SettingsRecord> = sqlx::query_as(&sql).fetch_optional(executor).await?;
    Ok(record.map(Settings::from))
}

// =============================================================================
// Unit Tests
// =============================================================================
