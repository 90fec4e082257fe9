//! # Permission Repository
//!
//! Page permissions in either of the two storage shapes a deployment may
//! have.
//!
//! ## Storage Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Keyed table (preferred)              Embedded column                  │
//! │  ─────────────────────────            ──────────────────────────        │
//! │  staff_permissions                    profiles.permissions             │
//! │    user_id   PK → profiles.id           JSON text:                     │
//! │    dashboard INTEGER NULL               {"dashboard":true,             │
//! │    pos       INTEGER NULL                "settings":false, ...}        │
//! │    inventory INTEGER NULL                                              │
//! │    finance   INTEGER NULL                                              │
//! │    settings  INTEGER NULL                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads return the raw JSON value (NULL flags become JSON `null`) and leave
//! normalization to `novacare_core::normalize_permissions`. Missing tables and
//! columns surface as `DbError::UndefinedRelation` / `DbError::UndefinedColumn`
//! so the caller can pick another shape.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use novacare_core::permissions::{PageKey, Permissions};

/// Row shape of the `staff_permissions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PermissionRecord {
    pub user_id: String,
    pub dashboard: Option<bool>,
    pub pos: Option<bool>,
    pub inventory: Option<bool>,
    pub finance: Option<bool>,
    pub settings: Option<bool>,
}

impl PermissionRecord {
    /// Raw JSON object form. NULL flags become `null`.
    pub fn to_raw(&self) -> Value {
        let flag = |value: Option<bool>| value.map(Value::Bool).unwrap_or(Value::Null);
        let mut map = Map::new();
        map.insert(PageKey::Dashboard.as_str().to_string(), flag(self.dashboard));
        map.insert(PageKey::Pos.as_str().to_string(), flag(self.pos));
        map.insert(PageKey::Inventory.as_str().to_string(), flag(self.inventory));
        map.insert(PageKey::Finance.as_str().to_string(), flag(self.finance));
        map.insert(PageKey::Settings.as_str().to_string(), flag(self.settings));
        Value::Object(map)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct EmbeddedPermissionRecord {
    id: String,
    permissions: Option<String>,
}

/// Repository for permission storage.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: SqlitePool,
}

impl PermissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PermissionRepository { pool }
    }

    // =========================================================================
    // Probes
    // =========================================================================

    /// Succeeds when the keyed table is readable.
    pub async fn probe_table(&self) -> DbResult<()> {
        sqlx::query("SELECT user_id FROM staff_permissions LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }

    /// Succeeds when the embedded column is readable.
    pub async fn probe_column(&self) -> DbResult<()> {
        sqlx::query("SELECT permissions FROM profiles LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Keyed Table
    // =========================================================================

    /// Reads one keyed row. `None` when the user has no row.
    pub async fn table_get(&self, user_id: &str) -> DbResult<Option<Value>> {
        let record: Option<PermissionRecord> = sqlx::query_as(
            r#"
            SELECT user_id, dashboard, pos, inventory, finance, settings
            FROM staff_permissions
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.to_raw()))
    }

    /// Reads every keyed row, keyed by user ID.
    pub async fn table_all(&self) -> DbResult<HashMap<String, Value>> {
        let records: Vec<PermissionRecord> = sqlx::query_as(
            "SELECT user_id, dashboard, pos, inventory, finance, settings FROM staff_permissions",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|r| {
                let raw = r.to_raw();
                (r.user_id, raw)
            })
            .collect())
    }

    /// Inserts or replaces the keyed row for `user_id`.
    pub async fn table_upsert(&self, user_id: &str, permissions: &Permissions) -> DbResult<()> {
        debug!(user_id = %user_id, "Upserting permission row");

        sqlx::query(
            r#"
            INSERT INTO staff_permissions (
                user_id, dashboard, pos, inventory, finance, settings, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (user_id) DO UPDATE SET
                dashboard = excluded.dashboard,
                pos = excluded.pos,
                inventory = excluded.inventory,
                finance = excluded.finance,
                settings = excluded.settings,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(permissions.dashboard)
        .bind(permissions.pos)
        .bind(permissions.inventory)
        .bind(permissions.finance)
        .bind(permissions.settings)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes the keyed row. Returns the number of rows removed.
    pub async fn table_delete(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM staff_permissions WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Embedded Column
    // =========================================================================

    /// Reads the embedded value. `None` when the profile is missing or the
    /// column is NULL.
    pub async fn column_get(&self, user_id: &str) -> DbResult<Option<Value>> {
        let record: Option<EmbeddedPermissionRecord> =
            sqlx::query_as("SELECT id, permissions FROM profiles WHERE id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record.and_then(|r| parse_embedded(&r.id, r.permissions)))
    }

    /// Reads every non-NULL embedded value, keyed by profile ID.
    pub async fn column_all(&self) -> DbResult<HashMap<String, Value>> {
        let records: Vec<EmbeddedPermissionRecord> =
            sqlx::query_as("SELECT id, permissions FROM profiles")
                .fetch_all(&self.pool)
                .await?;

        Ok(records
            .into_iter()
            .filter_map(|r| parse_embedded(&r.id, r.permissions).map(|raw| (r.id, raw)))
            .collect())
    }

    /// Writes the embedded value.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no profile with that ID
    pub async fn column_update(&self, user_id: &str, permissions: &Permissions) -> DbResult<()> {
        debug!(user_id = %user_id, "Updating embedded permissions");

        let result = sqlx::query("UPDATE profiles SET permissions = ?2 WHERE id = ?1")
            .bind(user_id)
            .bind(permissions.to_raw().to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Profile", user_id));
        }

        Ok(())
    }
}

/// Unparseable text is treated as absent; normalization then applies defaults.
fn parse_embedded(user_id: &str, text: Option<String>) -> Option<Value> {
    let text = text?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(user_id = %user_id, error = %err, "Ignoring malformed permissions JSON");
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
