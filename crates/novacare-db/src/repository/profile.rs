//! # Profile Repository
//!
//! Operator profiles. Rows are created by the `auth_users` trigger on
//! sign-up; this repository only reads, edits and deletes them.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use novacare_core::types::{Profile, Role};

/// Row shape of the `profiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        Profile {
            id: record.id,
            email: record.email,
            full_name: record.full_name.unwrap_or_default(),
            role: record.role,
            created_at: record.created_at,
        }
    }
}

/// Repository for profile rows.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProfileRepository { pool }
    }

    /// Gets a profile by its auth ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Profile>> {
        let record: Option<ProfileRecord> = sqlx::query_as(
            "SELECT id, email, full_name, role, created_at FROM profiles WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Profile::from))
    }

    /// Lists every profile, newest first.
    pub async fn list(&self) -> DbResult<Vec<Profile>> {
        let records: Vec<ProfileRecord> = sqlx::query_as(
            r#"
            SELECT id, email, full_name, role, created_at
            FROM profiles
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = records.len(), "Listed profiles");
        Ok(records.into_iter().map(Profile::from).collect())
    }

    /// Updates name, role and email.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no profile with that ID
    pub async fn update(
        &self,
        id: &str,
        full_name: &str,
        role: Role,
        email: Option<&str>,
    ) -> DbResult<Profile> {
        debug!(id = %id, role = role.as_str(), "Updating profile");

        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET
                full_name = ?2,
                role = ?3,
                email = COALESCE(?4, email)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(role)
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Profile", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Profile", id))
    }

    /// Deletes a profile. The auth account is left in place, so the identity
    /// can still authenticate but no longer has a profile.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no profile with that ID
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting profile");

        let result = sqlx::query("DELETE FROM profiles WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Profile", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
