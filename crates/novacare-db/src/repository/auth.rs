//! # Auth Account Repository
//!
//! Local email/password accounts. Passwords are stored as argon2 PHC
//! strings; the plaintext never reaches the database.
//!
//! Inserting an account fires the `auth_users` trigger, which creates the
//! matching staff profile in the same statement.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// An authenticated identity, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthAccount {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AuthUserRecord {
    id: String,
    email: String,
    password_hash: String,
    full_name: String,
    created_at: DateTime<Utc>,
}

impl From<AuthUserRecord> for AuthAccount {
    fn from(record: AuthUserRecord) -> Self {
        AuthAccount {
            id: record.id,
            email: record.email,
            full_name: record.full_name,
            created_at: record.created_at,
        }
    }
}

/// Repository for local auth accounts.
#[derive(Debug, Clone)]
pub struct AuthRepository {
    pool: SqlitePool,
}

impl AuthRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuthRepository { pool }
    }

    /// Creates an account. `email` is stored as given; callers normalize it.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the email already has an account
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> DbResult<AuthAccount> {
        let account = AuthAccount {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            created_at: Utc::now(),
        };
        let password_hash = hash_password(password)?;

        debug!(id = %account.id, email = %account.email, "Creating auth account");

        sqlx::query(
            r#"
            INSERT INTO auth_users (id, email, password_hash, full_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&password_hash)
        .bind(&account.full_name)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: account.email.clone(),
            },
            other => other,
        })?;

        Ok(account)
    }

    /// Checks a password against the stored hash.
    ///
    /// ## Returns
    /// * `Ok(Some(account))` - credentials match
    /// * `Ok(None)` - unknown email or wrong password
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> DbResult<Option<AuthAccount>> {
        let record: Option<AuthUserRecord> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, full_name, created_at
            FROM auth_users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            debug!(email = %email, "Sign-in for unknown email");
            return Ok(None);
        };

        if !verify_password(password, &record.password_hash) {
            warn!(email = %email, "Sign-in with wrong password");
            return Ok(None);
        }

        Ok(Some(AuthAccount::from(record)))
    }

    /// Gets an account by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<AuthAccount>> {
        let record: Option<AuthUserRecord> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, full_name, created_at
            FROM auth_users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(AuthAccount::from))
    }
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password for storage (argon2id, random salt).
pub fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================
