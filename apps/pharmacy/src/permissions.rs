//! # Permission Backend Resolver
//!
//! Finds out, once per process, where page permissions are stored and reads
//! and writes them there.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  probe staff_permissions                                                │
//! │     ├── ok / permission denied ──────────────────────► TableBacked      │
//! │     ├── undefined relation                                              │
//! │     │      probe profiles.permissions                                   │
//! │     │         ├── ok / permission denied ────────────► ColumnBacked     │
//! │     │         ├── undefined column ──────────────────► Unsupported      │
//! │     │         └── anything else ─────────────────────► Unsupported      │
//! │     └── anything else ───────────────────────────────► Unsupported      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Demotion
//! A later read or write that finds its shape missing demotes the memo one
//! step (TableBacked → ColumnBacked → Unsupported) and retries on the next
//! shape. The memo only ever moves toward Unsupported, so retry loops end.
//!
//! Nothing here blocks sign-in: every failure degrades to role defaults.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ports::{PermissionStore, StoreError, StoreResult};
use novacare_core::permissions::{normalize_permissions, Permissions};
use novacare_core::types::{Profile, Role, StaffMember};

/// Shown when permissions cannot be stored anywhere.
pub const PERMISSION_BACKEND_NONE_MESSAGE: &str =
    "Permissions storage is not configured. Run the staff_permissions migration or add profiles.permissions jsonb.";

/// Where permissions live. Ordered from most to least capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// One `staff_permissions` row per profile.
    TableBacked,
    /// JSON in `profiles.permissions`.
    ColumnBacked,
    /// Role defaults only; writes are accepted but not stored.
    Unsupported,
}

/// Result of a permission write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistOutcome {
    /// The normalized permissions that were (or would have been) written.
    pub permissions: Permissions,
    pub persisted: bool,
    /// Set when nothing was stored.
    pub message: Option<String>,
}

/// Result of a single-profile read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionLoad {
    pub permissions: Permissions,
    /// Error text to surface; the permissions are role defaults in that case.
    pub notice: Option<String>,
}

impl PermissionLoad {
    fn ok(permissions: Permissions) -> Self {
        PermissionLoad {
            permissions,
            notice: None,
        }
    }

    fn defaults(role: Role, notice: Option<String>) -> Self {
        PermissionLoad {
            permissions: normalize_permissions(None, role),
            notice,
        }
    }
}

/// Memoized backend mode plus the load/save operations on top of it.
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
    mode: Mutex<Option<BackendMode>>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        PermissionResolver {
            store,
            mode: Mutex::new(None),
        }
    }

    /// The memoized mode, probing on first use.
    ///
    /// The lock is held across the probe, so concurrent callers wait for the
    /// one in-flight probe instead of starting their own.
    pub async fn resolve(&self) -> BackendMode {
        let mut guard = self.mode.lock().await;
        if let Some(mode) = *guard {
            return mode;
        }

        let mode = self.probe().await;
        info!(?mode, "Permission backend resolved");
        *guard = Some(mode);
        mode
    }

    /// The memoized mode without probing.
    pub async fn current(&self) -> Option<BackendMode> {
        *self.mode.lock().await
    }

    async fn probe(&self) -> BackendMode {
        match self.store.probe_table().await {
            Ok(()) | Err(StoreError::PermissionDenied(_)) => BackendMode::TableBacked,
            Err(StoreError::UndefinedRelation(_)) => match self.store.probe_column().await {
                Ok(()) | Err(StoreError::PermissionDenied(_)) => BackendMode::ColumnBacked,
                Err(StoreError::UndefinedColumn(_)) => BackendMode::Unsupported,
                Err(e) => {
                    warn!(error = %e, "Permission column probe failed");
                    BackendMode::Unsupported
                }
            },
            Err(e) => {
                warn!(error = %e, "Permission table probe failed");
                BackendMode::Unsupported
            }
        }
    }

    /// Moves the memo to `to` unless it is already further along. Returns
    /// the mode now in effect.
    async fn demote(&self, to: BackendMode) -> BackendMode {
        let mut guard = self.mode.lock().await;
        let previous = *guard;
        let next = previous.map_or(to, |current| current.max(to));
        if previous != Some(next) {
            warn!(from = ?previous, to = ?next, "Demoting permission backend");
        }
        *guard = Some(next);
        next
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Permissions of one profile.
    ///
    /// Admins get full access without touching storage. A read error other
    /// than a missing shape yields role defaults plus the error text.
    pub async fn load_permissions(&self, profile: &Profile) -> PermissionLoad {
        if profile.is_admin() {
            return PermissionLoad::ok(Permissions::all());
        }

        let mut mode = self.resolve().await;
        loop {
            match mode {
                BackendMode::TableBacked => match self.store.table_get(&profile.id).await {
                    Ok(raw) => {
                        return PermissionLoad::ok(normalize_permissions(raw.as_ref(), profile.role))
                    }
                    Err(StoreError::UndefinedRelation(_)) => {
                        mode = self.demote(BackendMode::ColumnBacked).await;
                    }
                    Err(e) => return PermissionLoad::defaults(profile.role, Some(e.to_string())),
                },
                BackendMode::ColumnBacked => match self.store.column_get(&profile.id).await {
                    Ok(raw) => {
                        return PermissionLoad::ok(normalize_permissions(raw.as_ref(), profile.role))
                    }
                    Err(StoreError::UndefinedColumn(_)) => {
                        self.demote(BackendMode::Unsupported).await;
                        return PermissionLoad::defaults(profile.role, None);
                    }
                    Err(e) => return PermissionLoad::defaults(profile.role, Some(e.to_string())),
                },
                BackendMode::Unsupported => return PermissionLoad::defaults(profile.role, None),
            }
        }
    }

    /// Pairs every profile with its permissions, in the given order.
    ///
    /// ## Errors
    /// Any read error other than a missing shape.
    pub async fn load_staff_permissions(
        &self,
        profiles: Vec<Profile>,
    ) -> StoreResult<Vec<StaffMember>> {
        if profiles.is_empty() {
            return Ok(Vec::new());
        }

        let mut mode = self.resolve().await;
        let raw = loop {
            match mode {
                BackendMode::TableBacked => match self.store.table_all().await {
                    Ok(rows) => break rows,
                    Err(StoreError::UndefinedRelation(_)) => {
                        mode = self.demote(BackendMode::ColumnBacked).await;
                    }
                    Err(e) => return Err(e),
                },
                BackendMode::ColumnBacked => match self.store.column_all().await {
                    Ok(rows) => break rows,
                    Err(StoreError::UndefinedColumn(_)) => {
                        mode = self.demote(BackendMode::Unsupported).await;
                    }
                    Err(e) => return Err(e),
                },
                BackendMode::Unsupported => break Default::default(),
            }
        };

        debug!(profiles = profiles.len(), rows = raw.len(), ?mode, "Loaded staff permissions");

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let permissions = normalize_permissions(raw.get(&profile.id), profile.role);
                StaffMember {
                    profile,
                    permissions,
                }
            })
            .collect())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Stores permissions for a profile, normalized for `role` first.
    ///
    /// ## Returns
    /// * `persisted = true` - written to the active shape
    /// * `persisted = false` - no shape available; message explains
    ///
    /// ## Errors
    /// Any write error other than a missing shape.
    pub async fn persist_permissions(
        &self,
        profile_id: &str,
        role: Role,
        permissions: &Permissions,
    ) -> StoreResult<PersistOutcome> {
        let permissions = normalize_permissions(Some(&permissions.to_raw()), role);

        let mut mode = self.resolve().await;
        loop {
            match mode {
                BackendMode::TableBacked => {
                    match self.store.table_upsert(profile_id, &permissions).await {
                        Ok(()) => return Ok(persisted(permissions)),
                        Err(StoreError::UndefinedRelation(_)) => {
                            mode = self.demote(BackendMode::ColumnBacked).await;
                        }
                        Err(e) => return Err(e),
                    }
                }
                BackendMode::ColumnBacked => {
                    match self.store.column_update(profile_id, &permissions).await {
                        Ok(()) => return Ok(persisted(permissions)),
                        Err(StoreError::UndefinedColumn(_)) => {
                            mode = self.demote(BackendMode::Unsupported).await;
                        }
                        Err(e) => return Err(e),
                    }
                }
                BackendMode::Unsupported => {
                    return Ok(PersistOutcome {
                        permissions,
                        persisted: false,
                        message: Some(PERMISSION_BACKEND_NONE_MESSAGE.to_string()),
                    })
                }
            }
        }
    }

    /// Removes the keyed row of a profile. Only the table shape has rows of
    /// its own; a missing table is ignored.
    pub async fn delete_permissions(&self, profile_id: &str) -> StoreResult<()> {
        if self.resolve().await != BackendMode::TableBacked {
            return Ok(());
        }

        match self.store.table_delete(profile_id).await {
            Ok(()) | Err(StoreError::UndefinedRelation(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn persisted(permissions: Permissions) -> PersistOutcome {
    PersistOutcome {
        permissions,
        persisted: true,
        message: None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
