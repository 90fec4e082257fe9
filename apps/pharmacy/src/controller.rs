//! # App Controller
//!
//! Owns the application state and the collaborators, and exposes every
//! operator intent as an async method.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AppController                                    │
//! │                                                                         │
//! │  collaborators ── Arc<dyn ...> ports (auth, stores, sale procedure)     │
//! │  resolver ─────── PermissionResolver (memoized backend mode)            │
//! │  state ────────── RwLock<AppState>                                      │
//! │  generation ───── bumped on every session change                        │
//! │  sale_in_flight ─ re-entry guard for complete_sale                      │
//! │  session_settled  wakes callers waiting on another session load         │
//! │                                                                         │
//! │  Intents live next to their concern:                                    │
//! │    session.rs          sign_in, sign_out, bootstrap, auth listener      │
//! │    commands/cart.rs    add_to_cart, update_cart_qty, ...                │
//! │    commands/sale.rs    complete_sale, load_transactions                 │
//! │    commands/inventory  add/update/delete medicine, clear_inventory      │
//! │    commands/settings   load_settings, save_settings                     │
//! │    commands/staff      load/register/update/delete staff                │
//! │    commands/pages      access checks and read projections               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Reporting
//! Every failing intent posts an error notice with the operator-facing
//! message and also returns the [`ApiError`], so callers can either render
//! the banner or react to the result.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{Notify, RwLock};
use tracing::warn;

use crate::backend::{LocalAuthProvider, SqliteBackend};
use crate::config::SessionSettings;
use crate::error::{ApiError, ApiResult};
use crate::permissions::PermissionResolver;
use crate::ports::{
    AuthProvider, InventoryStore, PermissionStore, ProfileStore, SaleProcedure, SettingsStore,
    TransactionStore,
};
use crate::state::{AppState, Notice};
use novacare_core::types::Profile;
use novacare_db::Database;

/// Everything the controller talks to but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub sales: Arc<dyn SaleProcedure>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Collaborators {
    /// Every port served by one SQLite database.
    pub fn sqlite(db: Database) -> Self {
        let backend = Arc::new(SqliteBackend::new(db.clone()));
        Collaborators {
            auth: Arc::new(LocalAuthProvider::new(db.auth())),
            profiles: backend.clone(),
            permissions: backend.clone(),
            inventory: backend.clone(),
            transactions: backend.clone(),
            sales: backend.clone(),
            settings: backend,
        }
    }
}

pub struct AppController {
    pub(crate) collaborators: Collaborators,
    pub(crate) resolver: PermissionResolver,
    pub(crate) state: RwLock<AppState>,
    pub(crate) generation: AtomicU64,
    pub(crate) sale_in_flight: AtomicBool,
    /// Signalled whenever a session load finishes or the session is cleared.
    pub(crate) session_settled: Notify,
    pub(crate) session_settings: SessionSettings,
}

impl AppController {
    pub fn new(collaborators: Collaborators, session_settings: SessionSettings) -> Self {
        let resolver = PermissionResolver::new(Arc::clone(&collaborators.permissions));
        AppController {
            collaborators,
            resolver,
            state: RwLock::new(AppState::new(today())),
            generation: AtomicU64::new(0),
            sale_in_flight: AtomicBool::new(false),
            session_settled: Notify::new(),
            session_settings,
        }
    }

    /// A copy of the whole state, for rendering.
    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn notice(&self) -> Option<Notice> {
        self.state.read().await.notice.clone()
    }

    pub async fn dismiss_notice(&self) {
        self.state.write().await.notice = None;
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    // =========================================================================
    // Crate Helpers
    // =========================================================================

    pub(crate) async fn notify(&self, notice: Notice) {
        self.state.write().await.notice = Some(notice);
    }

    /// Posts `err` as an error notice and hands it back.
    pub(crate) async fn fail(&self, err: impl Into<ApiError>) -> ApiError {
        let err = err.into();
        warn!(code = ?err.code, message = %err.message, "Intent failed");
        self.notify(Notice::error(err.message.clone())).await;
        err
    }

    /// The signed-in admin profile, or an `Unauthorized` failure with
    /// `message`.
    pub(crate) async fn require_admin(&self, message: &str) -> ApiResult<Profile> {
        let profile = self.state.read().await.profile.clone();
        match profile {
            Some(profile) if profile.is_admin() => Ok(profile),
            _ => Err(self.fail(ApiError::unauthorized(message)).await),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether results fetched under `generation` may still be applied.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }
}

/// Current UTC calendar day, used for expiry checks and report presets.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// =============================================================================
// Unit Tests
// =============================================================================
